//! Leadboard CLI
//!
//! Command-line interface for working with the lead table directly:
//! - List and add leads
//! - Edit fields and move leads between stages
//! - Watch live changes
//! - Show pipeline metrics against goals

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use leadboard::config::{generate_default_config, Config};
use leadboard::dashboard::{DashboardController, DashboardEvent, DraftUpdate, Metrics};
use leadboard::store::{self, Lead, LeadDraft, LeadId, LeadStore, Stage, StoreHandle, Vendor};

#[derive(Parser)]
#[command(name = "leadboard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage the lead pipeline from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List leads, newest first
    List,

    /// Add a lead
    Add {
        /// Lead name
        name: String,
        /// Deal value
        value: f64,
        /// Assigned salesperson
        #[arg(long, default_value = "Vendedor 1", value_parser = parse_vendor)]
        vendor: Vendor,
        /// Pipeline stage
        #[arg(long, default_value = "contato", value_parser = parse_stage)]
        stage: Stage,
    },

    /// Change fields of an existing lead
    Update {
        /// Lead id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        value: Option<f64>,
        #[arg(long, value_parser = parse_vendor)]
        vendor: Option<Vendor>,
        #[arg(long, value_parser = parse_stage)]
        stage: Option<Stage>,
    },

    /// Move a lead to another stage
    Stage {
        /// Lead id
        id: String,
        /// Target stage (contato, proposta, negociacao, fechado, perdido)
        #[arg(value_parser = parse_stage)]
        stage: Stage,
    },

    /// Print changes to the lead table until interrupted
    Watch,

    /// Show pipeline totals and goal progress
    Metrics {
        /// Revenue goal
        #[arg(long)]
        target_revenue: Option<f64>,
        /// Average ticket goal
        #[arg(long)]
        target_ticket: Option<f64>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let config = generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &config)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", config),
        }
        return Ok(());
    }

    let config = leadboard::logging::with_bootstrap(|| Config::resolve(cli.config.as_deref()))?;
    leadboard::logging::init(&config.logging);

    if !config.store.is_configured() {
        bail!("Store not configured: set LEADBOARD_STORE_URL and LEADBOARD_STORE_KEY, or [store] in the config file");
    }
    let store = store::connect_with(config.store.to_supabase()).context("Failed to open store")?;
    let json = cli.format == "json";

    match cli.command {
        Commands::List => {
            let leads = store.list_leads().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&leads)?);
            } else {
                print_table(&leads);
            }
        }

        Commands::Add {
            name,
            value,
            vendor,
            stage,
        } => {
            let draft = LeadDraft::new(&name, value)
                .vendor(vendor)
                .stage(stage)
                .stamped(Utc::now());
            store.upsert_lead(&draft).await?;
            println!("Added {} ({:.2}) in {}", name, value, draft.stage);
        }

        Commands::Update {
            id,
            name,
            value,
            vendor,
            stage,
        } => {
            let id = parse_id(&id);
            let lead = find_lead(&store, &id).await?;

            let mut draft = LeadDraft::from(&lead);
            DraftUpdate {
                name,
                value,
                vendor,
                stage,
            }
            .apply(&mut draft);

            store.upsert_lead(&draft.stamped(Utc::now())).await?;
            println!("Updated lead {}", id);
        }

        Commands::Stage { id, stage } => {
            let id = parse_id(&id);
            let controller = DashboardController::new(Some(store), config.dashboard.controller());
            controller.refresh().await;

            if controller.find_lead(&id).await.is_none() {
                bail!("Lead {} not found", id);
            }
            if !controller.move_to_stage(&id, stage.clone()).await {
                bail!("Failed to move lead {}", id);
            }
            println!("Moved lead {} to {}", id, stage);
        }

        Commands::Watch => watch(store, &config, json).await?,

        Commands::Metrics {
            target_revenue,
            target_ticket,
        } => {
            let controller = DashboardController::new(Some(store), config.dashboard.controller());
            if !controller.refresh().await {
                bail!("Failed to list leads");
            }
            controller.set_goals(target_revenue, target_ticket).await;

            let metrics = controller.snapshot().await.metrics;
            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics(&metrics);
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

async fn watch(store: StoreHandle, config: &Config, json: bool) -> anyhow::Result<()> {
    let controller: Arc<DashboardController> =
        DashboardController::new(Some(store), config.dashboard.controller());
    let mut events = controller.subscribe_events();
    controller.mount().await;

    if !controller.is_subscribed().await {
        controller.unmount().await;
        bail!("Could not subscribe to lead changes");
    }
    eprintln!("Watching {} leads, Ctrl+C to stop", controller.leads().await.len());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&controller, &event, json).await?,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    controller.unmount().await;
    Ok(())
}

async fn print_event(controller: &DashboardController, event: &DashboardEvent, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let now = Utc::now().format("%H:%M:%S");
    match event {
        DashboardEvent::Refreshed { lead_count } => println!("[{}] reloaded, {} leads", now, lead_count),
        DashboardEvent::Patched { kind } => {
            println!("[{}] {:?}, {} leads", now, kind, controller.leads().await.len())
        }
        DashboardEvent::Saved { id } => println!("[{}] saved {:?}", now, id),
        DashboardEvent::StateChanged => {}
    }
    Ok(())
}

async fn find_lead(store: &StoreHandle, id: &LeadId) -> anyhow::Result<Lead> {
    store
        .list_leads()
        .await?
        .into_iter()
        .find(|l| &l.id == id)
        .with_context(|| format!("Lead {} not found", id))
}

fn parse_id(raw: &str) -> LeadId {
    match raw.parse() {
        Ok(id) => id,
        Err(never) => match never {},
    }
}

fn parse_stage(s: &str) -> Result<Stage, String> {
    let stage = Stage::from(s.trim().to_lowercase());
    if Stage::ALL.contains(&stage) {
        Ok(stage)
    } else {
        let valid: Vec<&str> = Stage::ALL.iter().map(|s| s.label()).collect();
        Err(format!("Unknown stage '{}'. Use one of: {}", s, valid.join(", ")))
    }
}

fn parse_vendor(s: &str) -> Result<Vendor, String> {
    let vendor = Vendor::from(s.trim().to_string());
    if Vendor::ALL.contains(&vendor) {
        Ok(vendor)
    } else {
        let valid: Vec<&str> = Vendor::ALL.iter().map(|v| v.label()).collect();
        Err(format!("Unknown vendor '{}'. Use one of: {}", s, valid.join(", ")))
    }
}

fn print_table(leads: &[Lead]) {
    if leads.is_empty() {
        println!("No leads");
        return;
    }

    println!(
        "{:<8} | {:<24} | {:>12} | {:<12} | {:<10} | {:<16}",
        "ID", "Name", "Value", "Vendor", "Stage", "Updated"
    );
    println!("{}", "-".repeat(96));

    for lead in leads {
        let updated = lead
            .last_update
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} | {:<24} | {:>12.2} | {:<12} | {:<10} | {:<16}",
            lead.id.to_string(),
            lead.name,
            lead.value,
            lead.vendor.to_string(),
            lead.stage.to_string(),
            updated
        );
    }
}

fn print_metrics(metrics: &Metrics) {
    println!("Leads:          {}", metrics.lead_count);
    println!("Pipeline total: {:.2}", metrics.total_value);
    println!("Average ticket: {:.2}", metrics.average_ticket);

    match metrics.revenue_progress {
        Some(p) => println!("Revenue goal:   {:.2} ({:.1}%)", metrics.target_revenue, p * 100.0),
        None => println!("Revenue goal:   -"),
    }
    match metrics.ticket_progress {
        Some(p) => println!("Ticket goal:    {:.2} ({:.1}%)", metrics.target_ticket, p * 100.0),
        None => println!("Ticket goal:    -"),
    }

    println!();
    println!("{:<12} | {:>6} | {:>12}", "Stage", "Count", "Value");
    println!("{}", "-".repeat(36));
    for summary in &metrics.by_stage {
        println!(
            "{:<12} | {:>6} | {:>12.2}",
            summary.stage.to_string(),
            summary.count,
            summary.value
        );
    }
}
