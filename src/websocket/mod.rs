//! WebSocket Live Dashboard
//!
//! Pushes dashboard snapshots to connected clients.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Tracks open connections and the connection limit
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Protocol
//!
//! Clients connect to `/ws`. The server sends `connected`, then a
//! `snapshot` with the full dashboard, then another `snapshot` after every
//! dashboard event. Clients may send `{"type": "ping"}` or
//! `{"type": "snapshot"}`.
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'snapshot') render(msg.dashboard);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage};
