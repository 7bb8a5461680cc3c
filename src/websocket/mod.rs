//! WebSocket Live Events
//!
//! Pushes CRM changes to open browser pages so they can refresh without
//! polling.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/ws` and can subscribe to topics:
//! - `customers` - Customer created/updated/deleted
//! - `instances.*` - Status and QR changes of every messaging instance
//! - `instances.{id}` - A single instance
//! - `workflows.*` - Every workflow log entry
//! - `workflows.{name}` - Log entries of one workflow
//! - `system` - Server notices
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['instances.*']}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'instance_status') renderQr(msg.qr_code);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ChangeAction, ClientMessage, ServerMessage, WsEvent};
