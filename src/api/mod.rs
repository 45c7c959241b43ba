//! Admin HTTP API: watcher control, watch list management, event log and a
//! WebSocket notification stream.

pub mod docs;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;
