//! HTTP handlers for API endpoints.

pub mod addresses;
pub mod events;
pub mod health;
pub mod stream;
pub mod transactions;
pub mod watcher;
