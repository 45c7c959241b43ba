//! Request middleware and the API error type.

pub mod error;
pub mod logging;
pub mod rate_limit;
