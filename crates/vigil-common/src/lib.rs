//! Shared domain types for the vigil monitoring engine.

pub mod error;
pub mod id;
pub mod types;

pub use error::{MonitorError, Result};
