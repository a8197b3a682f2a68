//! Shared types for the manhwa platform services
//!
//! Holds the common error type and configuration loading used by the
//! import microservice (and any future sibling services).

pub mod config;
pub mod error;

pub use error::{Error, Result};
