//! Error type for the shared platform plumbing

use thiserror::Error;

/// Common result type for platform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by manhwa-common itself.
///
/// Service crates define richer error types at their own seams
/// (storage, catalog, API); only configuration handling lives here.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
