//! HTTP API handlers for manhwa-import
//!
//! Thin administrative surface over the import pipeline and the
//! scheduler: trigger scans, inspect status, list raw files.

pub mod health;
pub mod import;
pub mod scheduler;

pub use health::health_routes;
pub use import::import_routes;
pub use scheduler::scheduler_routes;
