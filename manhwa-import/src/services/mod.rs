//! Import pipeline services
//!
//! Classifier (payload shape → normalized record), import pipeline
//! (scan → classify → dedupe → persist → archive) and the periodic
//! scheduler driving it.

pub mod classifier;
pub mod importer;
pub mod scheduler;

pub use classifier::{classify, Classification, ClassifiedRecord, ClassifyError, FileType};
pub use importer::ImportService;
pub use scheduler::{ImportScheduler, SchedulerConfig};
