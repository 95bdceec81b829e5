//! Batch ingestion pipeline
//!
//! # Architecture
//!
//! - **reader**: CSV file → [`RawRecord`]s
//! - **staging**: raw rows into `staging.raw_customers`, one transaction per batch
//! - **normalize**: defaults and never-failing type coercions
//! - **anonymize**: SHA-256 hashing of contact columns
//! - **transform**: raw row → [`CustomerRecord`] with row-level validation
//! - **loader**: per-row upserts plus the batch audit entry
//! - **orchestrator**: discovery, batch lifecycle, archival
//! - **scheduler**: run at startup, then on a fixed interval

pub mod anonymize;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod reader;
pub mod scheduler;
pub mod staging;
pub mod transform;

pub use crate::error::{IngestError, IngestResult, RowError};
pub use anonymize::{Anonymizer, ContactHashes};
pub use loader::TransformLoader;
pub use models::{CustomerRecord, LoadStats, RawRecord, RawValue, RowFailure, UpsertOutcome};
pub use normalize::{FieldDefaults, SourceColumn};
pub use orchestrator::{BatchOrchestrator, BatchOutcome, BatchState, RunSummary};
pub use scheduler::Scheduler;
pub use staging::StagingWriter;
pub use transform::CustomerTransformer;
