//! Churn ETL Library
//!
//! Scheduled batch ingestion of customer CSV feeds into a reporting table.
//!
//! # Overview
//!
//! Each run picks up new CSV files from the feed directory and, per file:
//!
//! - **Staging**: stores every raw row as JSON, with its source file, in one transaction
//! - **Transform**: back-fills defaults, coerces types and hashes phone/email with SHA-256
//! - **Load**: upserts one reporting row per `customerID`; bad rows are skipped, not fatal
//! - **Audit**: records a summary entry per batch plus the details of skipped rows
//! - **Archive**: moves the file to `processed/` once the batch has completed
//!
//! A batch that fails before completion is logged with an `ERROR:` entry and
//! left in place.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use churn_etl::{config::Config, db, ingest::BatchOrchestrator, store::PgStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     db::run_migrations(&pool).await?;
//!
//!     let orchestrator = BatchOrchestrator::new(config.feed, Arc::new(PgStore::new(pool)));
//!     let summary = orchestrator.run_once().await?;
//!     println!("{} archived, {} failed", summary.archived, summary.failed);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod store;

// Re-export commonly used types
pub use error::{IngestError, IngestResult, RowError};
