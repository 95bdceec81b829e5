//! Churn ETL Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the churn ETL workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`EtlError`] and the [`Result`] alias
//! - **Digests**: SHA-256 hex helpers used for PII anonymization and batch provenance
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use churn_common::{digest, Result};
//!
//! fn fingerprint(path: &str) -> Result<()> {
//!     let checksum = digest::sha256_file(path)?;
//!     tracing::info!(%checksum, "Batch fingerprint");
//!     Ok(())
//! }
//! ```

pub mod digest;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{EtlError, Result};
