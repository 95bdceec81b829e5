//! Shared fixtures for pipeline integration tests
//!
//! Each test gets its own temporary feed directory and in-memory store.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use churn_etl::config::FeedConfig;
use churn_etl::ingest::BatchOrchestrator;
use churn_etl::store::MemoryStore;
use tempfile::TempDir;

pub const HEADER: &str =
    "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,Phone,Email,Contract,MonthlyCharges,TotalCharges,Churn";

pub struct TestFeed {
    pub dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub orchestrator: BatchOrchestrator,
}

impl TestFeed {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create feed directory");
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BatchOrchestrator::new(FeedConfig::new(dir.path()), store.clone());
        Self {
            dir,
            store,
            orchestrator,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn processed(&self, name: &str) -> PathBuf {
        self.dir.path().join("processed").join(name)
    }

    /// Write a CSV batch with the standard header
    pub fn write_batch(&self, name: &str, rows: &[&str]) -> PathBuf {
        let mut contents = String::from(HEADER);
        contents.push('\n');
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        self.write_raw(name, &contents)
    }

    pub fn write_raw(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write batch");
        path
    }
}

/// A valid input row for `customer_id`
pub fn row(customer_id: &str, tenure: u32) -> String {
    format!(
        "{},Female,0,Yes,No,{},555-01{:02},{}@example.com,Month-to-month,29.85,{}.00,No",
        customer_id,
        tenure,
        tenure % 100,
        customer_id.to_lowercase(),
        tenure * 30
    )
}
