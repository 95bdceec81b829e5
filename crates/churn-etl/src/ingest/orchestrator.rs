//! Batch orchestrator
//!
//! Discovers CSV batches in the feed directory and drives each one through
//! staging, transform-load and archival. A batch that fails at any step gets a
//! zero-row audit entry and stays in the feed directory for the next run; a
//! batch that completes is moved to `processed/` so it is never read twice.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::loader::TransformLoader;
use super::models::LoadStats;
use super::reader;
use super::staging::StagingWriter;
use crate::audit::AuditLogger;
use crate::config::FeedConfig;
use crate::error::{IngestError, IngestResult};
use crate::store::EtlStore;

/// Input file extension, compared case-insensitively
pub const BATCH_EXTENSION: &str = "csv";

/// Lifecycle of one batch within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Discovered,
    Staged,
    Transformed,
    Archived,
    Failed,
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BatchState::Discovered => "discovered",
            BatchState::Staged => "staged",
            BatchState::Transformed => "transformed",
            BatchState::Archived => "archived",
            BatchState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of processing one discovered file
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub file_name: String,
    pub state: BatchState,
    /// SHA-256 of the input file, when it could be read
    pub checksum: Option<String>,
    pub stats: Option<LoadStats>,
    /// Last state reached before a failure
    pub failed_after: Option<BatchState>,
    pub error: Option<String>,
    pub archived_to: Option<PathBuf>,
}

impl BatchOutcome {
    pub fn is_archived(&self) -> bool {
        self.state == BatchState::Archived
    }
}

/// Result of one [`BatchOrchestrator::run_once`] call
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub discovered: usize,
    pub archived: usize,
    pub failed: usize,
    /// True when the call found another run in progress and did nothing
    pub skipped: bool,
    pub duration_seconds: f64,
    pub batches: Vec<BatchOutcome>,
}

impl RunSummary {
    fn push(&mut self, outcome: BatchOutcome) {
        if outcome.is_archived() {
            self.archived += 1;
        } else {
            self.failed += 1;
        }
        self.batches.push(outcome);
    }

    pub fn rows_in(&self) -> usize {
        self.batches.iter().filter_map(|b| b.stats.as_ref()).map(|s| s.rows_in).sum()
    }

    pub fn rows_out(&self) -> usize {
        self.batches.iter().filter_map(|b| b.stats.as_ref()).map(|s| s.rows_out).sum()
    }
}

struct ProcessedBatch {
    checksum: String,
    stats: LoadStats,
    archived_to: PathBuf,
}

pub struct BatchOrchestrator {
    feed: FeedConfig,
    staging: StagingWriter,
    loader: TransformLoader,
    audit: AuditLogger,
    running: Mutex<()>,
}

impl BatchOrchestrator {
    pub fn new<S: EtlStore + 'static>(feed: FeedConfig, store: Arc<S>) -> Self {
        let audit = AuditLogger::new(store.clone());
        Self {
            feed,
            staging: StagingWriter::new(store.clone()),
            loader: TransformLoader::new(store, audit.clone()),
            audit,
            running: Mutex::new(()),
        }
    }

    pub fn feed(&self) -> &FeedConfig {
        &self.feed
    }

    /// Regular `.csv` files directly inside the feed directory, by name.
    ///
    /// A missing feed directory has no batches.
    pub async fn discover(&self) -> IngestResult<Vec<PathBuf>> {
        let dir = &self.feed.feed_dir;
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(feed_dir = %dir.display(), "Feed directory does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut batches = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if is_batch_file(&path) && is_file {
                batches.push(path);
            }
        }
        batches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(batches)
    }

    /// Process every discovered batch in order.
    ///
    /// Batch failures are recorded in the returned summary, not returned as
    /// errors. Returns immediately with `skipped` set when another run is in
    /// progress in this process.
    pub async fn run_once(&self) -> IngestResult<RunSummary> {
        let Ok(_running) = self.running.try_lock() else {
            warn!("Previous run still in progress, skipping");
            return Ok(RunSummary {
                skipped: true,
                ..RunSummary::default()
            });
        };

        let started = Instant::now();
        let batches = self.discover().await?;
        let mut summary = RunSummary {
            discovered: batches.len(),
            ..RunSummary::default()
        };

        if batches.is_empty() {
            info!(feed_dir = %self.feed.feed_dir.display(), "No new batches");
            return Ok(summary);
        }

        info!(count = batches.len(), "Discovered batches");
        for path in &batches {
            summary.push(self.process_batch(path).await);
        }
        summary.duration_seconds = started.elapsed().as_secs_f64();

        info!(
            discovered = summary.discovered,
            archived = summary.archived,
            failed = summary.failed,
            rows_in = summary.rows_in(),
            rows_out = summary.rows_out(),
            duration_seconds = summary.duration_seconds,
            "Run complete"
        );

        Ok(summary)
    }

    /// Drive one file through the pipeline; never returns an error
    pub async fn process_batch(&self, path: &Path) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let span = info_span!("batch", batch_id = %batch_id, file = %file_name);

        async {
            let mut state = BatchState::Discovered;
            let mut checksum = None;
            info!(path = %path.display(), "Processing batch");

            match self
                .run_batch(batch_id, path, &file_name, &mut state, &mut checksum)
                .await
            {
                Ok(done) => BatchOutcome {
                    batch_id,
                    file_name: file_name.clone(),
                    state: BatchState::Archived,
                    checksum: Some(done.checksum),
                    stats: Some(done.stats),
                    failed_after: None,
                    error: None,
                    archived_to: Some(done.archived_to),
                },
                Err(err) => {
                    error!(state = %state, error = %err, "Batch failed, leaving file in place");
                    if let Err(audit_err) =
                        self.audit.record_failure(Some(batch_id), &file_name, &err).await
                    {
                        error!(error = %audit_err, "Failed to record batch failure");
                    }
                    BatchOutcome {
                        batch_id,
                        file_name: file_name.clone(),
                        state: BatchState::Failed,
                        checksum,
                        stats: None,
                        failed_after: Some(state),
                        error: Some(err.to_string()),
                        archived_to: None,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_batch(
        &self,
        batch_id: Uuid,
        path: &Path,
        file_name: &str,
        state: &mut BatchState,
        checksum: &mut Option<String>,
    ) -> IngestResult<ProcessedBatch> {
        let source = path.to_path_buf();
        let (records, digest) = tokio::task::spawn_blocking(move || {
            let digest = churn_common::digest::sha256_file(&source)?;
            let records = reader::read_file(&source)?;
            Ok::<_, churn_common::EtlError>((records, digest))
        })
        .await??;
        info!(rows = records.len(), sha256 = %digest, "Batch read");
        *checksum = Some(digest.clone());

        self.staging.stage(batch_id, &records, file_name).await?;
        *state = BatchState::Staged;

        let stats = self.loader.transform_and_load(batch_id, &records, file_name).await?;
        *state = BatchState::Transformed;

        let archived_to = self.archive(path).await?;
        *state = BatchState::Archived;

        Ok(ProcessedBatch {
            checksum: digest,
            stats,
            archived_to,
        })
    }

    /// Move a finished batch into the processed directory
    pub async fn archive(&self, path: &Path) -> IngestResult<PathBuf> {
        let processed = self.feed.processed_dir();
        tokio::fs::create_dir_all(&processed).await?;

        let name = path.file_name().ok_or_else(|| {
            IngestError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            ))
        })?;
        let destination = processed.join(name);
        tokio::fs::rename(path, &destination).await?;

        info!(destination = %destination.display(), "Batch archived");

        Ok(destination)
    }
}

fn is_batch_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BATCH_EXTENSION))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_is_batch_file() {
        assert!(is_batch_file(Path::new("/feed/a.csv")));
        assert!(is_batch_file(Path::new("/feed/B.CSV")));
        assert!(!is_batch_file(Path::new("/feed/a.csv.tmp")));
        assert!(!is_batch_file(Path::new("/feed/notes.txt")));
        assert!(!is_batch_file(Path::new("/feed/csv")));
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.CSV", "c.txt", "d.csv"] {
            std::fs::write(dir.path().join(name), "customerID\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("e.csv")).unwrap();

        let orchestrator =
            BatchOrchestrator::new(FeedConfig::new(dir.path()), Arc::new(MemoryStore::new()));
        let names: Vec<_> = orchestrator
            .discover()
            .await
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.CSV", "b.csv", "d.csv"]);
    }

    #[tokio::test]
    async fn test_missing_feed_dir_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = BatchOrchestrator::new(
            FeedConfig::new(dir.path().join("absent")),
            Arc::new(MemoryStore::new()),
        );

        let summary = orchestrator.run_once().await.unwrap();
        assert_eq!(summary.discovered, 0);
        assert!(!summary.skipped);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator =
            BatchOrchestrator::new(FeedConfig::new(dir.path()), Arc::new(MemoryStore::new()));

        let _held = orchestrator.running.try_lock().unwrap();
        let summary = orchestrator.run_once().await.unwrap();

        assert!(summary.skipped);
    }

    #[tokio::test]
    async fn test_unreadable_batch_fails_and_stays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "customerID,tenure\nC-1,1\nC-2\n").unwrap();
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BatchOrchestrator::new(FeedConfig::new(dir.path()), store.clone());

        let outcome = orchestrator.process_batch(&path).await;

        assert_eq!(outcome.state, BatchState::Failed);
        assert_eq!(outcome.failed_after, Some(BatchState::Discovered));
        assert!(path.exists());
        assert!(store.all_staged_rows().is_empty());
        assert!(store.log_entries()[0].notes.starts_with("ERROR: "));
    }

    #[tokio::test]
    async fn test_archive_failure_keeps_file_and_logs_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loaded.csv");
        std::fs::write(&path, "customerID,tenure\nC-1,1\n").unwrap();
        // A regular file where the processed directory should be
        std::fs::write(dir.path().join("processed"), "").unwrap();
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BatchOrchestrator::new(FeedConfig::new(dir.path()), store.clone());

        let outcome = orchestrator.process_batch(&path).await;

        assert_eq!(outcome.state, BatchState::Failed);
        assert_eq!(outcome.failed_after, Some(BatchState::Transformed));
        assert!(outcome.archived_to.is_none());
        assert!(path.exists());
        assert_eq!(store.customers().len(), 1);

        let entries = store.log_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].rows_in, entries[0].rows_out), (1, 1));
        assert_eq!(entries[0].notes, "OK");
        assert_eq!(entries[1].batch_id, Some(outcome.batch_id));
        assert_eq!((entries[1].rows_in, entries[1].rows_out), (0, 0));
        assert!(entries[1].notes.starts_with("ERROR: "));
    }
}
