//! End-to-end pipeline tests against the in-memory store
//!
//! Coverage includes:
//! - Idempotent upserts across batches
//! - Row isolation and failure bookkeeping
//! - At-most-once archival
//! - Discovery order and no-op runs
//! - Anonymization of contact columns

use churn_common::digest::sha256_hex;
use churn_etl::ingest::BatchState;
use churn_etl::store::{AuditStore, CustomerStore, StagingStore};

mod common;
use common::{row, TestFeed};

// ============================================================================
// Upserts
// ============================================================================

#[tokio::test]
async fn test_reprocessing_updates_instead_of_duplicating() {
    let feed = TestFeed::new();
    feed.write_batch("batch_01.csv", &[&row("C-1", 1), &row("C-2", 2), &row("C-3", 3)]);
    feed.orchestrator.run_once().await.unwrap();

    feed.write_batch("batch_02.csv", &[&row("C-1", 24), &row("C-4", 4)]);
    let summary = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(summary.archived, 1);
    assert_eq!(feed.store.count_customers().await.unwrap(), 4);

    let updated = feed.store.get_customer("C-1").await.unwrap().unwrap();
    assert_eq!(updated.tenure, 24);
    assert_eq!(updated.total_charges, 720.0);

    let stats = summary.batches[0].stats.as_ref().unwrap();
    assert_eq!((stats.inserted, stats.updated), (1, 1));
}

#[tokio::test]
async fn test_same_rows_twice_leave_one_row_per_customer() {
    let feed = TestFeed::new();
    let rows = [row("C-1", 5), row("C-2", 6)];
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    feed.write_batch("first.csv", &rows);
    feed.orchestrator.run_once().await.unwrap();
    let after_first = feed.store.customers();

    feed.write_batch("second.csv", &rows);
    feed.orchestrator.run_once().await.unwrap();
    let after_second = feed.store.customers();

    assert_eq!(after_first.len(), 2);
    assert_eq!(after_second.len(), 2);
    for (a, b) in after_first.iter().zip(&after_second) {
        assert_eq!(a.customer_id, b.customer_id);
        assert_eq!(a.tenure, b.tenure);
        assert_eq!(a.phone_hash, b.phone_hash);
    }
}

// ============================================================================
// Row isolation
// ============================================================================

#[tokio::test]
async fn test_bad_row_does_not_abort_batch() {
    let feed = TestFeed::new();
    let missing_id = ",Male,1,No,No,3,555-0199,x@example.com,One year,10.0,30.0,Yes".to_string();
    feed.write_batch(
        "mixed.csv",
        &[&row("C-1", 1), &row("C-2", 2), &missing_id, &row("C-4", 4), &row("C-5", 5)],
    );

    let summary = feed.orchestrator.run_once().await.unwrap();
    let outcome = &summary.batches[0];

    assert_eq!(outcome.state, BatchState::Archived);
    assert_eq!(feed.store.count_customers().await.unwrap(), 4);

    let entries = feed.store.recent_log_entries(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].rows_in, 5);
    assert_eq!(entries[0].rows_out, 4);
    assert!(entries[0].notes.contains("1 failed rows"));

    let failures = feed.store.row_failures(outcome.batch_id).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].row_index, 2);
    assert_eq!(failures[0].row_data["Phone"], "555-0199");
}

#[tokio::test]
async fn test_negative_charges_are_row_failures() {
    let feed = TestFeed::new();
    let negative = "C-9,Female,0,No,No,3,,,Two year,-5.0,30.0,No".to_string();
    feed.write_batch("negative.csv", &[&row("C-1", 1), &negative]);

    let summary = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(summary.archived, 1);
    assert!(feed.store.get_customer("C-9").await.unwrap().is_none());
    assert_eq!(summary.batches[0].stats.as_ref().unwrap().failed(), 1);
}

// ============================================================================
// Archival
// ============================================================================

#[tokio::test]
async fn test_staging_failure_leaves_file_in_place() {
    let feed = TestFeed::new();
    let path = feed.write_batch("batch.csv", &[&row("C-1", 1)]);
    feed.store.set_fail_staging(true);

    let summary = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.batches[0].failed_after, Some(BatchState::Discovered));
    assert!(path.exists());
    assert!(!feed.processed("batch.csv").exists());
    assert_eq!(feed.store.count_customers().await.unwrap(), 0);

    let entries = feed.store.log_entries();
    assert_eq!(entries[0].rows_in, 0);
    assert_eq!(entries[0].rows_out, 0);
    assert!(entries[0].notes.starts_with("ERROR: "));

    // Picked up again once the store recovers
    feed.store.set_fail_staging(false);
    let retry = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(retry.archived, 1);
    assert!(!path.exists());
    assert!(feed.processed("batch.csv").exists());
    assert_eq!(feed.store.count_customers().await.unwrap(), 1);
}

#[tokio::test]
async fn test_archived_batch_is_not_processed_again() {
    let feed = TestFeed::new();
    feed.write_batch("once.csv", &[&row("C-1", 1)]);

    let first = feed.orchestrator.run_once().await.unwrap();
    let second = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(first.archived, 1);
    assert_eq!(second.discovered, 0);
    assert_eq!(feed.store.log_entries().len(), 1);
    assert_eq!(feed.store.all_staged_rows().len(), 1);
    assert_eq!(
        first.batches[0].archived_to.as_deref(),
        Some(feed.processed("once.csv").as_path())
    );
}

#[tokio::test]
async fn test_audit_failure_leaves_file_in_place() {
    let feed = TestFeed::new();
    let path = feed.write_batch("audit.csv", &[&row("C-1", 1)]);
    feed.store.set_fail_audit(true);

    let summary = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.batches[0].failed_after, Some(BatchState::Staged));
    assert!(path.exists());
}

#[tokio::test]
async fn test_header_only_batch_is_archived() {
    let feed = TestFeed::new();
    feed.write_batch("empty.csv", &[]);

    let summary = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(summary.archived, 1);
    assert!(feed.processed("empty.csv").exists());
    let entries = feed.store.log_entries();
    assert_eq!(entries[0].rows_in, 0);
    assert_eq!(entries[0].notes, "OK");
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn test_batches_run_in_name_order() {
    let feed = TestFeed::new();
    for name in ["c.csv", "a.csv", "b.CSV"] {
        feed.write_batch(name, &[&row("C-1", 1)]);
    }
    feed.write_raw("readme.txt", "not a batch");

    let summary = feed.orchestrator.run_once().await.unwrap();

    let order: Vec<_> = summary.batches.iter().map(|b| b.file_name.as_str()).collect();
    assert_eq!(order, vec!["a.csv", "b.CSV", "c.csv"]);
    assert!(feed.path().join("readme.txt").exists());

    let logged: Vec<_> = feed.store.log_entries().into_iter().map(|e| e.file_name).collect();
    assert_eq!(logged, vec!["a.csv", "b.CSV", "c.csv"]);
}

#[tokio::test]
async fn test_empty_feed_is_a_no_op() {
    let feed = TestFeed::new();

    let summary = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(summary.discovered, 0);
    assert!(summary.batches.is_empty());
    assert!(feed.store.log_entries().is_empty());
    assert!(!feed.path().join("processed").exists());
}

// ============================================================================
// Staging and anonymization
// ============================================================================

#[tokio::test]
async fn test_staging_keeps_unknown_columns() {
    let feed = TestFeed::new();
    feed.write_raw(
        "wide.csv",
        "customerID,tenure,InternetService,Phone\nC-1,3,Fiber optic,555-0100\n",
    );

    let summary = feed.orchestrator.run_once().await.unwrap();
    let staged = feed.store.staged_rows(summary.batches[0].batch_id).await.unwrap();

    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].source_file, "wide.csv");
    assert_eq!(staged[0].raw["InternetService"], "Fiber optic");
    assert_eq!(staged[0].raw["Phone"], "555-0100");
}

#[tokio::test]
async fn test_contact_columns_are_hashed() {
    let feed = TestFeed::new();
    feed.write_raw(
        "contacts.csv",
        "customerID,Phone,Email\nC-1,555-0100,a@b.com\nC-2,,\n",
    );

    feed.orchestrator.run_once().await.unwrap();

    let with_contacts = feed.store.get_customer("C-1").await.unwrap().unwrap();
    assert_eq!(with_contacts.phone_hash, Some(sha256_hex("555-0100")));
    assert_eq!(with_contacts.email_hash, Some(sha256_hex("a@b.com")));

    let without = feed.store.get_customer("C-2").await.unwrap().unwrap();
    assert_eq!(without.phone_hash, None);
    assert_eq!(without.email_hash, None);
}

#[tokio::test]
async fn test_batch_checksum_matches_file() {
    let feed = TestFeed::new();
    let contents = format!("{}\n{}\n", common::HEADER, row("C-1", 1));
    feed.write_raw("sum.csv", &contents);

    let summary = feed.orchestrator.run_once().await.unwrap();

    assert_eq!(summary.batches[0].checksum, Some(sha256_hex(contents.as_bytes())));
}
