//! Churn ETL - Main entry point

use anyhow::Result;
use churn_common::logging::{init_logging, LogConfig};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use churn_etl::{
    audit::{AuditLogger, DEFAULT_AUDIT_QUERY_LIMIT},
    config::Config,
    db,
    ingest::{BatchOrchestrator, Scheduler},
    store::{CustomerStore, PgStore},
};

#[derive(Parser, Debug)]
#[command(name = "churn-etl")]
#[command(author, version, about = "Scheduled customer churn feed ingestion")]
struct Cli {
    /// Process the feed directory once and exit
    #[arg(long, conflicts_with = "status")]
    once: bool,

    /// Print recent ingestion log entries and exit
    #[arg(long)]
    status: bool,

    /// Number of entries shown by --status
    #[arg(long, default_value_t = DEFAULT_AUDIT_QUERY_LIMIT)]
    limit: i64,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .log_file_prefix("churn-etl")
        .filter_directives(if cli.verbose {
            "churn_etl=debug,churn_common=debug,sqlx=info"
        } else {
            "churn_etl=info,sqlx=warn"
        })
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = Config::load()?;
    info!(
        feed_dir = %config.feed.feed_dir.display(),
        interval_minutes = config.schedule.interval_minutes,
        database = %config.database.redacted_url(),
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Datastore unreachable at startup: {}", e))?;
    db::health_check(&pool).await?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool.clone()));

    let result = if cli.status {
        print_status(store, cli.limit).await
    } else {
        let orchestrator = Arc::new(BatchOrchestrator::new(config.feed.clone(), store));
        if cli.once {
            run_once(&orchestrator).await
        } else {
            let runs = Scheduler::new(orchestrator, config.schedule.interval())
                .run(shutdown_signal())
                .await;
            info!(runs, "Scheduler stopped");
            Ok(())
        }
    };

    pool.close().await;
    info!("Database connections closed");

    result
}

async fn run_once(orchestrator: &BatchOrchestrator) -> Result<()> {
    let summary = orchestrator.run_once().await?;

    for batch in &summary.batches {
        match &batch.error {
            Some(e) => error!(
                file = %batch.file_name,
                failed_after = ?batch.failed_after,
                error = %e,
                "Batch failed"
            ),
            None => info!(file = %batch.file_name, state = %batch.state, "Batch done"),
        }
    }

    info!(
        discovered = summary.discovered,
        archived = summary.archived,
        failed = summary.failed,
        "Single run complete"
    );

    Ok(())
}

async fn print_status(store: Arc<PgStore>, limit: i64) -> Result<()> {
    let audit = AuditLogger::new(store.clone());
    let entries = audit.recent_entries(limit).await?;
    let customers = store.count_customers().await?;

    let failed = entries.iter().filter(|e| e.is_failure()).count();
    let rows_in: i64 = entries.iter().map(|e| e.rows_in).sum();
    let rows_out: i64 = entries.iter().map(|e| e.rows_out).sum();

    println!(
        "{:<24} {:<32} {:>8} {:>8} {:>10}  NOTES",
        "LOGGED AT", "FILE", "IN", "OUT", "SECONDS"
    );
    for entry in &entries {
        println!(
            "{:<24} {:<32} {:>8} {:>8} {:>10.3}  {}",
            entry.logged_at.format("%Y-%m-%d %H:%M:%S"),
            entry.file_name,
            entry.rows_in,
            entry.rows_out,
            entry.duration_seconds,
            entry.notes
        );
    }
    println!();
    println!("Entries shown:     {}", entries.len());
    println!("Failed batches:    {}", failed);
    println!("Rows in / out:     {} / {}", rows_in, rows_out);
    println!("Reporting rows:    {}", customers);

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, finishing current run");
        },
        _ = terminate => {
            info!("Received terminate signal, finishing current run");
        },
    }
}
