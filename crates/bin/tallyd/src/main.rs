//! # tallyd — tally daemon
//!
//! Composition root that wires the storage adapter and trigger processor
//! together and runs them against a line-delimited JSON event feed.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize tracing and the `SQLite` connection pool (with migrations)
//! - Construct the store adapter and the trigger processor
//! - Restore schedules from the configured JSON file
//! - Decode one `AutomationEvent` per stdin line and feed the processor
//! - Serialize fired `TriggerResult`s as JSON lines on stdout
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncBufReadExt;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use tally_adapter_storage_sqlite_sqlx::SqliteTriggerStateStore;
use tally_adapter_storage_sqlite_sqlx::pool;
use tally_app::processor::TriggerProcessor;
use tally_domain::event::AutomationEvent;
use tally_domain::schedule::AutomationScheduleData;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = pool::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let store = SqliteTriggerStateStore::new(db.pool().clone());

    // Processor
    let processor = Arc::new(TriggerProcessor::new(store, 256));

    let schedules = match &config.schedules.path {
        Some(path) => load_schedules(path)?,
        None => Vec::new(),
    };
    tracing::info!(count = schedules.len(), "restoring schedules");
    processor.restore_schedules(&schedules).await;

    // Fired results go to stdout as JSON lines.
    let mut results = BroadcastStream::new(processor.results());
    let writer = tokio::spawn(async move {
        while let Some(result) = results.next().await {
            match result {
                Ok(result) => match serde_json::to_string(&result) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::error!(error = %err, "failed to encode trigger result"),
                },
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "result stream lagged");
                }
            }
        }
    });

    // One event per line, in delivery order, until EOF.
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<AutomationEvent>(line) {
            Ok(event) => processor.process_event(&event).await,
            Err(err) => tracing::warn!(error = %err, "ignoring undecodable event line"),
        }
    }

    // Dropping the processor closes the result stream and ends the writer.
    drop(processor);
    let _ = writer.await;

    Ok(())
}

fn load_schedules(path: &str) -> anyhow::Result<Vec<AutomationScheduleData>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schedules file {path}"))?;
    let schedules = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse schedules file {path}"))?;
    Ok(schedules)
}
