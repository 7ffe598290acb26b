use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info};

use super::services::run_ingest;
use crate::state::AppState;

/// Runs ingestion every `every` until the process exits.
pub fn spawn(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        info!(every_secs = every.as_secs(), "ingestion scheduler started");

        loop {
            ticker.tick().await;
            match run_ingest(&state).await {
                Ok(report) => info!(
                    saved = report.saved,
                    skipped = report.skipped,
                    "scheduled ingestion finished"
                ),
                Err(e) => error!(error = %e, "scheduled ingestion failed"),
            }
        }
    })
}
