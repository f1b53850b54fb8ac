//! Periodic generation of recurring tournament instances.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courtside::TournamentManager;
use tokio::task::JoinHandle;

use crate::metrics;

/// Run one generation pass over every active template.
///
/// Returns the number of instances created. Failures are logged, never
/// propagated: the next tick retries.
pub async fn generate_due(manager: &TournamentManager, now: DateTime<Utc>) -> usize {
    match manager.generate_all_due(now).await {
        Ok(reports) => {
            let created: usize = reports.iter().map(|r| r.created.len()).sum();
            if created > 0 {
                tracing::info!(
                    templates = reports.len(),
                    created,
                    "recurring instances generated"
                );
            }
            metrics::recurring_instances_total(created);
            created
        }
        Err(e) => {
            tracing::warn!(error = %e, "recurring generation failed");
            0
        }
    }
}

/// Spawn a task that runs [`generate_due`] every `every`, starting immediately
pub fn spawn(manager: Arc<TournamentManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            generate_due(&manager, Utc::now()).await;
        }
    })
}
