use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time};

use crate::aggregator::Aggregator;

/// Run the aggregator every `interval`, first tick one interval from now.
/// A failed run is logged and the schedule keeps going.
pub fn spawn_weekly(aggregator: Arc<Aggregator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tracing::info!("starting scheduled weekly update");
            match aggregator.run().await {
                Ok(report) => tracing::info!(
                    inserted = report.inserted_count,
                    attempted = report.attempted,
                    "{}",
                    report.message
                ),
                Err(err) => tracing::error!(kind = err.kind(), "weekly update failed: {err}"),
            }
        }
    })
}
