// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::pipeline::Pipeline;

/// Run one cycle right away, then one per `interval`, until `stop` turns
/// true. Stopping only prevents new cycles: a cycle already running is
/// awaited to completion. Cycle errors are logged and retried on the next
/// tick. Dropping the sender leaves the scheduler running for good.
pub fn spawn_scheduler(
    pipeline: Arc<Pipeline>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A slow cycle must not trigger a burst of catch-up cycles.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut watching = true;

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                    }
                    continue;
                }
            }

            match pipeline.run_cycle().await {
                Ok(doc) => tracing::info!(
                    target: "radar",
                    total_risk = doc.total_risk.risk,
                    last_updated = %doc.last_updated,
                    "scheduled cycle published"
                ),
                Err(e) => tracing::error!(target: "radar", error = ?e, "scheduled cycle aborted"),
            }
        }
        tracing::info!(target: "radar", "scheduler stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, FileStore};

    #[tokio::test]
    async fn first_cycle_runs_immediately_and_stop_is_honored() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(tmp.path(), "data.json"));
        let pipeline = Arc::new(
            Pipeline::new(store.clone() as Arc<dyn DocumentStore>)
                .with_settle_delay(Duration::ZERO),
        );
        let (tx, rx) = watch::channel(false);
        let handle = spawn_scheduler(pipeline, Duration::from_secs(3600), rx);

        for _ in 0..100 {
            if store.load().await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.load().await.unwrap().is_some());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
    }
}
