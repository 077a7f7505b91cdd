//! Aggregator: streaming consumption of request stats
//!
//! Single consumer of the result channel. Maintains the running counters
//! and the latency vector, enforces the abort-after threshold by cancelling
//! the run, and hands raw totals back to the driver for summary assembly.

use tokio::sync::{broadcast, mpsc};

use crate::stats::RequestStat;
use crate::summary::RunTotals;

pub(crate) struct Aggregator {
    abort_after: u64,
    shutdown: broadcast::Sender<()>,
}

impl Aggregator {
    pub(crate) fn new(abort_after: u64, shutdown: broadcast::Sender<()>) -> Self {
        Self {
            abort_after,
            shutdown,
        }
    }

    /// Consume stats until the result channel closes, external cancellation
    /// is observed, or the abort threshold is reached — whichever first.
    pub(crate) async fn run(self, mut results_rx: mpsc::Receiver<RequestStat>) -> RunTotals {
        let mut totals = RunTotals::default();
        let mut cancelled = self.shutdown.subscribe();

        loop {
            let stat = tokio::select! {
                stat = results_rx.recv() => match stat {
                    Some(stat) => stat,
                    // Dispatcher done: all workers have drained and exited.
                    None => break,
                },
                _ = cancelled.recv() => {
                    tracing::debug!("aggregator observed cancellation");
                    break;
                }
            };

            totals.latencies.push(stat.duration);

            if stat.is_success() {
                totals.success += 1;
                totals.data_transferred += stat.body_size as u64;
            } else {
                totals.fail += 1;
                *totals.errors.entry(stat.error_key()).or_insert(0) += 1;

                if self.abort_after > 0 && totals.fail >= self.abort_after {
                    tracing::warn!(
                        fail = totals.fail,
                        abort_after = self.abort_after,
                        "failure threshold reached, aborting run"
                    );
                    let _ = self.shutdown.send(());
                    break;
                }
            }
        }

        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn stat(status_code: u16, duration_ms: u64, body_size: usize) -> RequestStat {
        RequestStat {
            start: Utc::now(),
            end: Utc::now(),
            duration: Duration::from_millis(duration_ms),
            body_size,
            status_code,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_aggregator_counts_and_histogram() {
        let (shutdown, _) = broadcast::channel(1);
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(Aggregator::new(0, shutdown).run(rx));

        tx.send(stat(200, 10, 100)).await.unwrap();
        tx.send(stat(200, 20, 50)).await.unwrap();
        tx.send(stat(500, 30, 0)).await.unwrap();
        tx.send(stat(404, 40, 0)).await.unwrap();
        drop(tx);

        let totals = handle.await.unwrap();

        assert_eq!(totals.success, 2);
        assert_eq!(totals.fail, 2);
        assert_eq!(totals.latencies.len(), 4);
        assert_eq!(totals.data_transferred, 150);
        assert_eq!(totals.errors["Internal Server Error"], 1);
        assert_eq!(totals.errors["Not Found"], 1);
        assert_eq!(totals.errors.values().sum::<u64>(), totals.fail);
    }

    #[tokio::test]
    async fn test_aggregator_abort_threshold_cancels() {
        let (shutdown, _) = broadcast::channel(1);
        let mut cancel_observer = shutdown.subscribe();
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(Aggregator::new(3, shutdown).run(rx));

        for _ in 0..5 {
            // Sends beyond the threshold may fail once the aggregator stops.
            let _ = tx.send(stat(500, 5, 0)).await;
        }
        drop(tx);

        let totals = handle.await.unwrap();
        assert_eq!(totals.fail, 3);

        cancel_observer
            .recv()
            .await
            .expect("abort should broadcast cancellation");
    }

    #[tokio::test]
    async fn test_aggregator_stops_on_external_cancel() {
        let (shutdown, _) = broadcast::channel(1);
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(Aggregator::new(0, shutdown.clone()).run(rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = shutdown.send(());

        let totals = handle.await.unwrap();
        assert_eq!(totals.success + totals.fail, 0);
        drop(tx);
    }

    #[tokio::test]
    async fn test_aggregator_transport_error_keying() {
        let (shutdown, _) = broadcast::channel(1);
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(Aggregator::new(0, shutdown).run(rx));

        let mut failed = stat(200, 10, 0);
        failed.error = Some("connection reset by peer".to_string());
        tx.send(failed).await.unwrap();
        drop(tx);

        let totals = handle.await.unwrap();
        assert_eq!(totals.fail, 1);
        assert_eq!(totals.errors["connection reset by peer"], 1);
    }
}
