//! Worker: the tick-driven request loop
//!
//! A worker cycles Idle -> Executing -> Delaying -> Idle. Each received tick
//! grants permission for exactly one request; a worker that took a tick
//! always emits exactly one `RequestStat` before it stops through the done
//! path. The done signal is the closure of the tick channel; cancellation
//! interrupts every suspension point (tick wait, HTTP exchange, result
//! send, delay sleep).

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::executor::RequestExecutor;
use crate::stats::RequestStat;

/// Permission for one request.
#[derive(Debug)]
pub(crate) struct Tick;

/// Receiving half of the tick channel, shared by the worker pool.
///
/// tokio has no MPMC channel; the mutex serialises tick hand-off across
/// workers, which is exactly the single-consumer-at-a-time semantic of the
/// shared tick channel.
pub(crate) type SharedTicks = Arc<Mutex<mpsc::Receiver<Tick>>>;

pub(crate) struct Worker {
    id: usize,
    executor: Arc<dyn RequestExecutor>,
    ticks: SharedTicks,
    results_tx: mpsc::Sender<RequestStat>,
    request_delay: Duration,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        executor: Arc<dyn RequestExecutor>,
        ticks: SharedTicks,
        results_tx: mpsc::Sender<RequestStat>,
        request_delay: Duration,
    ) -> Self {
        Self {
            id,
            executor,
            ticks,
            results_tx,
            request_delay,
        }
    }

    /// Run the worker loop until the tick channel closes or cancellation
    /// fires. Returns the number of completed requests.
    pub(crate) async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        let mut completed = 0u64;

        tracing::debug!(worker_id = self.id, "worker started");

        loop {
            // Biased toward the tick receiver so a tick already delivered
            // into the buffer is drained before shutdown is honoured.
            let tick = {
                let mut ticks = self.ticks.lock().await;
                tokio::select! {
                    biased;
                    tick = ticks.recv() => tick,
                    _ = shutdown.recv() => None,
                }
            };

            if tick.is_none() {
                break;
            }

            let stat = tokio::select! {
                stat = self.executor.execute() => stat,
                _ = shutdown.recv() => {
                    tracing::debug!(worker_id = self.id, "worker cancelled mid-request");
                    break;
                }
            };
            completed += 1;

            let sent = tokio::select! {
                res = self.results_tx.send(stat) => res.is_ok(),
                _ = shutdown.recv() => false,
            };
            if !sent {
                break;
            }

            if !self.request_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.request_delay) => {}
                    _ = shutdown.recv() => break,
                }
            }
        }

        tracing::debug!(worker_id = self.id, completed, "worker finished");

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RequestExecutor for CountingExecutor {
        async fn execute(&self) -> RequestStat {
            self.calls.fetch_add(1, Ordering::SeqCst);
            RequestStat {
                start: Utc::now(),
                end: Utc::now(),
                duration: Duration::from_millis(1),
                body_size: 4,
                status_code: 200,
                error: None,
            }
        }

        async fn probe_version(&self) -> crate::Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_worker_emits_one_stat_per_tick() {
        let executor = Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
        });
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let (results_tx, mut results_rx) = mpsc::channel(8);
        let (shutdown_tx, _) = broadcast::channel(1);

        let worker = Worker::new(
            0,
            executor.clone(),
            Arc::new(Mutex::new(tick_rx)),
            results_tx,
            Duration::ZERO,
        );
        let handle = tokio::spawn(worker.run(shutdown_tx.subscribe()));

        for _ in 0..3 {
            tick_tx.send(Tick).await.unwrap();
        }
        drop(tick_tx);

        let completed = handle.await.unwrap();
        assert_eq!(completed, 3);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);

        let mut stats = 0;
        while results_rx.recv().await.is_some() {
            stats += 1;
        }
        assert_eq!(stats, 3);
    }

    #[tokio::test]
    async fn test_worker_stops_on_channel_close() {
        let executor = Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
        });
        let (tick_tx, tick_rx) = mpsc::channel::<Tick>(1);
        let (results_tx, _results_rx) = mpsc::channel(8);
        let (shutdown_tx, _) = broadcast::channel(1);

        let worker = Worker::new(
            0,
            executor,
            Arc::new(Mutex::new(tick_rx)),
            results_tx,
            Duration::ZERO,
        );
        let handle = tokio::spawn(worker.run(shutdown_tx.subscribe()));

        drop(tick_tx);
        assert_eq!(handle.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown_while_idle() {
        let executor = Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
        });
        let (_tick_tx, tick_rx) = mpsc::channel::<Tick>(1);
        let (results_tx, _results_rx) = mpsc::channel(8);
        let (shutdown_tx, _) = broadcast::channel(1);

        let worker = Worker::new(
            0,
            executor,
            Arc::new(Mutex::new(tick_rx)),
            results_tx,
            Duration::ZERO,
        );
        let handle = tokio::spawn(worker.run(shutdown_tx.subscribe()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = shutdown_tx.send(());

        assert_eq!(handle.await.unwrap(), 0);
    }
}
