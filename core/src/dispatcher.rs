//! Dispatcher: spawns the worker pool and issues ticks
//!
//! Issues one tick per permitted request until the budget is exhausted, the
//! duration timer fires, or cancellation is observed. Dropping the tick
//! sender is the done broadcast: every worker drains at most the one
//! buffered tick and stops. The dispatcher then awaits every worker join
//! handle, so by the time it returns no worker holds a result sender and
//! the closed result channel tells the aggregator the run is over.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::channel::ChannelConfig;
use crate::config::StopCondition;
use crate::executor::RequestExecutor;
use crate::stats::RequestStat;
use crate::worker::{Tick, Worker};

pub(crate) struct Dispatcher {
    executor: Arc<dyn RequestExecutor>,
    stop: StopCondition,
    concurrent_conns: usize,
    request_delay: Duration,
    channels: ChannelConfig,
    shutdown: broadcast::Sender<()>,
}

impl Dispatcher {
    pub(crate) fn new(
        executor: Arc<dyn RequestExecutor>,
        stop: StopCondition,
        concurrent_conns: usize,
        request_delay: Duration,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        let channels = ChannelConfig::for_connections(concurrent_conns);
        Self {
            executor,
            stop,
            concurrent_conns,
            request_delay,
            channels,
            shutdown,
        }
    }

    /// Spawn the workers, drive tick issuance, and tear the pool down.
    ///
    /// Consumes `results_tx`; once this returns, every clone handed to a
    /// worker has been dropped and the result channel is closed.
    pub(crate) async fn run(self, results_tx: mpsc::Sender<RequestStat>) {
        let (tick_tx, tick_rx) = mpsc::channel::<Tick>(self.channels.tick_buffer);
        let ticks = Arc::new(Mutex::new(tick_rx));

        let mut handles = Vec::with_capacity(self.concurrent_conns);
        for worker_id in 0..self.concurrent_conns {
            let worker = Worker::new(
                worker_id,
                Arc::clone(&self.executor),
                Arc::clone(&ticks),
                results_tx.clone(),
                self.request_delay,
            );
            handles.push(tokio::spawn(worker.run(self.shutdown.subscribe())));
        }
        drop(results_tx);

        tracing::debug!(
            workers = self.concurrent_conns,
            stop = ?self.stop,
            "dispatcher started"
        );

        let mut cancelled = self.shutdown.subscribe();

        match self.stop {
            StopCondition::Requests(req_count) => {
                for _ in 0..req_count {
                    tokio::select! {
                        biased;
                        _ = cancelled.recv() => break,
                        res = tick_tx.send(Tick) => {
                            if res.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            StopCondition::Duration(duration) => {
                let deadline = tokio::time::sleep(duration);
                tokio::pin!(deadline);

                loop {
                    tokio::select! {
                        biased;
                        _ = cancelled.recv() => break,
                        _ = &mut deadline => break,
                        res = tick_tx.send(Tick) => {
                            if res.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        // Closing the tick channel is the done signal for every worker.
        drop(tick_tx);

        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(completed) => {
                    tracing::debug!(worker_id, completed, "worker joined");
                }
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "worker task panicked");
                }
            }
        }

        tracing::debug!("dispatcher finished");
    }
}
