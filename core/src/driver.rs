//! Benchmark driver: construction and orchestration of one run
//!
//! The driver owns the cancellation channel, probes the target version,
//! wires dispatcher and aggregator together and assembles the summary.
//! Cancellation — external, Ctrl+C, duration timer or abort threshold — is
//! never an error: the summary is still returned, reflecting whatever was
//! observed before the stop condition fired.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};

use crate::aggregator::Aggregator;
use crate::channel::ChannelConfig;
use crate::config::BenchmarkParameters;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::executor::{HttpExecutor, RequestExecutor};
use crate::summary::Summary;

/// A configured benchmark, ready to run.
///
/// Runs are repeatable: `run` can be invoked multiple times against the
/// same parameters.
pub struct Benchmark {
    params: BenchmarkParameters,
    executor: Arc<dyn RequestExecutor>,
    shutdown: broadcast::Sender<()>,
}

impl Benchmark {
    /// Validate the parameters and construct the HTTP executor.
    ///
    /// # Errors
    ///
    /// Configuration and TLS material errors are fatal here, before any
    /// request is made.
    pub fn new(params: BenchmarkParameters) -> Result<Self> {
        params.validate()?;
        let executor = Arc::new(HttpExecutor::new(&params)?);
        Self::with_executor(params, executor)
    }

    /// Construct the benchmark around a caller-provided executor.
    pub fn with_executor(
        params: BenchmarkParameters,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Self> {
        params.validate()?;
        let (shutdown, _) = broadcast::channel(1);

        Ok(Self {
            params,
            executor,
            shutdown,
        })
    }

    /// Handle for cancelling a run in progress from the outside.
    pub fn cancel_handle(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Drive the configured benchmark to completion and return its summary.
    pub async fn run(&self) -> Summary {
        let target_version = if self.params.target_endpoint.is_empty() {
            String::new()
        } else {
            match self.executor.probe_version().await {
                Ok(version) => version,
                Err(e) => format!("error receiving target version: {e}"),
            }
        };

        tracing::info!(
            url = %self.params.url,
            method = %self.params.method,
            connections = self.params.concurrent_conns,
            stop = ?self.params.stop_condition(),
            "starting benchmark"
        );

        let start = Utc::now();
        let started = Instant::now();

        let channels = ChannelConfig::for_connections(self.params.concurrent_conns);
        let (results_tx, results_rx) = mpsc::channel(channels.result_buffer);

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.executor),
            self.params.stop_condition(),
            self.params.concurrent_conns,
            self.params.request_delay,
            self.shutdown.clone(),
        );
        let dispatcher_handle = tokio::spawn(dispatcher.run(results_tx));

        let aggregator = Aggregator::new(self.params.abort_after, self.shutdown.clone());
        let totals = aggregator.run(results_rx).await;

        // On abort the dispatcher sees the cancellation and unwinds; either
        // way the pool is fully joined before the summary is assembled.
        if let Err(e) = dispatcher_handle.await {
            tracing::error!(error = %e, "dispatcher task panicked");
        }

        let end = Utc::now();
        let total_time = started.elapsed();

        let summary = Summary::from_run(
            self.params.url.clone(),
            target_version,
            start,
            end,
            total_time,
            totals,
        );

        tracing::info!(
            req_count = summary.req_count,
            success = summary.success,
            fail = summary.fail,
            req_per_sec = summary.req_per_sec,
            "benchmark finished"
        );

        summary
    }

    /// Run with Ctrl+C wired to cancellation.
    pub async fn run_with_signal_handling(&self) -> Summary {
        let shutdown = self.shutdown.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received Ctrl+C, stopping benchmark");
                    let _ = shutdown.send(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to listen for Ctrl+C");
                }
            }
        });

        let summary = self.run().await;
        signal_handle.abort();

        summary
    }
}

impl std::fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Benchmark")
            .field("url", &self.params.url)
            .field("method", &self.params.method)
            .field("concurrent_conns", &self.params.concurrent_conns)
            .finish()
    }
}
