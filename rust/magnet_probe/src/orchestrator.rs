//! Concurrent resolution of many identifiers against one shared source
//!
//! Each submitted identifier gets its own task. A task takes the source lock
//! only long enough to register the lookup, then races the lookup against its
//! own timeout. Outcomes are sent over a channel and collected by whoever calls
//! [`Orchestrator::await_all`], so no task ever touches the result list.

use crate::barrier::{BarrierGuard, CompletionBarrier};
use crate::magnet::Identifier;
use crate::metadata::Metadata;
use crate::source::MetadataSource;
use serde::{Deserialize, Serialize};
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time;

/// Default per-identifier timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for an [`Orchestrator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How long each identifier may take to resolve
    pub timeout: Duration,
    /// Upper bound on lookups in flight at once (`None` = one task per identifier, all at once)
    pub max_concurrent: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_concurrent: None,
        }
    }
}

impl ResolverConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.max_concurrent = max_concurrent.filter(|n| *n > 0);
        self
    }
}

/// A successfully resolved identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub identifier: Identifier,
    pub metadata: Metadata,
}

/// Terminal state of one resolution task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Resolved,
    TimedOut,
    /// The source refused the identifier at registration
    Rejected,
    /// The lookup started but ended in an error (or the task died)
    Failed,
}

/// Per-run tally of task outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub submitted: usize,
    pub resolved: usize,
    pub timed_out: usize,
    pub rejected: usize,
    pub failed: usize,
    /// Submitted but never started before `await_all`
    pub discarded: usize,
}

impl ResolutionSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Resolved => self.resolved += 1,
            Outcome::TimedOut => self.timed_out += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    /// Tasks that reached a terminal state
    #[must_use]
    pub fn finished(&self) -> usize {
        self.resolved + self.timed_out + self.rejected + self.failed
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("resolution already collected; the orchestrator accepts no more work")]
    Finished,
    #[error("orchestrator is closed")]
    Closed,
}

/// What a task reports back when it ends
#[derive(Debug)]
struct TaskReport {
    identifier: Identifier,
    outcome: Outcome,
    metadata: Option<Metadata>,
}

#[derive(Debug)]
struct Collected {
    results: Vec<ResolutionResult>,
    summary: ResolutionSummary,
}

/// Resolves identifiers concurrently against a shared [`MetadataSource`].
///
/// Lifecycle: [`submit`](Self::submit) any number of identifiers,
/// [`begin_resolution`](Self::begin_resolution), [`await_all`](Self::await_all)
/// and finally [`close`](Self::close).
pub struct Orchestrator<S: MetadataSource> {
    source: Arc<Mutex<S>>,
    config: ResolverConfig,
    limiter: Option<Arc<Semaphore>>,
    barrier: CompletionBarrier,
    pending: Vec<(Identifier, BarrierGuard)>,
    submitted: usize,
    tasks: JoinSet<()>,
    reports_tx: Option<mpsc::UnboundedSender<TaskReport>>,
    reports_rx: mpsc::UnboundedReceiver<TaskReport>,
    collected: Option<Collected>,
    closed: bool,
}

impl<S: MetadataSource> Orchestrator<S> {
    pub fn new(source: S, config: ResolverConfig) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            source: Arc::new(Mutex::new(source)),
            config,
            limiter: config
                .max_concurrent
                .map(|permits| Arc::new(Semaphore::new(permits))),
            barrier: CompletionBarrier::new(),
            pending: Vec::new(),
            submitted: 0,
            tasks: JoinSet::new(),
            reports_tx: Some(reports_tx),
            reports_rx,
            collected: None,
            closed: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    #[must_use]
    pub fn barrier(&self) -> &CompletionBarrier {
        &self.barrier
    }

    /// Number of identifiers submitted so far
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Register one identifier. Counted by the barrier immediately.
    ///
    /// # Errors
    /// Fails once results have been collected or the orchestrator is closed.
    pub fn submit(&mut self, identifier: impl Into<Identifier>) -> Result<(), OrchestratorError> {
        self.ensure_accepting()?;
        let guard = self.barrier.register();
        self.pending.push((identifier.into(), guard));
        self.submitted += 1;
        Ok(())
    }

    /// Start one task per pending identifier, each bounded by `timeout`.
    ///
    /// Must be called from within a Tokio runtime. Returns how many tasks were started.
    ///
    /// # Errors
    /// Fails once results have been collected or the orchestrator is closed.
    pub fn begin_resolution(&mut self, timeout: Duration) -> Result<usize, OrchestratorError> {
        self.ensure_accepting()?;
        let Some(reports_tx) = self.reports_tx.as_ref() else {
            return Err(OrchestratorError::Finished);
        };

        let pending = mem::take(&mut self.pending);
        let started = pending.len();
        for (identifier, guard) in pending {
            self.tasks.spawn(resolve_one(
                Arc::clone(&self.source),
                identifier,
                timeout,
                self.limiter.clone(),
                reports_tx.clone(),
                guard,
            ));
        }

        log::debug!("Started {started} resolution tasks (timeout {timeout:?})");
        Ok(started)
    }

    /// [`begin_resolution`](Self::begin_resolution) with the configured timeout.
    ///
    /// # Errors
    /// Same as [`begin_resolution`](Self::begin_resolution).
    pub fn start(&mut self) -> Result<usize, OrchestratorError> {
        self.begin_resolution(self.config.timeout)
    }

    /// Wait for every started task to reach a terminal state and return the successes,
    /// in completion order.
    ///
    /// Later calls return the same results without waiting.
    pub async fn await_all(&mut self) -> &[ResolutionResult] {
        if self.collected.is_none() {
            let collected = self.collect().await;
            self.collected = Some(collected);
        }
        self.collected
            .as_ref()
            .map(|c| c.results.as_slice())
            .unwrap_or_default()
    }

    /// Outcome counts, available once [`await_all`](Self::await_all) has returned
    #[must_use]
    pub fn summary(&self) -> Option<ResolutionSummary> {
        self.collected.as_ref().map(|c| c.summary)
    }

    /// Release the shared source. Safe to call more than once, or without any work submitted.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut source = self.source.lock().await;
        source.close().await;
    }

    fn ensure_accepting(&self) -> Result<(), OrchestratorError> {
        if self.closed {
            Err(OrchestratorError::Closed)
        } else if self.collected.is_some() {
            Err(OrchestratorError::Finished)
        } else {
            Ok(())
        }
    }

    async fn collect(&mut self) -> Collected {
        let mut summary = ResolutionSummary {
            submitted: self.submitted,
            ..Default::default()
        };

        // never-started submissions would hold the barrier open forever
        let unstarted = mem::take(&mut self.pending);
        if !unstarted.is_empty() {
            log::warn!(
                "Discarding {} identifiers that were submitted but never started",
                unstarted.len()
            );
            summary.discarded = unstarted.len();
        }
        drop(unstarted);

        self.barrier.wait().await;

        // every task has reported by now; join them so none can outlive collection
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                log::error!("Resolution task ended abnormally: {err}");
                summary.record(Outcome::Failed);
            }
        }

        drop(self.reports_tx.take());
        let mut results = Vec::new();
        while let Some(report) = self.reports_rx.recv().await {
            summary.record(report.outcome);
            if let Some(metadata) = report.metadata {
                results.push(ResolutionResult {
                    identifier: report.identifier,
                    metadata,
                });
            }
        }

        log::info!(
            "Resolved {} of {} identifiers ({} timed out, {} rejected, {} failed)",
            summary.resolved,
            summary.submitted,
            summary.timed_out,
            summary.rejected,
            summary.failed
        );
        Collected { results, summary }
    }
}

async fn resolve_one<S: MetadataSource>(
    source: Arc<Mutex<S>>,
    identifier: Identifier,
    timeout: Duration,
    limiter: Option<Arc<Semaphore>>,
    reports: mpsc::UnboundedSender<TaskReport>,
    guard: BarrierGuard,
) {
    // the timeout starts once a slot is held
    let _permit = match limiter {
        Some(limiter) => limiter.acquire_owned().await.ok(),
        None => None,
    };

    let (outcome, metadata) = match attempt(&source, &identifier, timeout).await {
        Ok(metadata) => (Outcome::Resolved, Some(metadata)),
        Err(outcome) => (outcome, None),
    };

    _ = reports.send(TaskReport {
        identifier,
        outcome,
        metadata,
    });
    drop(guard);
}

async fn attempt<S: MetadataSource>(
    source: &Mutex<S>,
    identifier: &Identifier,
    timeout: Duration,
) -> Result<Metadata, Outcome> {
    log::info!("Adding magnet: {identifier}");

    // the lock covers registration only, never the wait
    let registered = {
        let mut source = source.lock().await;
        source.begin_resolve(identifier)
    };
    let pending = match registered {
        Ok(pending) => pending,
        Err(err) => {
            log::warn!("Error adding magnet {identifier}: {err}");
            return Err(Outcome::Rejected);
        }
    };

    // on timeout the lookup future is dropped here, so a late answer has nowhere to land
    match time::timeout(timeout, pending.ready()).await {
        Ok(Ok(metadata)) => {
            log::info!("Got metadata for {identifier} ({} files)", metadata.files.len());
            Ok(metadata)
        }
        Ok(Err(err)) => {
            log::warn!("Failed to resolve {identifier}: {err}");
            Err(Outcome::Failed)
        }
        Err(_) => {
            log::info!("Timed out on {identifier}");
            Err(Outcome::TimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_concurrent, None);
    }

    #[test]
    fn test_zero_concurrency_means_unbounded() {
        let config = ResolverConfig::default().with_max_concurrent(Some(0));
        assert_eq!(config.max_concurrent, None);
        let config = config.with_max_concurrent(Some(4));
        assert_eq!(config.max_concurrent, Some(4));
    }

    #[test]
    fn test_summary_counts_terminal_states() {
        let mut summary = ResolutionSummary::default();
        for outcome in [
            Outcome::Resolved,
            Outcome::TimedOut,
            Outcome::Rejected,
            Outcome::Failed,
            Outcome::Resolved,
        ] {
            summary.record(outcome);
        }
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.finished(), 5);
    }
}
