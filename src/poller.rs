//! Background polling of a pipeline until its workflow reaches a terminal status.
//!
//! One fetch runs immediately, then one per interval tick. A fetch never overlaps
//! the next one: ticks missed while a fetch is outstanding are skipped. Every
//! successful fetch is delivered, with a strictly increasing sequence number,
//! even when it looks identical to the previous one. Errors are delivered too,
//! but only a terminal workflow status or [`PollerHandle::stop`] ends the loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{DeployLensError, Result};
use crate::snapshot::{PipelineId, RunSnapshot};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Anything able to produce a fresh [`RunSnapshot`] for a pipeline.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self, pipeline_id: &PipelineId) -> Result<RunSnapshot>;
}

/// A snapshot as delivered to a poller's subscriber.
#[derive(Debug, Clone)]
pub struct PolledSnapshot {
    /// 1 for the first delivery of a session, then +1 per delivery.
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
    pub snapshot: RunSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The workflow reached a terminal status after `polls` deliveries.
    Completed { polls: u64 },
    Cancelled,
}

pub struct StatusPoller {
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn SnapshotSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Starts polling `pipeline_id` on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, E>(&self, pipeline_id: PipelineId, on_snapshot: F, on_error: E) -> PollerHandle
    where
        F: FnMut(PolledSnapshot) + Send + 'static,
        E: FnMut(DeployLensError) + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::clone(&self.source),
            pipeline_id,
            self.interval,
            token.clone(),
            on_snapshot,
            on_error,
        ));

        PollerHandle { token, task }
    }
}

/// Controls a running poll loop.
pub struct PollerHandle {
    token: CancellationToken,
    task: JoinHandle<PollOutcome>,
}

impl PollerHandle {
    /// Cancels any pending or in-flight fetch. Idempotent.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.task.is_finished()
    }

    /// Waits for the loop to end.
    pub async fn finished(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Poller task ended abnormally: {e}");
                PollOutcome::Cancelled
            }
        }
    }
}

async fn run<F, E>(
    source: Arc<dyn SnapshotSource>,
    pipeline_id: PipelineId,
    interval: Duration,
    token: CancellationToken,
    mut on_snapshot: F,
    mut on_error: E,
) -> PollOutcome
where
    F: FnMut(PolledSnapshot) + Send + 'static,
    E: FnMut(DeployLensError) + Send + 'static,
{
    let mut ticker = time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sequence: u64 = 0;

    info!("Polling pipeline {pipeline_id} every {interval:?}");

    loop {
        // The first tick completes immediately.
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            () = token.cancelled() => break,
            result = source.fetch_snapshot(&pipeline_id) => result,
        };

        // A fetch that finished after stop() is discarded.
        if token.is_cancelled() {
            break;
        }

        match result {
            Ok(snapshot) => {
                sequence += 1;
                let terminal = snapshot.is_terminal();
                debug!(
                    "Poll #{sequence} for {pipeline_id}: workflow {}",
                    snapshot.workflow.status
                );

                on_snapshot(PolledSnapshot {
                    sequence,
                    received_at: Utc::now(),
                    snapshot,
                });

                if terminal {
                    info!("Pipeline {pipeline_id} finished after {sequence} polls");
                    return PollOutcome::Completed { polls: sequence };
                }
            }
            Err(e) => {
                warn!("Poll for {pipeline_id} failed: {e}");
                on_error(e);
            }
        }
    }

    debug!("Polling of {pipeline_id} cancelled");
    PollOutcome::Cancelled
}
