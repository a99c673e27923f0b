// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Background worker draining the pending queue.
//!
//! The worker is a state machine evaluated once per tick:
//!
//! * paused flag set: `Paused`, wait `pause_poll_interval`
//! * pending queue empty: `Idle`, wait `idle_poll_interval`
//! * otherwise: `Processing`, take the head, wait `processing_latency`, then retire the record to
//!   the counters or the dead-letter collection
//!
//! A record whose processing has started is retired even if the pipeline is paused while it is in
//! flight. Cancellation during the latency abandons it: it stays at the head of the pending queue
//! and is never classified. Record-level faults are logged and followed by `error_cooldown`.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::WorkerError;
use crate::record::Outcome;
use crate::state::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Processing,
    Paused,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Processing => "processing",
            WorkerState::Paused => "paused",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Simulated cost of processing one record.
    pub processing_latency: Duration,
    /// How long to wait before looking at an empty queue again.
    pub idle_poll_interval: Duration,
    /// How long to wait before checking the pause flag again.
    pub pause_poll_interval: Duration,
    /// Back-off after a record-level fault.
    pub error_cooldown: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            processing_latency: Duration::from_secs(2),
            idle_poll_interval: Duration::from_millis(100),
            pause_poll_interval: Duration::from_secs(1),
            error_cooldown: Duration::from_secs(5),
        }
    }
}

/// What the run loop does after a tick.
#[derive(Debug, PartialEq, Eq)]
enum Tick {
    Wait(Duration),
    Next,
    Cancelled,
}

pub struct Worker {
    state: Arc<PipelineState>,
    config: WorkerConfig,
    cancel_token: CancellationToken,
    state_tx: watch::Sender<WorkerState>,
}

impl Worker {
    /// Creates a worker in the `Idle` state. The receiver tracks state transitions.
    pub fn new(
        state: Arc<PipelineState>,
        config: WorkerConfig,
        cancel_token: CancellationToken,
    ) -> (Self, watch::Receiver<WorkerState>) {
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);
        let worker = Worker {
            state,
            config,
            cancel_token,
            state_tx,
        };
        (worker, state_rx)
    }

    pub async fn run(self) {
        info!("Log pipeline worker started");

        while !self.cancel_token.is_cancelled() {
            let delay = match self.tick().await {
                Ok(Tick::Next) => continue,
                Ok(Tick::Wait(delay)) => delay,
                Ok(Tick::Cancelled) => break,
                Err(err) => {
                    error!("Log pipeline worker fault: {err}");
                    self.config.error_cooldown
                }
            };
            if !self.sleep_unless_cancelled(delay).await {
                break;
            }
        }

        self.transition(WorkerState::Stopped);
        info!("Log pipeline worker stopped");
    }

    async fn tick(&self) -> Result<Tick, WorkerError> {
        if self.state.is_paused() {
            self.transition(WorkerState::Paused);
            return Ok(Tick::Wait(self.config.pause_poll_interval));
        }

        let Some(record) = self.state.front().await else {
            self.transition(WorkerState::Idle);
            return Ok(Tick::Wait(self.config.idle_poll_interval));
        };

        self.transition(WorkerState::Processing);
        debug!(id = %record.id, level = %record.level, "Processing log record");

        if !self
            .sleep_unless_cancelled(self.config.processing_latency)
            .await
        {
            debug!(id = %record.id, "Abandoning in-flight log record");
            return Ok(Tick::Cancelled);
        }

        if self.state.is_paused() {
            debug!(id = %record.id, "Paused mid-record, completing in-flight log record");
        }

        let outcome = record.level.classify();
        self.state.retire(&record, outcome).await?;

        match outcome {
            Outcome::Rejected => {
                info!(id = %record.id, level = %record.level, "Log record moved to dead-letter queue")
            }
            Outcome::Accepted(_) => {
                debug!(id = %record.id, level = %record.level, "Log record counted")
            }
        }
        Ok(Tick::Next)
    }

    /// Returns false if the token fired before `delay` elapsed.
    async fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn transition(&self, next: WorkerState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!("Log pipeline worker is now {next}");
        }
    }
}
