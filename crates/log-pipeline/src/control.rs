// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::record::{LogLevel, LogRecord};
use crate::state::PipelineState;
use crate::store::{LevelCounts, QueueStatus};
use crate::worker::WorkerState;

/// Operator-facing view of the pause flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Paused,
    Running,
}

/// Cheap to clone handle used by request handlers to drive the pipeline. Every operation is safe
/// to call concurrently with the worker and with other handlers.
#[derive(Clone, Debug)]
pub struct PipelineHandle {
    state: Arc<PipelineState>,
    worker_state: watch::Receiver<WorkerState>,
}

impl PipelineHandle {
    pub fn new(state: Arc<PipelineState>, worker_state: watch::Receiver<WorkerState>) -> Self {
        PipelineHandle {
            state,
            worker_state,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Creates a record and appends it to the pending queue. Returns the queued record.
    pub async fn submit(&self, level: LogLevel, message: impl Into<String>) -> LogRecord {
        let record = LogRecord::new(level, message);
        debug!(id = %record.id, level = %record.level, "Log record queued");
        self.state.enqueue(record.clone()).await;
        record
    }

    pub fn pause(&self) {
        self.state.set_paused(true);
        info!("Log pipeline worker paused");
    }

    pub fn resume(&self) {
        self.state.set_paused(false);
        info!("Log pipeline worker resumed");
    }

    pub async fn get_stats(&self) -> LevelCounts {
        self.state.counts().await
    }

    pub async fn get_queue_status(&self) -> QueueStatus {
        self.state.pending_status().await
    }

    pub async fn get_dead_letter_status(&self) -> QueueStatus {
        self.state.dead_letter_status().await
    }

    pub fn get_worker_status(&self) -> WorkerStatus {
        if self.state.is_paused() {
            WorkerStatus::Paused
        } else {
            WorkerStatus::Running
        }
    }

    /// Live state of the worker state machine.
    pub fn worker_state(&self) -> WorkerState {
        *self.worker_state.borrow()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn detached_handle() -> (PipelineHandle, watch::Sender<WorkerState>) {
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);
        (
            PipelineHandle::new(Arc::new(PipelineState::new()), state_rx),
            state_tx,
        )
    }

    #[tokio::test]
    async fn test_submit_queues_in_order() {
        let (handle, _state_tx) = detached_handle();

        let first = handle.submit(LogLevel::Info, "first").await;
        let second = handle.submit(LogLevel::Critical, "second").await;

        let status = handle.get_queue_status().await;
        assert_eq!(status.queue_size, 2);
        assert_eq!(status.items, vec![first, second]);
    }

    #[tokio::test]
    async fn test_pause_and_resume_are_idempotent() {
        let (handle, _state_tx) = detached_handle();
        assert_eq!(handle.get_worker_status(), WorkerStatus::Running);

        handle.pause();
        handle.pause();
        assert_eq!(handle.get_worker_status(), WorkerStatus::Paused);

        handle.resume();
        handle.resume();
        assert_eq!(handle.get_worker_status(), WorkerStatus::Running);
    }

    #[tokio::test]
    async fn test_fresh_pipeline_is_empty() {
        let (handle, _state_tx) = detached_handle();

        assert_eq!(handle.get_stats().await, LevelCounts::default());
        assert_eq!(handle.get_queue_status().await.queue_size, 0);
        assert_eq!(handle.get_dead_letter_status().await.queue_size, 0);
        assert_eq!(handle.worker_state(), WorkerState::Idle);
    }

    #[tokio::test]
    async fn test_worker_state_follows_worker() {
        let (handle, state_tx) = detached_handle();
        state_tx.send_replace(WorkerState::Processing);
        assert_eq!(handle.worker_state(), WorkerState::Processing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_are_not_lost() {
        let (handle, _state_tx) = detached_handle();

        let tasks: Vec<_> = (0..8)
            .map(|task| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    for i in 0..50 {
                        handle
                            .submit(LogLevel::Info, format!("task {task} record {i}"))
                            .await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(handle.get_queue_status().await.queue_size, 400);
    }

    #[test]
    fn test_worker_status_serialization() {
        assert_eq!(
            serde_json::to_string(&WorkerStatus::Paused).unwrap(),
            "\"paused\""
        );
        assert_eq!(
            serde_json::to_string(&WorkerStatus::Running).unwrap(),
            "\"running\""
        );
    }
}
