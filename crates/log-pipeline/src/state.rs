// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::errors::WorkerError;
use crate::record::{LogRecord, Outcome};
use crate::store::{LevelCounts, QueueStatus, QueueStore};

/// Process-wide pipeline state, shared by the request handlers and the worker.
#[derive(Debug, Default)]
pub struct PipelineState {
    store: Mutex<QueueStore>,
    paused: AtomicBool,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, QueueStore> {
        self.store.lock().await
    }

    pub async fn enqueue(&self, record: LogRecord) {
        self.store.lock().await.enqueue(record);
    }

    /// Clone of the pending queue head. The record is not removed.
    pub async fn front(&self) -> Option<LogRecord> {
        self.store.lock().await.front().cloned()
    }

    pub async fn retire(&self, in_flight: &LogRecord, outcome: Outcome) -> Result<(), WorkerError> {
        self.store.lock().await.record_outcome(in_flight, outcome)
    }

    pub async fn pending_len(&self) -> usize {
        self.store.lock().await.peek_size()
    }

    pub async fn counts(&self) -> LevelCounts {
        self.store.lock().await.counts()
    }

    pub async fn pending_status(&self) -> QueueStatus {
        self.store.lock().await.snapshot_pending().into()
    }

    pub async fn dead_letter_status(&self) -> QueueStatus {
        self.store.lock().await.snapshot_dead_letter().into()
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
