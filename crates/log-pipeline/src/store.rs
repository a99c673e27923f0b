// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory storage for the pipeline: the pending queue, the dead-letter collection and the
//! per-level counters.
//!
//! `QueueStore` itself is not synchronized. The pipeline keeps it behind a mutex so that producer
//! appends and worker removals never interleave.

use serde::Serialize;
use std::collections::VecDeque;

use crate::errors::WorkerError;
use crate::record::{CountedLevel, LogRecord, Outcome};

/// Counters for the non-critical levels. Serializes as `{"INFO":..,"ERROR":..,"WARNING":..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    #[serde(rename = "INFO")]
    pub info: u64,
    #[serde(rename = "ERROR")]
    pub error: u64,
    #[serde(rename = "WARNING")]
    pub warning: u64,
}

impl LevelCounts {
    fn increment(&mut self, level: CountedLevel) {
        let counter = match level {
            CountedLevel::Info => &mut self.info,
            CountedLevel::Error => &mut self.error,
            CountedLevel::Warning => &mut self.warning,
        };
        *counter += 1;
    }

    pub fn get(&self, level: CountedLevel) -> u64 {
        match level {
            CountedLevel::Info => self.info,
            CountedLevel::Error => self.error,
            CountedLevel::Warning => self.warning,
        }
    }

    pub fn total(&self) -> u64 {
        self.info + self.error + self.warning
    }
}

/// Size and contents of a queue at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    pub queue_size: usize,
    pub items: Vec<LogRecord>,
}

impl From<Vec<LogRecord>> for QueueStatus {
    fn from(items: Vec<LogRecord>) -> Self {
        QueueStatus {
            queue_size: items.len(),
            items,
        }
    }
}

#[derive(Debug, Default)]
pub struct QueueStore {
    pending: VecDeque<LogRecord>,
    dead_letter: Vec<LogRecord>,
    counts: LevelCounts,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail of the pending queue. Growth is unbounded.
    pub fn enqueue(&mut self, record: LogRecord) {
        self.pending.push_back(record);
    }

    pub fn peek_size(&self) -> usize {
        self.pending.len()
    }

    /// The record the worker would process next. It stays in the queue.
    pub fn front(&self) -> Option<&LogRecord> {
        self.pending.front()
    }

    pub fn snapshot_pending(&self) -> Vec<LogRecord> {
        self.pending.iter().cloned().collect()
    }

    pub fn snapshot_dead_letter(&self) -> Vec<LogRecord> {
        self.dead_letter.clone()
    }

    pub fn dead_letter_len(&self) -> usize {
        self.dead_letter.len()
    }

    pub fn counts(&self) -> LevelCounts {
        self.counts
    }

    /// Removes `in_flight` from the head of the pending queue and routes it according to
    /// `outcome`. This is the only way a record leaves the pending queue.
    ///
    /// The head must be the record that was handed to the worker. If it is not, nothing is
    /// changed and an error is returned.
    pub fn record_outcome(
        &mut self,
        in_flight: &LogRecord,
        outcome: Outcome,
    ) -> Result<(), WorkerError> {
        match self.pending.front() {
            None => return Err(WorkerError::EmptyQueue(in_flight.id.clone())),
            Some(head) if head.id != in_flight.id => {
                return Err(WorkerError::HeadMismatch {
                    expected: in_flight.id.clone(),
                    found: head.id.clone(),
                })
            }
            Some(_) => {}
        }

        let Some(record) = self.pending.pop_front() else {
            return Err(WorkerError::EmptyQueue(in_flight.id.clone()));
        };
        match outcome {
            Outcome::Rejected => self.dead_letter.push(record),
            Outcome::Accepted(level) => self.counts.increment(level),
        }
        Ok(())
    }
}
