// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log record model.
//!
//! A [`LogRecord`] is created once, when a producer submits a log, and is never mutated afterwards.
//! Its [`LogLevel`] decides where the worker routes it: the three non-critical levels are counted,
//! `CRITICAL` records go to the dead-letter collection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::UnknownLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Error,
    Warning,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Info,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Decides where a record of this level ends up once processed.
    pub fn classify(&self) -> Outcome {
        match self {
            LogLevel::Info => Outcome::Accepted(CountedLevel::Info),
            LogLevel::Error => Outcome::Accepted(CountedLevel::Error),
            LogLevel::Warning => Outcome::Accepted(CountedLevel::Warning),
            LogLevel::Critical => Outcome::Rejected,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    // Case-sensitive, "info" is not a level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// The levels that have a counter. `CRITICAL` has no variant here, so it can never be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountedLevel {
    Info,
    Error,
    Warning,
}

/// Result of classifying a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processed normally, the matching counter is incremented.
    Accepted(CountedLevel),
    /// Moved to the dead-letter collection.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    /// Seconds since the unix epoch.
    pub timestamp: f64,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default();

        LogRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            level,
            message: message.into(),
        }
    }
}
