// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct UnknownLevel(pub String);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// A record-level fault. The worker logs it, cools down and keeps polling.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("pending queue head is {found}, expected in-flight record {expected}")]
    HeadMismatch { expected: String, found: String },
    #[error("pending queue is empty, cannot retire in-flight record {0}")]
    EmptyQueue(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("worker did not stop within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to accept connection: {0}")]
    Accept(#[from] std::io::Error),
}
