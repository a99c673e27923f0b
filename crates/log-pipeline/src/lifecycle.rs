// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::control::PipelineHandle;
use crate::errors::LifecycleError;
use crate::state::PipelineState;
use crate::worker::{Worker, WorkerConfig};

/// Owns the background worker task.
pub struct Pipeline {
    handle: PipelineHandle,
    cancel_token: CancellationToken,
    worker_task: JoinHandle<()>,
}

impl Pipeline {
    /// Creates empty pipeline state and spawns the worker. Must be called from within a tokio
    /// runtime.
    pub fn start(config: WorkerConfig) -> Self {
        let state = Arc::new(PipelineState::new());
        let cancel_token = CancellationToken::new();
        let (worker, state_rx) = Worker::new(Arc::clone(&state), config, cancel_token.clone());

        debug!("Spawning log pipeline worker");
        let worker_task = tokio::spawn(worker.run());

        Pipeline {
            handle: PipelineHandle::new(state, state_rx),
            cancel_token,
            worker_task,
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.worker_task.is_finished()
    }

    /// Signals the worker to stop and waits up to `timeout` for it to finish. A worker that has
    /// already stopped counts as a clean shutdown.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), LifecycleError> {
        info!("Stopping log pipeline worker");
        self.cancel_token.cancel();

        let mut worker_task = self.worker_task;
        match tokio::time::timeout(timeout, &mut worker_task).await {
            Ok(Ok(())) => {
                info!("Log pipeline worker stopped successfully");
                Ok(())
            }
            Ok(Err(err)) if err.is_panic() => {
                error!("Log pipeline worker panicked: {err}");
                Err(LifecycleError::WorkerPanicked(err.to_string()))
            }
            Ok(Err(_)) => Ok(()),
            Err(_) => {
                error!("Log pipeline worker did not stop within {timeout:?}, aborting it");
                worker_task.abort();
                Err(LifecycleError::ShutdownTimeout(timeout))
            }
        }
    }
}
