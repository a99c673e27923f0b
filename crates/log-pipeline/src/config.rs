// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::worker::WorkerConfig;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_REQUEST_CONTENT_LENGTH: usize = 1024 * 1024; // 1MiB in Bytes
const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_HOST: &str = "LOG_PIPELINE_HOST";
pub const ENV_PORT: &str = "LOG_PIPELINE_PORT";
pub const ENV_PROCESSING_LATENCY_MS: &str = "LOG_PIPELINE_PROCESSING_LATENCY_MS";
pub const ENV_IDLE_POLL_MS: &str = "LOG_PIPELINE_IDLE_POLL_MS";
pub const ENV_PAUSE_POLL_MS: &str = "LOG_PIPELINE_PAUSE_POLL_MS";
pub const ENV_ERROR_COOLDOWN_MS: &str = "LOG_PIPELINE_ERROR_COOLDOWN_MS";
pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "LOG_PIPELINE_SHUTDOWN_TIMEOUT_MS";
pub const ENV_MAX_CONTENT_LENGTH: &str = "LOG_PIPELINE_MAX_CONTENT_LENGTH";
pub const ENV_LOG_LEVEL: &str = "LOG_PIPELINE_LOG_LEVEL";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub worker: WorkerConfig,
    /// how long shutdown waits for the worker to stop
    pub shutdown_timeout: Duration,
    pub max_request_content_length: usize,
    /// `tracing` level for this crate, the server binary builds its subscriber filter from it
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            worker: WorkerConfig::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_request_content_length: DEFAULT_MAX_REQUEST_CONTENT_LENGTH,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Reads the configuration from `LOG_PIPELINE_*` environment variables. Unset variables keep
    /// their default, set but unparseable ones are an error.
    pub fn new() -> Result<Config, ConfigError> {
        let defaults = Config::default();
        let worker_defaults = defaults.worker;

        let worker = WorkerConfig {
            processing_latency: read_millis(
                ENV_PROCESSING_LATENCY_MS,
                worker_defaults.processing_latency,
            )?,
            idle_poll_interval: read_millis(ENV_IDLE_POLL_MS, worker_defaults.idle_poll_interval)?,
            pause_poll_interval: read_millis(
                ENV_PAUSE_POLL_MS,
                worker_defaults.pause_poll_interval,
            )?,
            error_cooldown: read_millis(ENV_ERROR_COOLDOWN_MS, worker_defaults.error_cooldown)?,
        };

        Ok(Config {
            host: read_var(ENV_HOST)?.unwrap_or(defaults.host),
            port: read_var(ENV_PORT)?.unwrap_or(defaults.port),
            worker,
            shutdown_timeout: read_millis(ENV_SHUTDOWN_TIMEOUT_MS, defaults.shutdown_timeout)?,
            max_request_content_length: read_var(ENV_MAX_CONTENT_LENGTH)?
                .unwrap_or(defaults.max_request_content_length),
            log_level: env::var(ENV_LOG_LEVEL)
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// `EnvFilter` directives for the configured level. hyper and h2 internals stay silent.
    pub fn log_filter(&self) -> String {
        format!("h2=off,hyper=off,{}", self.log_level)
    }
}

fn read_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

fn read_millis(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    Ok(read_var::<u64>(name)?
        .map(Duration::from_millis)
        .unwrap_or(default))
}
