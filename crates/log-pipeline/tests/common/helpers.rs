// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use log_pipeline::{
    api::LogApi, config::Config, errors::ServerError, lifecycle::Pipeline, worker::WorkerConfig,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const PROCESSING_LATENCY: Duration = Duration::from_millis(100);

/// Waits comfortably longer than one processing cycle.
pub async fn wait_past_one_cycle() {
    tokio::time::sleep(PROCESSING_LATENCY * 3).await;
}

pub struct TestServer {
    pub port: u16,
    pub pipeline: Pipeline,
    pub cancel_token: CancellationToken,
    pub server_handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Starts a pipeline with fast worker timings behind an API bound to a random port.
    pub async fn start() -> Self {
        let config = Config {
            port: 0,
            worker: WorkerConfig {
                processing_latency: PROCESSING_LATENCY,
                idle_poll_interval: Duration::from_millis(5),
                pause_poll_interval: Duration::from_millis(10),
                error_cooldown: Duration::from_millis(200),
            },
            max_request_content_length: 1024,
            ..Config::default()
        };
        let pipeline = Pipeline::start(config.worker.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().expect("Failed to get local addr").port();

        let api = LogApi::new(Arc::new(config), pipeline.handle());
        let cancel_token = CancellationToken::new();
        let server_token = cancel_token.clone();
        let server_handle =
            tokio::spawn(async move { api.serve_tcp(listener, server_token).await });

        TestServer {
            port,
            pipeline,
            cancel_token,
            server_handle,
        }
    }

    pub async fn stop(self) {
        self.cancel_token.cancel();
        timeout(Duration::from_secs(2), self.server_handle)
            .await
            .expect("API did not stop in time")
            .expect("API task failed")
            .expect("API returned an error");
        self.pipeline
            .shutdown(Duration::from_secs(2))
            .await
            .expect("Pipeline did not shut down cleanly");
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send_json_request(self.port, uri, "GET", None)
            .await
            .expect("GET request failed")
    }

    pub async fn post(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|value| value.to_string().into_bytes());
        send_json_request(self.port, uri, "POST", body)
            .await
            .expect("POST request failed")
    }

    pub async fn submit_log(&self, level: &str, message: &str) -> (StatusCode, Value) {
        self.post(
            "/api/log",
            Some(serde_json::json!({ "level": level, "message": message })),
        )
        .await
    }
}

/// Send an HTTP request over TCP and return the status and the body parsed as JSON
pub async fn send_json_request(
    port: u16,
    uri: &str,
    method: &str,
    body: Option<Vec<u8>>,
) -> Result<(StatusCode, Value), Box<dyn std::error::Error + Send + Sync>> {
    let stream = timeout(
        Duration::from_secs(2),
        tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port)),
    )
    .await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json");

    let body_data = body.unwrap_or_default();
    request_builder = request_builder.header("Content-Length", body_data.len().to_string());
    let request = request_builder.body(Full::new(Bytes::from(body_data)))?;
    let response = timeout(Duration::from_secs(2), sender.send_request(request)).await??;

    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}
