// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP API in front of the pipeline.
//!
//! This layer owns transport and request validation only. Every route maps onto one
//! [`PipelineHandle`] operation.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{http, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::control::PipelineHandle;
use crate::errors::ServerError;
use crate::http_utils::{
    create_json_response, log_and_create_http_response, verify_request_content_length,
    HttpResponse,
};
use crate::validation::parse_submission;

const LOG_ENDPOINT_PATH: &str = "/api/log";
const STATS_ENDPOINT_PATH: &str = "/api/stats";
const QUEUE_STATUS_ENDPOINT_PATH: &str = "/api/queue-status";
const DLQ_STATUS_ENDPOINT_PATH: &str = "/api/dlq-status";
const WORKER_STATUS_ENDPOINT_PATH: &str = "/api/worker-status";
const PAUSE_ENDPOINT_PATH: &str = "/api/pause";
const RESUME_ENDPOINT_PATH: &str = "/api/resume";
const INFO_ENDPOINT_PATH: &str = "/info";

const ENDPOINTS: [&str; 8] = [
    LOG_ENDPOINT_PATH,
    STATS_ENDPOINT_PATH,
    QUEUE_STATUS_ENDPOINT_PATH,
    DLQ_STATUS_ENDPOINT_PATH,
    WORKER_STATUS_ENDPOINT_PATH,
    PAUSE_ENDPOINT_PATH,
    RESUME_ENDPOINT_PATH,
    INFO_ENDPOINT_PATH,
];

pub struct LogApi {
    pub config: Arc<Config>,
    pub pipeline: PipelineHandle,
}

impl LogApi {
    pub fn new(config: Arc<Config>, pipeline: PipelineHandle) -> Self {
        LogApi { config, pipeline }
    }

    /// Binds the configured address and serves until `cancel_token` fires.
    pub async fn start(&self, cancel_token: CancellationToken) -> Result<(), ServerError> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!("Log pipeline API listening on {addr}");

        self.serve_tcp(listener, cancel_token).await
    }

    /// Serves connections from `listener`. Once `cancel_token` fires no new connections are
    /// accepted, open ones are shut down gracefully and awaited.
    pub async fn serve_tcp(
        &self,
        listener: TcpListener,
        cancel_token: CancellationToken,
    ) -> Result<(), ServerError> {
        let config = Arc::clone(&self.config);
        let pipeline = self.pipeline.clone();
        let service = service_fn(move |req: Request<Incoming>| {
            // called for each http request
            let config = Arc::clone(&config);
            let pipeline = pipeline.clone();
            LogApi::endpoint_handler(config, req, pipeline)
        });

        let server = http1::Builder::new();
        let mut joinset = JoinSet::new();

        loop {
            let conn = tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Log pipeline API no longer accepting connections");
                    break;
                },
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };
            let io = TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            let cancel_token = cancel_token.clone();
            joinset.spawn(async move {
                let mut conn = std::pin::pin!(server.serve_connection(io, service));
                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = cancel_token.cancelled() => {
                        conn.as_mut().graceful_shutdown();
                        conn.await
                    }
                };
                if let Err(e) = result {
                    error!("Connection error: {e}");
                }
            });
        }

        while let Some(finished) = joinset.join_next().await {
            if let Err(e) = finished {
                if e.is_panic() {
                    error!("Connection handler panicked: {:?}", e);
                }
            }
        }
        info!("Log pipeline API stopped");
        Ok(())
    }

    async fn endpoint_handler(
        config: Arc<Config>,
        req: Request<Incoming>,
        pipeline: PipelineHandle,
    ) -> http::Result<HttpResponse> {
        match (req.method(), req.uri().path()) {
            (&Method::POST, LOG_ENDPOINT_PATH) => {
                Self::ingest_handler(config.max_request_content_length, req, &pipeline).await
            }
            (&Method::GET, STATS_ENDPOINT_PATH) => {
                create_json_response(&pipeline.get_stats().await, StatusCode::OK)
            }
            (&Method::GET, QUEUE_STATUS_ENDPOINT_PATH) => {
                create_json_response(&pipeline.get_queue_status().await, StatusCode::OK)
            }
            (&Method::GET, DLQ_STATUS_ENDPOINT_PATH) => {
                create_json_response(&pipeline.get_dead_letter_status().await, StatusCode::OK)
            }
            (&Method::GET, WORKER_STATUS_ENDPOINT_PATH) => create_json_response(
                &json!({
                    "status": pipeline.get_worker_status(),
                    "state": pipeline.worker_state(),
                }),
                StatusCode::OK,
            ),
            (&Method::POST, PAUSE_ENDPOINT_PATH) => {
                pipeline.pause();
                create_json_response(&json!({ "status": "paused" }), StatusCode::ACCEPTED)
            }
            (&Method::POST, RESUME_ENDPOINT_PATH) => {
                pipeline.resume();
                create_json_response(&json!({ "status": "running" }), StatusCode::ACCEPTED)
            }
            (&Method::GET, INFO_ENDPOINT_PATH) => Self::info_handler(&config),
            (_, path) if ENDPOINTS.contains(&path) => log_and_create_http_response(
                &format!("Method {} not allowed on {path}", req.method()),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (_, path) => {
                debug!("No route for {path}");
                create_json_response(&json!({ "message": "Not Found" }), StatusCode::NOT_FOUND)
            }
        }
    }

    async fn ingest_handler(
        max_content_length: usize,
        req: Request<Incoming>,
        pipeline: &PipelineHandle,
    ) -> http::Result<HttpResponse> {
        let (parts, body) = req.into_parts();
        if let Some(response) = verify_request_content_length(
            &parts.headers,
            max_content_length,
            "Error processing log",
        ) {
            return response;
        }

        let body_bytes = match Limited::new(body, max_content_length).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return log_and_create_http_response(
                    "Error processing log: Payload too large",
                    StatusCode::PAYLOAD_TOO_LARGE,
                );
            }
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error reading log request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        match parse_submission(&body_bytes) {
            Ok(submission) => {
                pipeline.submit(submission.level, submission.message).await;
                create_json_response(&json!({ "status": "log_queued" }), StatusCode::ACCEPTED)
            }
            Err(errors) => {
                debug!("Rejected log submission: {:?}", errors.detail);
                create_json_response(&errors, StatusCode::UNPROCESSABLE_ENTITY)
            }
        }
    }

    fn info_handler(config: &Config) -> http::Result<HttpResponse> {
        let worker = &config.worker;
        let response_json = json!(
            {
                "endpoints": ENDPOINTS,
                "config": {
                    "processing_latency_ms": worker.processing_latency.as_millis() as u64,
                    "idle_poll_interval_ms": worker.idle_poll_interval.as_millis() as u64,
                    "pause_poll_interval_ms": worker.pause_poll_interval.as_millis() as u64,
                    "error_cooldown_ms": worker.error_cooldown.as_millis() as u64,
                    "max_request_content_length": config.max_request_content_length,
                }
            }
        );
        create_json_response(&response_json, StatusCode::OK)
    }
}
