// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Validation of `POST /api/log` bodies. Errors are reported as `{"detail": [{"loc", "msg"}]}`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::LogLevel;

const LEVEL_EXPECTATION: &str = "Input should be 'INFO', 'ERROR', 'WARNING' or 'CRITICAL'";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub loc: Vec<String>,
    pub msg: String,
}

impl ValidationIssue {
    fn new(loc: &[&str], msg: impl Into<String>) -> Self {
        ValidationIssue {
            loc: loc.iter().map(|part| part.to_string()).collect(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub detail: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSubmission {
    pub level: LogLevel,
    pub message: String,
}

/// Parses a submission body. Every problem with the body is reported, not only the first one.
pub fn parse_submission(body: &[u8]) -> Result<LogSubmission, ValidationErrors> {
    let value: Value = serde_json::from_slice(body).map_err(|err| ValidationErrors {
        detail: vec![ValidationIssue::new(
            &["body"],
            format!("JSON decode error: {err}"),
        )],
    })?;
    let Value::Object(fields) = value else {
        return Err(ValidationErrors {
            detail: vec![ValidationIssue::new(
                &["body"],
                "Input should be a valid dictionary",
            )],
        });
    };

    let level = parse_level(&fields);
    let message = parse_message(&fields);

    match (level, message) {
        (Ok(level), Ok(message)) => Ok(LogSubmission { level, message }),
        (level, message) => Err(ValidationErrors {
            detail: [level.err(), message.err()].into_iter().flatten().collect(),
        }),
    }
}

fn parse_level(fields: &Map<String, Value>) -> Result<LogLevel, ValidationIssue> {
    match fields.get("level") {
        None => Err(ValidationIssue::new(&["body", "level"], "Field required")),
        Some(Value::String(level)) => level
            .parse()
            .map_err(|_| ValidationIssue::new(&["body", "level"], LEVEL_EXPECTATION)),
        Some(_) => Err(ValidationIssue::new(&["body", "level"], LEVEL_EXPECTATION)),
    }
}

fn parse_message(fields: &Map<String, Value>) -> Result<String, ValidationIssue> {
    match fields.get("message") {
        None => Err(ValidationIssue::new(&["body", "message"], "Field required")),
        Some(Value::String(message)) => Ok(message.clone()),
        Some(_) => Err(ValidationIssue::new(
            &["body", "message"],
            "Input should be a valid string",
        )),
    }
}
