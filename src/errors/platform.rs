// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failure reported by one of the external collaborators: a work queue, the
/// invocation endpoint, the concurrency platform, object storage or the
/// execution-log query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// A rate or concurrency limit refused the call.
    #[error("Throttled: {0}")]
    Throttled(String),

    /// The request body was not an acceptable payload.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The named queue, function, object or reservation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The platform refused the request with an error code.
    #[error("Rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Transport or backend failure.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        PlatformError::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => PlatformError::NotFound(err.to_string()),
            _ => PlatformError::Unavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::MalformedPayload(err.to_string())
    }
}
