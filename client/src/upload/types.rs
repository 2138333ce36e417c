//! Upload error definitions

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::{ErrorCause, Stage, StageFailure};

/// Errors that can occur while uploading the image
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read image {path:?} for upload")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build upload request")]
    InvalidRequest(#[source] reqwest::Error),

    #[error("Could not connect to {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Connecting to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout {
        endpoint: String,
        timeout: Duration,
        #[source]
        source: reqwest::Error,
    },

    #[error("Upload stalled: no body chunk accepted within {0:?}")]
    WriteTimeout(Duration),

    #[error("No response data received within {0:?}")]
    ReadTimeout(Duration),

    #[error("Server returned HTTP {status}")]
    HttpStatus { status: u16, body: String },

    #[error("Empty response from server (HTTP {status})")]
    EmptyBody { status: u16 },

    #[error("Upload request failed")]
    Transport(#[source] reqwest::Error),
}

impl UploadError {
    /// HTTP status of the response, when one was received
    pub fn http_status(&self) -> Option<u16> {
        match self {
            UploadError::HttpStatus { status, .. } | UploadError::EmptyBody { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl StageFailure for UploadError {
    const STAGE: Stage = Stage::Upload;

    fn kind(&self) -> &'static str {
        match self {
            UploadError::ReadFile { .. } => "ReadFile",
            UploadError::InvalidRequest(_) => "InvalidRequest",
            UploadError::Connect { .. } => "Connect",
            UploadError::ConnectTimeout { .. } => "ConnectTimeout",
            UploadError::WriteTimeout(_) => "WriteTimeout",
            UploadError::ReadTimeout(_) => "ReadTimeout",
            UploadError::HttpStatus { .. } => "HttpStatus",
            UploadError::EmptyBody { .. } => "EmptyBody",
            UploadError::Transport(_) => "Transport",
        }
    }

    fn fault(&self) -> Option<ErrorCause> {
        match self {
            UploadError::ReadFile { source, .. } => Some(ErrorCause::io(source)),
            UploadError::InvalidRequest(source)
            | UploadError::Connect { source, .. }
            | UploadError::ConnectTimeout { source, .. }
            | UploadError::Transport(source) => Some(reqwest_cause(source)),
            UploadError::HttpStatus { body, .. } if !body.is_empty() => {
                Some(ErrorCause::new("http/body", body))
            }
            UploadError::HttpStatus { .. }
            | UploadError::EmptyBody { .. }
            | UploadError::WriteTimeout(_)
            | UploadError::ReadTimeout(_) => None,
        }
    }
}

/// Classify a reqwest error and report its innermost message
fn reqwest_cause(error: &reqwest::Error) -> ErrorCause {
    let kind = if error.is_timeout() {
        "reqwest/timeout"
    } else if error.is_connect() {
        "reqwest/connect"
    } else if error.is_body() {
        "reqwest/body"
    } else if error.is_decode() {
        "reqwest/decode"
    } else if error.is_builder() {
        "reqwest/builder"
    } else if error.is_request() {
        "reqwest/request"
    } else {
        "reqwest"
    };

    let mut root: &dyn std::error::Error = error;
    while let Some(next) = root.source() {
        root = next;
    }
    ErrorCause::new(kind, root)
}
