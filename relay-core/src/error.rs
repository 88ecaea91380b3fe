use std::time::Duration;

use thiserror::Error;

/// Why a position could not be acquired.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {}ms waiting for a position", .0.as_millis())]
    Timeout(Duration),
}

/// Terminal failure of one pipeline run.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("error finding position: {0}")]
    Location(#[from] LocationError),

    #[error("weather request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("weather request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid weather request URL: {0}")]
    Url(String),

    #[error("weather response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("weather response is missing `{0}`")]
    MissingField(&'static str),
}

impl RelayError {
    /// Transport-level failures, as opposed to a body that arrived but could
    /// not be understood.
    pub fn is_network(&self) -> bool {
        matches!(self, RelayError::Network(_) | RelayError::Status { .. } | RelayError::Url(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, RelayError::Json(_) | RelayError::MissingField(_))
    }
}

/// The messaging channel reported that a message did not reach the device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to send weather info: {reason}")]
pub struct DeliveryError {
    pub reason: String,
}

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}
