use serde::Serialize;
use thiserror::Error;

/// Status reported for failures that never produced an HTTP response.
pub const NETWORK_FAILURE_STATUS: u16 = 499;

#[derive(Error, Debug)]
pub enum ExploreError {
    #[error("Entrance unreachable ({status}): {message}")]
    EntranceUnreachable { status: u16, message: String },

    #[error("Entrance response malformed: {0}")]
    EntranceMalformed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Graph creation failed: {0}")]
    CreateFailed(Failure),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ExploreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The server answered with a non-success status.
    Status,
    /// No response at all (connection refused, reset, timeout).
    Network,
    /// A success status whose body or token header could not be used.
    Malformed,
}

/// Outcome of a single failed transport call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status} {message}")]
pub struct Failure {
    pub status: u16,
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: FailureKind::Status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: NETWORK_FAILURE_STATUS,
            kind: FailureKind::Network,
            message: message.into(),
        }
    }

    pub fn malformed(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: FailureKind::Malformed,
            message: message.into(),
        }
    }
}

impl From<Failure> for ExploreError {
    /// Lifts a failed entrance fetch into the run-fatal tier.
    fn from(failure: Failure) -> Self {
        match failure.kind {
            FailureKind::Malformed => ExploreError::EntranceMalformed(failure.message),
            FailureKind::Status | FailureKind::Network => ExploreError::EntranceUnreachable {
                status: failure.status,
                message: failure.message,
            },
        }
    }
}
