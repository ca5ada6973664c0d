use serde::Serialize;
use thiserror::Error;

use crate::state::RunState;

/// Terminal outcome of a registration or login run. Every variant except
/// `Busy` and `InvalidRequest` records the state the flow was in when it
/// gave up.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("account already exists for {email}")]
    AlreadyExists { email: String, state: RunState },

    #[error("timed out in {state}: {detail}")]
    Timeout { state: RunState, detail: String },

    #[error("assertion failed in {state}: {detail}")]
    Assertion { state: RunState, detail: String },

    #[error("a run is already in progress")]
    Busy,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected failure in {state}: {source}")]
    Unexpected {
        state: RunState,
        #[source]
        source: anyhow::Error,
    },
}

impl FlowError {
    pub fn assertion(state: RunState, detail: impl Into<String>) -> Self {
        Self::Assertion {
            state,
            detail: detail.into(),
        }
    }

    pub fn timeout(state: RunState, detail: impl Into<String>) -> Self {
        Self::Timeout {
            state,
            detail: detail.into(),
        }
    }

    pub fn unexpected(state: RunState, source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected {
            state,
            source: source.into(),
        }
    }

    /// HTTP-style status code for surfacing the failure class to callers.
    pub fn code(&self) -> u16 {
        match self {
            Self::AlreadyExists { .. } => 409,
            Self::Timeout { .. } => 504,
            Self::Assertion { .. } => 422,
            Self::Busy => 503,
            Self::InvalidRequest(_) => 400,
            Self::Unexpected { .. } => 500,
        }
    }

    pub fn state(&self) -> Option<RunState> {
        match self {
            Self::AlreadyExists { state, .. }
            | Self::Timeout { state, .. }
            | Self::Assertion { state, .. }
            | Self::Unexpected { state, .. } => Some(*state),
            Self::Busy | Self::InvalidRequest(_) => None,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            message: self.to_string(),
            code: self.code(),
            state: self.state().map(|s| s.label().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
