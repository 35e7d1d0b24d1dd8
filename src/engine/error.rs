//! Engine-level error type.
//!
//! HTTP-agnostic: the engine returns these as typed results and never panics
//! across the host boundary. Hosts translate them to protocol-appropriate
//! responses (`api` maps kinds to status codes, `ws` to error codes).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Room or session unknown.
    #[error("not found: {0}")]
    NotFound(String),
    /// Event is illegal in the current status (e.g. Hit while waiting).
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Acting player's team is not the current team.
    #[error("not your turn: {0}")]
    NotYourTurn(String),
    /// Malformed input: wrong character-list cardinality, duplicate names,
    /// player count below minimum.
    #[error("validation error: {0}")]
    Validation(String),
    /// Character pool too small to start.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
}

impl EngineError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }
    pub fn invalid_state(detail: impl Into<String>) -> Self {
        Self::InvalidState(detail.into())
    }
    pub fn not_your_turn(detail: impl Into<String>) -> Self {
        Self::NotYourTurn(detail.into())
    }
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
    pub fn precondition_failed(detail: impl Into<String>) -> Self {
        Self::PreconditionFailed(detail.into())
    }

    /// Stable wire code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::NotYourTurn(_) => "NOT_YOUR_TURN",
            Self::Validation(_) => "VALIDATION",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
        }
    }
}
