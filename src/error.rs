// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent caller-facing messages.

use crate::services::api_client::ApiError;

/// Application error surfaced by the session and subscription operations.
///
/// Every variant resolves to a human-readable message via
/// [`AppError::user_message`]; none of them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Local validation failed; no request was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The server explicitly refused (wrong code, unknown account, ...).
    #[error("{0}")]
    AuthRejected(String),

    #[error(transparent)]
    Transport(#[from] ApiError),

    /// An authenticated-only operation was attempted without a token,
    /// or the session ended before the operation completed.
    #[error("No active session")]
    NoSession,

    /// The operation is not valid from the current auth state.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// An OTP request is already in flight for this session.
    #[error("A request is already in progress")]
    Busy,

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Message used when the server rejects an OTP without explanation.
    pub const GENERIC_REJECTION: &'static str = "Request was rejected by the server";

    /// Whether this error came from the network layer (transport, HTTP
    /// status, or decoding) rather than local checks.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    /// Message suitable for showing to the user.
    ///
    /// Validation and rejection errors carry their own text; everything
    /// else falls back to the description of the error kind.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) | AppError::AuthRejected(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for session and store operations.
pub type Result<T> = std::result::Result<T, AppError>;
