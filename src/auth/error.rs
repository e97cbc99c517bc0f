// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a signed request was rejected before reaching a handler.
#[derive(Debug)]
pub enum AuthError {
    /// A required auth header is absent
    MissingHeader(&'static str),
    /// An auth header is present but unparseable
    InvalidHeader(&'static str),
    /// Signature does not recover to any key
    InvalidSignature,
    /// Signature recovers to a key other than `X-Principal`
    PrincipalMismatch,
    /// Timestamp outside the accepted skew window
    StaleTimestamp,
    /// The same signed request was already accepted
    ReplayedRequest,
    /// Body could not be read or deserialized
    InvalidBody(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader(_) => "missing_auth_header",
            AuthError::InvalidHeader(_) => "invalid_auth_header",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::PrincipalMismatch => "principal_mismatch",
            AuthError::StaleTimestamp => "stale_timestamp",
            AuthError::ReplayedRequest => "replayed_request",
            AuthError::InvalidBody(_) => "invalid_body",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader(_)
            | AuthError::InvalidHeader(_)
            | AuthError::InvalidSignature
            | AuthError::PrincipalMismatch
            | AuthError::StaleTimestamp
            | AuthError::ReplayedRequest => StatusCode::UNAUTHORIZED,
            AuthError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingHeader(name) => write!(f, "{name} header is required"),
            AuthError::InvalidHeader(name) => write!(f, "{name} header is malformed"),
            AuthError::InvalidSignature => write!(f, "Request signature is invalid"),
            AuthError::PrincipalMismatch => {
                write!(f, "Request signature does not match the declared principal")
            }
            AuthError::StaleTimestamp => write!(f, "Request timestamp is outside the allowed window"),
            AuthError::ReplayedRequest => write!(f, "Request was already submitted"),
            AuthError::InvalidBody(msg) => write!(f, "Invalid request body: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
