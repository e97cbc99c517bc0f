// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::Role;
use crate::storage::StoreError;
use crate::types::{Address, ClaimId, ClaimTopic};

/// Every way a core operation can fail.
///
/// A failed operation leaves all registry and ledger state untouched.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("principal {principal} lacks the {role} role")]
    Authorization { principal: Address, role: Role },

    #[error("wallet {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("wallet {0} is not registered")]
    NotRegistered(Address),

    #[error("claim topic {0} is already required")]
    DuplicateClaimTopic(ClaimTopic),

    #[error("claim signature does not validate for issuer {issuer}")]
    SignatureInvalid { issuer: Address },

    #[error("compliance rejected: {0}")]
    Compliance(String),

    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance { available: u128, requested: u128 },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("claim topic {0} is not required")]
    ClaimTopicNotFound(ClaimTopic),

    #[error("issuer {0} is already trusted")]
    TrustedIssuerExists(Address),

    #[error("issuer {0} is not trusted")]
    TrustedIssuerNotFound(Address),

    #[error("identity {0} does not exist")]
    IdentityNotFound(Address),

    #[error("claim {0} not found")]
    ClaimNotFound(ClaimId),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Stable machine readable code for API clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Authorization { .. } => "authorization_error",
            CoreError::AlreadyRegistered(_) => "already_registered",
            CoreError::NotRegistered(_) => "not_registered",
            CoreError::DuplicateClaimTopic(_) => "duplicate_claim_topic",
            CoreError::SignatureInvalid { .. } => "signature_invalid",
            CoreError::Compliance(_) => "compliance_error",
            CoreError::InsufficientBalance { .. } => "insufficient_balance",
            CoreError::InvalidAmount(_) => "invalid_amount",
            CoreError::InvalidArgument(_) => "invalid_argument",
            CoreError::ClaimTopicNotFound(_) => "claim_topic_not_found",
            CoreError::TrustedIssuerExists(_) => "trusted_issuer_exists",
            CoreError::TrustedIssuerNotFound(_) => "trusted_issuer_not_found",
            CoreError::IdentityNotFound(_) => "identity_not_found",
            CoreError::ClaimNotFound(_) => "claim_not_found",
            CoreError::LimitExceeded(_) => "limit_exceeded",
            CoreError::Storage(_) => "storage_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Authorization { .. } => StatusCode::FORBIDDEN,
            CoreError::AlreadyRegistered(_)
            | CoreError::DuplicateClaimTopic(_)
            | CoreError::TrustedIssuerExists(_) => StatusCode::CONFLICT,
            CoreError::NotRegistered(_)
            | CoreError::ClaimTopicNotFound(_)
            | CoreError::TrustedIssuerNotFound(_)
            | CoreError::IdentityNotFound(_)
            | CoreError::ClaimNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::SignatureInvalid { .. }
            | CoreError::Compliance(_)
            | CoreError::InsufficientBalance { .. }
            | CoreError::LimitExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::InvalidAmount(_) | CoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_code: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        if let CoreError::Storage(ref e) = err {
            tracing::error!(error = %e, "storage failure while serving request");
        }
        Self {
            status: err.status_code(),
            message: err.to_string(),
            error_code: Some(err.error_code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.error_code,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn core_errors_map_to_statuses() {
        let err: ApiError = CoreError::AlreadyRegistered(Address::ZERO).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.error_code, Some("already_registered"));

        let err: ApiError = CoreError::Authorization {
            principal: Address::ZERO,
            role: Role::Agent,
        }
        .into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err: ApiError = CoreError::Compliance("paused".into()).into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = CoreError::InvalidAmount("zero".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn boundary_errors_omit_error_code() {
        let response = ApiError::not_found("Identity 0x01 not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"error":"Identity 0x01 not found"}"#);
    }

    #[tokio::test]
    async fn core_errors_carry_error_code() {
        let err: ApiError = CoreError::InsufficientBalance {
            available: 3,
            requested: 5,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error_code"], "insufficient_balance");
        assert_eq!(
            body["error"],
            "insufficient balance: 3 available, 5 requested"
        );
    }
}
