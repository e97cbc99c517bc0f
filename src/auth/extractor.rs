// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for signed requests.
//!
//! Use the `Signed` extractor in handlers to require a signature and get the
//! caller's address together with the JSON body:
//!
//! ```rust,ignore
//! async fn my_handler(Signed { principal, body }: Signed<MyRequest>) -> impl IntoResponse {
//!     // principal signed exactly this method, path and body
//! }
//! ```

use alloy::primitives::{keccak256, Bytes};
use axum::{
    body::to_bytes,
    extract::{FromRequest, OriginalUri, Request},
    http::{HeaderMap, Method},
};
use serde::de::DeserializeOwned;

use super::AuthError;
use crate::identity::recover_message_signer;
use crate::state::AppState;
use crate::types::Address;

pub const PRINCIPAL_HEADER: &str = "x-principal";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Largest request body accepted by [`Signed`].
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The exact text a caller signs (EIP-191) for a request.
///
/// `{METHOD}\n{PATH}\n{TIMESTAMP}\n{0x keccak256(body)}`
pub fn signing_message(method: &Method, path: &str, timestamp: i64, body: &[u8]) -> String {
    format!(
        "{method}\n{path}\n{timestamp}\n{}",
        alloy::hex::encode_prefixed(keccak256(body))
    )
}

/// Verify the auth headers of a request and return the signing principal.
pub fn verify_request(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
    max_skew_secs: i64,
    now: i64,
) -> Result<Address, AuthError> {
    verify(method, path, headers, body, max_skew_secs, now).map(|verified| verified.principal)
}

/// A request whose signature checked out.
struct Verified {
    principal: Address,
    timestamp: i64,
    message: String,
}

fn verify(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
    max_skew_secs: i64,
    now: i64,
) -> Result<Verified, AuthError> {
    let principal: Address = header(headers, PRINCIPAL_HEADER, "X-Principal")?
        .parse()
        .map_err(|_| AuthError::InvalidHeader("X-Principal"))?;
    let timestamp: i64 = header(headers, TIMESTAMP_HEADER, "X-Timestamp")?
        .parse()
        .map_err(|_| AuthError::InvalidHeader("X-Timestamp"))?;
    let signature: Bytes = header(headers, SIGNATURE_HEADER, "X-Signature")?
        .parse()
        .map_err(|_| AuthError::InvalidHeader("X-Signature"))?;

    // Client-supplied timestamp; abs_diff cannot overflow.
    if now.abs_diff(timestamp) > max_skew_secs.unsigned_abs() {
        return Err(AuthError::StaleTimestamp);
    }

    let message = signing_message(method, path, timestamp, body);
    let signer = recover_message_signer(message.as_bytes(), &signature)
        .ok_or(AuthError::InvalidSignature)?;
    if signer != principal {
        return Err(AuthError::PrincipalMismatch);
    }
    Ok(Verified {
        principal,
        timestamp,
        message,
    })
}

fn header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
    display: &'static str,
) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .ok_or(AuthError::MissingHeader(display))?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader(display))
}

/// Extractor for signed requests.
///
/// An empty body deserializes from JSON `null`, so `Signed<()>` fits
/// body-less routes such as `DELETE`.
pub struct Signed<T> {
    pub principal: Address,
    pub body: T,
}

impl<T> FromRequest<AppState> for Signed<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        // Nested routers strip their prefix from `uri`; sign the full path.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.0.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| AuthError::InvalidBody(e.to_string()))?;

        let now = chrono::Utc::now().timestamp();
        let max_skew_secs = state.auth.max_skew_secs;
        let Verified {
            principal,
            timestamp,
            message,
        } = verify(&parts.method, &path, &parts.headers, &bytes, max_skew_secs, now)?;

        if !state
            .replay
            .check_and_record(&principal, &message, timestamp, max_skew_secs, now)
        {
            tracing::warn!(%principal, %path, timestamp, "Rejected replayed signed request");
            return Err(AuthError::ReplayedRequest);
        }

        let body = if bytes.is_empty() {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        }
        .map_err(|e| AuthError::InvalidBody(e.to_string()))?;

        tracing::debug!(%principal, %path, "Authenticated signed request");
        Ok(Signed { principal, body })
    }
}
