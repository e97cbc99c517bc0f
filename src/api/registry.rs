// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity registry endpoints.
//!
//! Registration, updates and deletion require the Agent role. Lookups and
//! verification reports are public.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::parse_address;
use crate::{
    auth::Signed,
    error::ApiError,
    state::AppState,
    suite::Registration,
    types::{Address, IdentityRecord, Jurisdiction},
    verification::TopicStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterIdentityRequest {
    #[schema(value_type = String)]
    pub wallet: Address,
    #[schema(value_type = String)]
    pub identity: Address,
    /// ISO-3166 numeric country code.
    pub country: Jurisdiction,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchRegisterRequest {
    pub entries: Vec<RegisterIdentityRequest>,
}

/// Outcome of one batch entry. Entries succeed or fail independently.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchEntryResult {
    #[schema(value_type = String)]
    pub wallet: Address,
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchRegisterResponse {
    pub results: Vec<BatchEntryResult>,
    pub registered: usize,
    pub failed: usize,
}

/// Registry view of a wallet. Unbound wallets resolve to the zero identity
/// and country `0`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    #[schema(value_type = String)]
    pub wallet: Address,
    pub registered: bool,
    #[schema(value_type = String)]
    pub identity: Address,
    pub country: Jurisdiction,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateIdentityRequest {
    #[schema(value_type = String)]
    pub identity: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCountryRequest {
    pub country: Jurisdiction,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerificationResponse {
    #[schema(value_type = String)]
    pub wallet: Address,
    #[schema(value_type = String)]
    pub identity: Address,
    pub verified: bool,
    /// One entry per required claim topic.
    pub topics: Vec<TopicStatus>,
}

/// Bind a wallet to an identity.
#[utoipa::path(
    post,
    path = "/v1/registry",
    tag = "Registry",
    security(("signed_request" = [])),
    request_body = RegisterIdentityRequest,
    responses(
        (status = 201, description = "Wallet registered", body = IdentityRecord),
        (status = 401, description = "Missing or invalid signature"),
        (status = 403, description = "Caller is not an agent"),
        (status = 404, description = "Identity does not exist"),
        (status = 409, description = "Wallet already registered")
    )
)]
pub async fn register_identity(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<RegisterIdentityRequest>,
) -> Result<(StatusCode, Json<IdentityRecord>), ApiError> {
    let mut suite = state.suite.write().await;
    suite.register_identity(principal, body.wallet, body.identity, body.country)?;
    let record = suite
        .record(&body.wallet)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Registration not found"))?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Register several wallets under one signature.
///
/// Always returns 200 once authenticated; inspect each entry's outcome.
#[utoipa::path(
    post,
    path = "/v1/registry/batch",
    tag = "Registry",
    security(("signed_request" = [])),
    request_body = BatchRegisterRequest,
    responses(
        (status = 200, description = "Per-entry outcomes", body = BatchRegisterResponse),
        (status = 401, description = "Missing or invalid signature")
    )
)]
pub async fn batch_register_identity(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<BatchRegisterRequest>,
) -> Result<Json<BatchRegisterResponse>, ApiError> {
    let entries: Vec<Registration> = body
        .entries
        .iter()
        .map(|e| Registration {
            wallet: e.wallet,
            identity: e.identity,
            jurisdiction: e.country,
        })
        .collect();

    let outcomes = state
        .suite
        .write()
        .await
        .batch_register_identity(principal, &entries);

    let results: Vec<BatchEntryResult> = entries
        .iter()
        .zip(outcomes)
        .map(|(entry, outcome)| match outcome {
            Ok(()) => BatchEntryResult {
                wallet: entry.wallet,
                registered: true,
                error: None,
                error_code: None,
            },
            Err(e) => BatchEntryResult {
                wallet: entry.wallet,
                registered: false,
                error: Some(e.to_string()),
                error_code: Some(e.error_code().to_string()),
            },
        })
        .collect();

    let registered = results.iter().filter(|r| r.registered).count();
    Ok(Json(BatchRegisterResponse {
        failed: results.len() - registered,
        registered,
        results,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/registry/{wallet}",
    tag = "Registry",
    params(("wallet" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Registry view of the wallet", body = RegistrationResponse),
        (status = 400, description = "Malformed address")
    )
)]
pub async fn get_registration(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let wallet = parse_address(&wallet)?;
    let suite = state.suite.read().await;
    let record = suite.record(&wallet);
    Ok(Json(RegistrationResponse {
        wallet,
        registered: record.is_some(),
        identity: suite.identity(&wallet),
        country: suite.investor_country(&wallet),
        verified: suite.is_verified(&wallet),
        registered_at: record.map(|r| r.registered_at),
    }))
}

#[utoipa::path(
    delete,
    path = "/v1/registry/{wallet}",
    tag = "Registry",
    security(("signed_request" = [])),
    params(("wallet" = String, Path, description = "Wallet address")),
    responses(
        (status = 204, description = "Binding removed"),
        (status = 403, description = "Caller is not an agent"),
        (status = 404, description = "Wallet not registered")
    )
)]
pub async fn delete_identity(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Signed { principal, .. }: Signed<()>,
) -> Result<StatusCode, ApiError> {
    let wallet = parse_address(&wallet)?;
    state.suite.write().await.delete_identity(principal, wallet)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Point a registered wallet at another identity.
#[utoipa::path(
    put,
    path = "/v1/registry/{wallet}/identity",
    tag = "Registry",
    security(("signed_request" = [])),
    params(("wallet" = String, Path, description = "Wallet address")),
    request_body = UpdateIdentityRequest,
    responses(
        (status = 200, description = "Binding updated", body = IdentityRecord),
        (status = 403, description = "Caller is not an agent"),
        (status = 404, description = "Wallet not registered or identity missing")
    )
)]
pub async fn update_identity(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Signed { principal, body }: Signed<UpdateIdentityRequest>,
) -> Result<Json<IdentityRecord>, ApiError> {
    let wallet = parse_address(&wallet)?;
    let mut suite = state.suite.write().await;
    suite.update_identity(principal, wallet, body.identity)?;
    current_record(&suite, &wallet)
}

#[utoipa::path(
    put,
    path = "/v1/registry/{wallet}/country",
    tag = "Registry",
    security(("signed_request" = [])),
    params(("wallet" = String, Path, description = "Wallet address")),
    request_body = UpdateCountryRequest,
    responses(
        (status = 200, description = "Country updated", body = IdentityRecord),
        (status = 403, description = "Caller is not an agent"),
        (status = 404, description = "Wallet not registered")
    )
)]
pub async fn update_country(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Signed { principal, body }: Signed<UpdateCountryRequest>,
) -> Result<Json<IdentityRecord>, ApiError> {
    let wallet = parse_address(&wallet)?;
    let mut suite = state.suite.write().await;
    suite.update_country(principal, wallet, body.country)?;
    current_record(&suite, &wallet)
}

fn current_record(
    suite: &crate::suite::ComplianceSuite,
    wallet: &Address,
) -> Result<Json<IdentityRecord>, ApiError> {
    suite
        .record(wallet)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Registration not found"))
}

/// Per-topic breakdown of why a wallet is or is not verified.
#[utoipa::path(
    get,
    path = "/v1/registry/{wallet}/verification",
    tag = "Registry",
    params(("wallet" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Verification report", body = VerificationResponse),
        (status = 404, description = "Wallet not registered")
    )
)]
pub async fn get_verification(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let wallet = parse_address(&wallet)?;
    let suite = state.suite.read().await;
    let topics = suite
        .verification_report(&wallet)
        .ok_or_else(|| ApiError::not_found(format!("Wallet {wallet} is not registered")))?;
    Ok(Json(VerificationResponse {
        wallet,
        identity: suite.identity(&wallet),
        verified: suite.is_verified(&wallet),
        topics,
    }))
}
