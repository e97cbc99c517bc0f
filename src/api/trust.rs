// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trust configuration endpoints.
//!
//! Required claim topics, trusted issuers and the suite's agents. Every
//! mutation here requires the suite Owner role.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{parse_address, parse_topic};
use crate::{
    auth::Signed,
    error::ApiError,
    state::AppState,
    types::{Address, ClaimTopic},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimTopicRequest {
    #[schema(value_type = String)]
    pub topic: ClaimTopic,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimTopicsResponse {
    #[schema(value_type = Vec<String>)]
    pub topics: Vec<ClaimTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrustedIssuerRequest {
    #[schema(value_type = String)]
    pub issuer: Address,
    #[schema(value_type = Vec<String>)]
    pub topics: Vec<ClaimTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateIssuerTopicsRequest {
    #[schema(value_type = Vec<String>)]
    pub topics: Vec<ClaimTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrustedIssuerResponse {
    #[schema(value_type = String)]
    pub issuer: Address,
    #[schema(value_type = Vec<String>)]
    pub topics: Vec<ClaimTopic>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IssuerQuery {
    /// Only list issuers trusted for this topic.
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RolesResponse {
    #[schema(value_type = Vec<String>)]
    pub owners: Vec<Address>,
    #[schema(value_type = Vec<String>)]
    pub agents: Vec<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentRequest {
    #[schema(value_type = String)]
    pub agent: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferOwnershipRequest {
    #[schema(value_type = String)]
    pub new_owner: Address,
}

// =============================================================================
// Claim topics
// =============================================================================

#[utoipa::path(
    get,
    path = "/v1/claim-topics",
    tag = "Trust",
    responses((status = 200, description = "Required claim topics", body = ClaimTopicsResponse))
)]
pub async fn list_claim_topics(State(state): State<AppState>) -> Json<ClaimTopicsResponse> {
    let topics = state.suite.read().await.claim_topics();
    Json(ClaimTopicsResponse { topics })
}

#[utoipa::path(
    post,
    path = "/v1/claim-topics",
    tag = "Trust",
    security(("signed_request" = [])),
    request_body = ClaimTopicRequest,
    responses(
        (status = 201, description = "Topic is now required", body = ClaimTopicsResponse),
        (status = 403, description = "Caller is not the owner"),
        (status = 409, description = "Topic already required"),
        (status = 422, description = "Topic limit reached")
    )
)]
pub async fn add_claim_topic(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<ClaimTopicRequest>,
) -> Result<(StatusCode, Json<ClaimTopicsResponse>), ApiError> {
    let mut suite = state.suite.write().await;
    suite.add_claim_topic(principal, body.topic)?;
    Ok((
        StatusCode::CREATED,
        Json(ClaimTopicsResponse {
            topics: suite.claim_topics(),
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/v1/claim-topics/{topic}",
    tag = "Trust",
    security(("signed_request" = [])),
    params(("topic" = String, Path, description = "Topic (`0x` hex or decimal)")),
    responses(
        (status = 204, description = "Topic no longer required"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Topic not required")
    )
)]
pub async fn remove_claim_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Signed { principal, .. }: Signed<()>,
) -> Result<StatusCode, ApiError> {
    let topic = parse_topic(&topic)?;
    state
        .suite
        .write()
        .await
        .remove_claim_topic(principal, topic)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Trusted issuers
// =============================================================================

#[utoipa::path(
    get,
    path = "/v1/trusted-issuers",
    tag = "Trust",
    params(IssuerQuery),
    responses((status = 200, description = "Trusted issuers", body = Vec<TrustedIssuerResponse>))
)]
pub async fn list_trusted_issuers(
    State(state): State<AppState>,
    Query(query): Query<IssuerQuery>,
) -> Result<Json<Vec<TrustedIssuerResponse>>, ApiError> {
    let topic = query.topic.as_deref().map(parse_topic).transpose()?;
    let suite = state.suite.read().await;
    let registry = suite.trusted_issuers();
    let issuers = match topic {
        Some(topic) => registry.issuers_for_topic(topic),
        None => registry.issuers(),
    };
    let issuers = issuers
        .into_iter()
        .map(|issuer| TrustedIssuerResponse {
            issuer,
            topics: registry.issuer_topics(&issuer).unwrap_or_default(),
        })
        .collect();
    Ok(Json(issuers))
}

#[utoipa::path(
    post,
    path = "/v1/trusted-issuers",
    tag = "Trust",
    security(("signed_request" = [])),
    request_body = TrustedIssuerRequest,
    responses(
        (status = 201, description = "Issuer trusted", body = TrustedIssuerResponse),
        (status = 400, description = "Empty or oversized topic list"),
        (status = 403, description = "Caller is not the owner"),
        (status = 409, description = "Issuer already trusted")
    )
)]
pub async fn add_trusted_issuer(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<TrustedIssuerRequest>,
) -> Result<(StatusCode, Json<TrustedIssuerResponse>), ApiError> {
    let mut suite = state.suite.write().await;
    suite.add_trusted_issuer(principal, body.issuer, &body.topics)?;
    let response = issuer_response(&suite, body.issuer)?;
    Ok((StatusCode::CREATED, response))
}

#[utoipa::path(
    get,
    path = "/v1/trusted-issuers/{issuer}",
    tag = "Trust",
    params(("issuer" = String, Path, description = "Issuer identity address")),
    responses(
        (status = 200, description = "Trusted issuer", body = TrustedIssuerResponse),
        (status = 404, description = "Issuer not trusted")
    )
)]
pub async fn get_trusted_issuer(
    State(state): State<AppState>,
    Path(issuer): Path<String>,
) -> Result<Json<TrustedIssuerResponse>, ApiError> {
    let issuer = parse_address(&issuer)?;
    let suite = state.suite.read().await;
    issuer_response(&suite, issuer)
}

/// Replace the topics an issuer is trusted for.
#[utoipa::path(
    put,
    path = "/v1/trusted-issuers/{issuer}",
    tag = "Trust",
    security(("signed_request" = [])),
    params(("issuer" = String, Path, description = "Issuer identity address")),
    request_body = UpdateIssuerTopicsRequest,
    responses(
        (status = 200, description = "Topics replaced", body = TrustedIssuerResponse),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Issuer not trusted")
    )
)]
pub async fn update_trusted_issuer(
    State(state): State<AppState>,
    Path(issuer): Path<String>,
    Signed { principal, body }: Signed<UpdateIssuerTopicsRequest>,
) -> Result<Json<TrustedIssuerResponse>, ApiError> {
    let issuer = parse_address(&issuer)?;
    let mut suite = state.suite.write().await;
    suite.update_issuer_claim_topics(principal, issuer, &body.topics)?;
    issuer_response(&suite, issuer)
}

#[utoipa::path(
    delete,
    path = "/v1/trusted-issuers/{issuer}",
    tag = "Trust",
    security(("signed_request" = [])),
    params(("issuer" = String, Path, description = "Issuer identity address")),
    responses(
        (status = 204, description = "Issuer no longer trusted"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Issuer not trusted")
    )
)]
pub async fn remove_trusted_issuer(
    State(state): State<AppState>,
    Path(issuer): Path<String>,
    Signed { principal, .. }: Signed<()>,
) -> Result<StatusCode, ApiError> {
    let issuer = parse_address(&issuer)?;
    state
        .suite
        .write()
        .await
        .remove_trusted_issuer(principal, issuer)?;
    Ok(StatusCode::NO_CONTENT)
}

fn issuer_response(
    suite: &crate::suite::ComplianceSuite,
    issuer: Address,
) -> Result<Json<TrustedIssuerResponse>, ApiError> {
    let topics = suite
        .trusted_issuers()
        .issuer_topics(&issuer)
        .ok_or_else(|| ApiError::not_found(format!("Issuer {issuer} is not trusted")))?;
    Ok(Json(TrustedIssuerResponse { issuer, topics }))
}

// =============================================================================
// Suite roles
// =============================================================================

#[utoipa::path(
    get,
    path = "/v1/agents",
    tag = "Trust",
    responses((status = 200, description = "Suite owners and agents", body = RolesResponse))
)]
pub async fn list_roles(State(state): State<AppState>) -> Json<RolesResponse> {
    let suite = state.suite.read().await;
    Json(RolesResponse {
        owners: suite.owners(),
        agents: suite.agents(),
    })
}

#[utoipa::path(
    post,
    path = "/v1/agents",
    tag = "Trust",
    security(("signed_request" = [])),
    request_body = AgentRequest,
    responses(
        (status = 201, description = "Agent added", body = RolesResponse),
        (status = 400, description = "Already an agent"),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn add_agent(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<AgentRequest>,
) -> Result<(StatusCode, Json<RolesResponse>), ApiError> {
    let mut suite = state.suite.write().await;
    suite.add_agent(principal, body.agent)?;
    Ok((
        StatusCode::CREATED,
        Json(RolesResponse {
            owners: suite.owners(),
            agents: suite.agents(),
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/v1/agents/{agent}",
    tag = "Trust",
    security(("signed_request" = [])),
    params(("agent" = String, Path, description = "Agent address")),
    responses(
        (status = 204, description = "Agent removed"),
        (status = 400, description = "Not an agent"),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn remove_agent(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Signed { principal, .. }: Signed<()>,
) -> Result<StatusCode, ApiError> {
    let agent = parse_address(&agent)?;
    state.suite.write().await.remove_agent(principal, agent)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hand the Owner role to another principal. The caller loses it.
#[utoipa::path(
    put,
    path = "/v1/owner",
    tag = "Trust",
    security(("signed_request" = [])),
    request_body = TransferOwnershipRequest,
    responses(
        (status = 200, description = "Ownership transferred", body = RolesResponse),
        (status = 403, description = "Caller is not the owner")
    )
)]
pub async fn transfer_ownership(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<TransferOwnershipRequest>,
) -> Result<Json<RolesResponse>, ApiError> {
    let mut suite = state.suite.write().await;
    suite.transfer_ownership(principal, body.new_owner)?;
    Ok(Json(RolesResponse {
        owners: suite.owners(),
        agents: suite.agents(),
    }))
}
