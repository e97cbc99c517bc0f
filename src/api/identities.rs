// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity endpoints: creation, management keys and claims.
//!
//! Key and claim changes require the caller to hold the `owner` key role on
//! the identity itself; suite roles play no part here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{parse_address, parse_claim_id, parse_role, parse_topic};
use crate::{
    auth::{Role, Signed},
    error::ApiError,
    identity::Identity,
    state::AppState,
    types::{Address, Claim, ClaimId},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateIdentityRequest {
    /// Initial management key. Defaults to the caller.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub manager: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateIdentityResponse {
    #[schema(value_type = String)]
    pub identity: Address,
    #[schema(value_type = String)]
    pub manager: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyEntry {
    #[schema(value_type = String)]
    pub key: Address,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimEntry {
    #[schema(value_type = String)]
    pub id: ClaimId,
    pub claim: Claim,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    #[schema(value_type = String)]
    pub address: Address,
    pub keys: Vec<KeyEntry>,
    pub claims: Vec<ClaimEntry>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            address: identity.address,
            keys: identity
                .keys
                .iter()
                .map(|(key, roles)| KeyEntry {
                    key: *key,
                    roles: roles.iter().copied().collect(),
                })
                .collect(),
            claims: identity
                .claims
                .iter()
                .map(|(id, claim)| ClaimEntry {
                    id: *id,
                    claim: claim.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyRequest {
    #[schema(value_type = String)]
    pub key: Address,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddClaimResponse {
    #[schema(value_type = String)]
    pub claim_id: ClaimId,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClaimQuery {
    /// Only list claims for this topic (`0x` hex or decimal).
    pub topic: Option<String>,
}

/// Create an identity.
///
/// Open to any signed caller. The body may be omitted, in which case the
/// caller becomes the management key.
#[utoipa::path(
    post,
    path = "/v1/identities",
    tag = "Identities",
    security(("signed_request" = [])),
    request_body = CreateIdentityRequest,
    responses(
        (status = 201, description = "Identity created", body = CreateIdentityResponse),
        (status = 400, description = "Invalid manager"),
        (status = 401, description = "Missing or invalid signature")
    )
)]
pub async fn create_identity(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<Option<CreateIdentityRequest>>,
) -> Result<(StatusCode, Json<CreateIdentityResponse>), ApiError> {
    let manager = body.and_then(|b| b.manager).unwrap_or(principal);
    let identity = state
        .suite
        .write()
        .await
        .create_identity(principal, manager)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateIdentityResponse { identity, manager }),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/identities/{identity}",
    tag = "Identities",
    params(("identity" = String, Path, description = "Identity address")),
    responses(
        (status = 200, description = "Identity keys and claims", body = IdentityResponse),
        (status = 404, description = "Identity not found")
    )
)]
pub async fn get_identity(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let identity = parse_address(&identity)?;
    let suite = state.suite.read().await;
    suite
        .identity_object(&identity)
        .map(|i| Json(IdentityResponse::from(i)))
        .ok_or_else(|| ApiError::not_found(format!("Identity {identity} not found")))
}

#[utoipa::path(
    get,
    path = "/v1/identities/{identity}/claims",
    tag = "Identities",
    params(
        ("identity" = String, Path, description = "Identity address"),
        ClaimQuery
    ),
    responses(
        (status = 200, description = "Claims held by the identity", body = Vec<ClaimEntry>),
        (status = 404, description = "Identity not found")
    )
)]
pub async fn list_claims(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    Query(query): Query<ClaimQuery>,
) -> Result<Json<Vec<ClaimEntry>>, ApiError> {
    let identity = parse_address(&identity)?;
    let topic = query.topic.as_deref().map(parse_topic).transpose()?;
    let suite = state.suite.read().await;
    let subject = suite
        .identity_object(&identity)
        .ok_or_else(|| ApiError::not_found(format!("Identity {identity} not found")))?;

    let ids: Vec<ClaimId> = match topic {
        Some(topic) => suite.claim_ids_by_topic(&identity, topic),
        None => subject.claims.keys().copied().collect(),
    };
    let claims = ids
        .into_iter()
        .filter_map(|id| {
            subject.claim(&id).map(|claim| ClaimEntry {
                id,
                claim: claim.clone(),
            })
        })
        .collect();
    Ok(Json(claims))
}

/// Attach a claim.
///
/// The signature must come from a `claim_signer` key of the issuer identity.
/// A claim with the same issuer and topic is replaced.
#[utoipa::path(
    post,
    path = "/v1/identities/{identity}/claims",
    tag = "Identities",
    security(("signed_request" = [])),
    params(("identity" = String, Path, description = "Identity address")),
    request_body = Claim,
    responses(
        (status = 201, description = "Claim stored", body = AddClaimResponse),
        (status = 403, description = "Caller is not an owner key of the identity"),
        (status = 404, description = "Identity not found"),
        (status = 422, description = "Claim signature does not validate")
    )
)]
pub async fn add_claim(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    Signed { principal, body }: Signed<Claim>,
) -> Result<(StatusCode, Json<AddClaimResponse>), ApiError> {
    let identity = parse_address(&identity)?;
    let claim_id = state
        .suite
        .write()
        .await
        .add_claim(principal, identity, body)?;
    Ok((StatusCode::CREATED, Json(AddClaimResponse { claim_id })))
}

#[utoipa::path(
    get,
    path = "/v1/identities/{identity}/claims/{claim_id}",
    tag = "Identities",
    params(
        ("identity" = String, Path, description = "Identity address"),
        ("claim_id" = String, Path, description = "Claim id (32 byte hex)")
    ),
    responses(
        (status = 200, description = "Claim", body = ClaimEntry),
        (status = 404, description = "Claim not found")
    )
)]
pub async fn get_claim(
    State(state): State<AppState>,
    Path((identity, claim_id)): Path<(String, String)>,
) -> Result<Json<ClaimEntry>, ApiError> {
    let identity = parse_address(&identity)?;
    let claim_id = parse_claim_id(&claim_id)?;
    let suite = state.suite.read().await;
    suite
        .claim(&identity, &claim_id)
        .map(|claim| {
            Json(ClaimEntry {
                id: claim_id,
                claim: claim.clone(),
            })
        })
        .ok_or_else(|| ApiError::not_found(format!("Claim {claim_id} not found")))
}

/// Remove a claim. This is the only way a claim stops counting.
#[utoipa::path(
    delete,
    path = "/v1/identities/{identity}/claims/{claim_id}",
    tag = "Identities",
    security(("signed_request" = [])),
    params(
        ("identity" = String, Path, description = "Identity address"),
        ("claim_id" = String, Path, description = "Claim id (32 byte hex)")
    ),
    responses(
        (status = 204, description = "Claim removed"),
        (status = 403, description = "Caller is not an owner key of the identity"),
        (status = 404, description = "Identity or claim not found")
    )
)]
pub async fn remove_claim(
    State(state): State<AppState>,
    Path((identity, claim_id)): Path<(String, String)>,
    Signed { principal, .. }: Signed<()>,
) -> Result<StatusCode, ApiError> {
    let identity = parse_address(&identity)?;
    let claim_id = parse_claim_id(&claim_id)?;
    state
        .suite
        .write()
        .await
        .remove_claim(principal, identity, claim_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/identities/{identity}/keys",
    tag = "Identities",
    security(("signed_request" = [])),
    params(("identity" = String, Path, description = "Identity address")),
    request_body = KeyRequest,
    responses(
        (status = 204, description = "Key granted"),
        (status = 400, description = "Key already holds the role"),
        (status = 403, description = "Caller is not an owner key of the identity"),
        (status = 404, description = "Identity not found")
    )
)]
pub async fn add_key(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    Signed { principal, body }: Signed<KeyRequest>,
) -> Result<StatusCode, ApiError> {
    let identity = parse_address(&identity)?;
    state
        .suite
        .write()
        .await
        .add_key(principal, identity, body.key, body.role)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/identities/{identity}/keys/{key}/{role}",
    tag = "Identities",
    security(("signed_request" = [])),
    params(
        ("identity" = String, Path, description = "Identity address"),
        ("key" = String, Path, description = "Key address"),
        ("role" = String, Path, description = "owner, agent or claim_signer")
    ),
    responses(
        (status = 204, description = "Key role revoked"),
        (status = 400, description = "Key lacks the role, or it is the last owner"),
        (status = 403, description = "Caller is not an owner key of the identity"),
        (status = 404, description = "Identity not found")
    )
)]
pub async fn remove_key(
    State(state): State<AppState>,
    Path((identity, key, role)): Path<(String, String, String)>,
    Signed { principal, .. }: Signed<()>,
) -> Result<StatusCode, ApiError> {
    let identity = parse_address(&identity)?;
    let key = parse_address(&key)?;
    let role = parse_role(&role)?;
    state
        .suite
        .write()
        .await
        .remove_key(principal, identity, key, role)?;
    Ok(StatusCode::NO_CONTENT)
}
