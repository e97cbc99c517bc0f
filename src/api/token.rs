// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token ledger endpoints.
//!
//! Mint, burn, pause and unpause require the Agent role. Transfers move the
//! caller's own balance. Mints and transfers pass the compliance gate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::parse_address;
use crate::{
    auth::Signed,
    compliance::{Operation, Verdict},
    error::ApiError,
    state::AppState,
    suite::ComplianceSuite,
    types::{Address, Amount},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: Amount,
    pub paused: bool,
    /// Compliance policies installed on top of identity verification.
    pub policies: Vec<String>,
}

impl From<&ComplianceSuite> for TokenInfo {
    fn from(suite: &ComplianceSuite) -> Self {
        let metadata = suite.metadata();
        Self {
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            decimals: metadata.decimals,
            total_supply: suite.total_supply(),
            paused: suite.paused(),
            policies: suite.gate().policy_names(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String)]
    pub address: Address,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MintRequest {
    #[schema(value_type = String)]
    pub to: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BurnRequest {
    #[schema(value_type = String)]
    pub from: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(value_type = String)]
    pub to: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    #[schema(value_type = String)]
    pub from: Address,
    #[schema(value_type = String)]
    pub to: Address,
    pub amount: Amount,
    pub from_balance: Amount,
    pub to_balance: Amount,
}

/// Dry-run parameters. Without `from` the operation is a mint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ComplianceQuery {
    pub from: Option<String>,
    pub to: String,
    /// Decimal token amount.
    pub amount: String,
}

#[utoipa::path(
    get,
    path = "/v1/token",
    tag = "Token",
    responses((status = 200, description = "Token metadata and supply", body = TokenInfo))
)]
pub async fn get_token(State(state): State<AppState>) -> Json<TokenInfo> {
    Json(TokenInfo::from(&*state.suite.read().await))
}

#[utoipa::path(
    get,
    path = "/v1/token/balances/{address}",
    tag = "Token",
    params(("address" = String, Path, description = "Holder address")),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 400, description = "Malformed address")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let address = parse_address(&address)?;
    let balance = state.suite.read().await.balance_of(&address);
    Ok(Json(BalanceResponse { address, balance }))
}

/// Evaluate the compliance gate without moving tokens.
///
/// Balance is not checked here; only pause state, verification and policies.
#[utoipa::path(
    get,
    path = "/v1/token/compliance",
    tag = "Token",
    params(ComplianceQuery),
    responses(
        (status = 200, description = "Gate decision", body = Verdict),
        (status = 400, description = "Malformed parameters")
    )
)]
pub async fn check_compliance(
    State(state): State<AppState>,
    Query(query): Query<ComplianceQuery>,
) -> Result<Json<Verdict>, ApiError> {
    let to = parse_address(&query.to)?;
    let amount: Amount = query
        .amount
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid amount: {}", query.amount)))?;
    let operation = match query.from.as_deref().map(parse_address).transpose()? {
        Some(from) => Operation::Transfer {
            from,
            to,
            amount,
        },
        None => Operation::Mint { to, amount },
    };
    Ok(Json(state.suite.read().await.evaluate(&operation)))
}

#[utoipa::path(
    post,
    path = "/v1/token/mint",
    tag = "Token",
    security(("signed_request" = [])),
    request_body = MintRequest,
    responses(
        (status = 200, description = "Minted; receiver balance", body = BalanceResponse),
        (status = 400, description = "Zero amount"),
        (status = 403, description = "Caller is not an agent"),
        (status = 422, description = "Rejected by compliance or supply overflow")
    )
)]
pub async fn mint(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<MintRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let mut suite = state.suite.write().await;
    suite.mint(principal, body.to, body.amount)?;
    Ok(Json(BalanceResponse {
        address: body.to,
        balance: suite.balance_of(&body.to),
    }))
}

/// Destroy tokens held by `from`. Not compliance gated.
#[utoipa::path(
    post,
    path = "/v1/token/burn",
    tag = "Token",
    security(("signed_request" = [])),
    request_body = BurnRequest,
    responses(
        (status = 200, description = "Burned; remaining balance", body = BalanceResponse),
        (status = 403, description = "Caller is not an agent"),
        (status = 422, description = "Insufficient balance")
    )
)]
pub async fn burn(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<BurnRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let mut suite = state.suite.write().await;
    suite.burn(principal, body.from, body.amount)?;
    Ok(Json(BalanceResponse {
        address: body.from,
        balance: suite.balance_of(&body.from),
    }))
}

/// Transfer from the signing principal to `to`.
#[utoipa::path(
    post,
    path = "/v1/token/transfer",
    tag = "Token",
    security(("signed_request" = [])),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transferred", body = TransferResponse),
        (status = 400, description = "Zero amount"),
        (status = 422, description = "Paused, insufficient balance or rejected by compliance")
    )
)]
pub async fn transfer(
    State(state): State<AppState>,
    Signed { principal, body }: Signed<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let mut suite = state.suite.write().await;
    suite.transfer(principal, body.to, body.amount)?;
    Ok(Json(TransferResponse {
        from: principal,
        to: body.to,
        amount: body.amount,
        from_balance: suite.balance_of(&principal),
        to_balance: suite.balance_of(&body.to),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/token/pause",
    tag = "Token",
    security(("signed_request" = [])),
    responses(
        (status = 200, description = "Paused", body = TokenInfo),
        (status = 400, description = "Already paused"),
        (status = 403, description = "Caller is not an agent")
    )
)]
pub async fn pause(
    State(state): State<AppState>,
    Signed { principal, .. }: Signed<()>,
) -> Result<Json<TokenInfo>, ApiError> {
    let mut suite = state.suite.write().await;
    suite.pause(principal)?;
    Ok(Json(TokenInfo::from(&*suite)))
}

#[utoipa::path(
    post,
    path = "/v1/token/unpause",
    tag = "Token",
    security(("signed_request" = [])),
    responses(
        (status = 200, description = "Unpaused", body = TokenInfo),
        (status = 400, description = "Not paused"),
        (status = 403, description = "Caller is not an agent")
    )
)]
pub async fn unpause(
    State(state): State<AppState>,
    Signed { principal, .. }: Signed<()>,
) -> Result<Json<TokenInfo>, ApiError> {
    let mut suite = state.suite.write().await;
    suite.unpause(principal)?;
    Ok(Json(TokenInfo::from(&*suite)))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{send, test_app};
    use crate::identity::{ClaimSigner, LocalClaimSigner};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn pause_toggles_and_rejects_repeats() {
        let owner = LocalClaimSigner::random();
        let app = test_app(&owner);

        let (_, body) = send(&app, None, Method::GET, "/v1/token", None).await;
        assert_eq!(body["paused"], true);
        assert_eq!(body["total_supply"], 0);

        let (status, body) = send(&app, Some(&owner), Method::POST, "/v1/token/pause", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_argument");

        let (status, body) =
            send(&app, Some(&owner), Method::POST, "/v1/token/unpause", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paused"], false);

        let stranger = LocalClaimSigner::random();
        let (status, _) = send(&app, Some(&stranger), Method::POST, "/v1/token/pause", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn mint_to_unregistered_wallet_is_rejected() {
        let owner = LocalClaimSigner::random();
        let app = test_app(&owner);
        let wallet = LocalClaimSigner::random().address();
        send(&app, Some(&owner), Method::POST, "/v1/token/unpause", None).await;

        let (status, body) = send(&app, None, Method::GET,
            &format!("/v1/token/compliance?to={wallet}&amount=5"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"], "rejected");

        let (status, body) = send(&app, Some(&owner), Method::POST, "/v1/token/mint",
            Some(json!({ "to": wallet, "amount": 5 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "compliance_error");

        let (_, body) =
            send(&app, None, Method::GET, &format!("/v1/token/balances/{wallet}"), None).await;
        assert_eq!(body["balance"], 0);
    }

    #[tokio::test]
    async fn burn_is_not_gated() {
        let owner = LocalClaimSigner::random();
        let app = test_app(&owner);
        let (_, body) = send(&app, Some(&owner), Method::POST, "/v1/identities", None).await;
        let identity = body["identity"].as_str().unwrap().to_string();
        let wallet = LocalClaimSigner::random().address();
        send(&app, Some(&owner), Method::POST, "/v1/registry",
            Some(json!({ "wallet": wallet, "identity": identity, "country": 840 }))).await;
        send(&app, Some(&owner), Method::POST, "/v1/token/unpause", None).await;

        let (status, _) = send(&app, Some(&owner), Method::POST, "/v1/token/mint",
            Some(json!({ "to": wallet, "amount": 10 }))).await;
        assert_eq!(status, StatusCode::OK);

        // Unregistering the holder does not block recovery by burn.
        send(&app, Some(&owner), Method::DELETE, &format!("/v1/registry/{wallet}"), None).await;
        let (status, body) = send(&app, Some(&owner), Method::POST, "/v1/token/burn",
            Some(json!({ "from": wallet, "amount": 4 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 6);

        let (_, body) = send(&app, None, Method::GET, "/v1/token", None).await;
        assert_eq!(body["total_supply"], 6);
    }
}
