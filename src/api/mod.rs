// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP boundary.
//!
//! Mutating routes take a [`Signed`](crate::auth::Signed) body and hand the
//! recovered principal to the suite as the caller. GET routes are public.

use std::str::FromStr;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Role,
    compliance::Verdict,
    error::ApiError,
    ledger::TokenMetadata,
    state::AppState,
    types::{Address, Claim, ClaimId, ClaimTopic, IdentityRecord},
    verification::TopicStatus,
};

pub mod health;
pub mod identities;
pub mod registry;
pub mod token;
pub mod trust;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        // Identity registry
        .route("/registry", post(registry::register_identity))
        .route("/registry/batch", post(registry::batch_register_identity))
        .route(
            "/registry/{wallet}",
            get(registry::get_registration).delete(registry::delete_identity),
        )
        .route("/registry/{wallet}/identity", put(registry::update_identity))
        .route("/registry/{wallet}/country", put(registry::update_country))
        .route(
            "/registry/{wallet}/verification",
            get(registry::get_verification),
        )
        // Identities and claims
        .route("/identities", post(identities::create_identity))
        .route("/identities/{identity}", get(identities::get_identity))
        .route(
            "/identities/{identity}/claims",
            get(identities::list_claims).post(identities::add_claim),
        )
        .route(
            "/identities/{identity}/claims/{claim_id}",
            get(identities::get_claim).delete(identities::remove_claim),
        )
        .route("/identities/{identity}/keys", post(identities::add_key))
        .route(
            "/identities/{identity}/keys/{key}/{role}",
            delete(identities::remove_key),
        )
        // Trust configuration
        .route(
            "/claim-topics",
            get(trust::list_claim_topics).post(trust::add_claim_topic),
        )
        .route("/claim-topics/{topic}", delete(trust::remove_claim_topic))
        .route(
            "/trusted-issuers",
            get(trust::list_trusted_issuers).post(trust::add_trusted_issuer),
        )
        .route(
            "/trusted-issuers/{issuer}",
            get(trust::get_trusted_issuer)
                .put(trust::update_trusted_issuer)
                .delete(trust::remove_trusted_issuer),
        )
        .route("/agents", get(trust::list_roles).post(trust::add_agent))
        .route("/agents/{agent}", delete(trust::remove_agent))
        .route("/owner", put(trust::transfer_ownership))
        // Token ledger
        .route("/token", get(token::get_token))
        .route("/token/balances/{address}", get(token::get_balance))
        .route("/token/compliance", get(token::check_compliance))
        .route("/token/mint", post(token::mint))
        .route("/token/burn", post(token::burn))
        .route("/token/transfer", post(token::transfer))
        .route("/token/pause", post(token::pause))
        .route("/token/unpause", post(token::unpause))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// =============================================================================
// Path parameter parsing
// =============================================================================

pub(crate) fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::from_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid address: {raw}")))
}

/// Accepts `0x` hex or decimal.
pub(crate) fn parse_topic(raw: &str) -> Result<ClaimTopic, ApiError> {
    ClaimTopic::from_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid claim topic: {raw}")))
}

pub(crate) fn parse_claim_id(raw: &str) -> Result<ClaimId, ApiError> {
    ClaimId::from_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid claim id: {raw}")))
}

pub(crate) fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::from_str(raw).ok_or_else(|| ApiError::bad_request(format!("Unknown role: {raw}")))
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Compliance Ledger API",
        description = "Identity registry, claim verification and compliance-gated token ledger.\n\n\
            Mutating routes require `X-Principal`, `X-Timestamp` and `X-Signature` headers: an \
            EIP-191 signature over `METHOD\\nPATH\\nTIMESTAMP\\nkeccak256(body)`."
    ),
    paths(
        health::health,
        health::liveness,
        registry::register_identity,
        registry::batch_register_identity,
        registry::get_registration,
        registry::delete_identity,
        registry::update_identity,
        registry::update_country,
        registry::get_verification,
        identities::create_identity,
        identities::get_identity,
        identities::list_claims,
        identities::add_claim,
        identities::get_claim,
        identities::remove_claim,
        identities::add_key,
        identities::remove_key,
        trust::list_claim_topics,
        trust::add_claim_topic,
        trust::remove_claim_topic,
        trust::list_trusted_issuers,
        trust::add_trusted_issuer,
        trust::get_trusted_issuer,
        trust::update_trusted_issuer,
        trust::remove_trusted_issuer,
        trust::list_roles,
        trust::add_agent,
        trust::remove_agent,
        trust::transfer_ownership,
        token::get_token,
        token::get_balance,
        token::check_compliance,
        token::mint,
        token::burn,
        token::transfer,
        token::pause,
        token::unpause
    ),
    components(
        schemas(
            Claim,
            IdentityRecord,
            Role,
            TopicStatus,
            TokenMetadata,
            Verdict,
            health::HealthResponse,
            health::SuiteSummary,
            health::LivenessResponse,
            registry::RegisterIdentityRequest,
            registry::BatchRegisterRequest,
            registry::BatchEntryResult,
            registry::BatchRegisterResponse,
            registry::RegistrationResponse,
            registry::UpdateIdentityRequest,
            registry::UpdateCountryRequest,
            registry::VerificationResponse,
            identities::CreateIdentityRequest,
            identities::CreateIdentityResponse,
            identities::IdentityResponse,
            identities::KeyEntry,
            identities::KeyRequest,
            identities::ClaimEntry,
            identities::AddClaimResponse,
            trust::ClaimTopicRequest,
            trust::ClaimTopicsResponse,
            trust::TrustedIssuerRequest,
            trust::UpdateIssuerTopicsRequest,
            trust::TrustedIssuerResponse,
            trust::RolesResponse,
            trust::AgentRequest,
            trust::TransferOwnershipRequest,
            token::TokenInfo,
            token::BalanceResponse,
            token::MintRequest,
            token::BurnRequest,
            token::TransferRequest,
            token::TransferResponse
        )
    ),
    modifiers(&SignedRequestAuth),
    tags(
        (name = "Health", description = "Liveness and state summary"),
        (name = "Registry", description = "Wallet to identity bindings and verification"),
        (name = "Identities", description = "Identities, keys and claims"),
        (name = "Trust", description = "Claim topics, trusted issuers and agents"),
        (name = "Token", description = "Compliance-gated token ledger")
    )
)]
struct ApiDoc;

/// Documents the signature header. `X-Principal` and `X-Timestamp` travel
/// with it.
struct SignedRequestAuth;

impl Modify for SignedRequestAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "signed_request",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Signature"))),
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::extractor::tests::signed_headers;
    use crate::compliance::ComplianceGate;
    use crate::identity::{ClaimSigner, LocalClaimSigner};
    use crate::suite::ComplianceSuite;
    use crate::types::topic_from_name;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Router over a fresh suite whose owner (and agent) is `owner`.
    pub(crate) fn test_app(owner: &LocalClaimSigner) -> Router {
        let mut suite = ComplianceSuite::in_memory(ComplianceGate::new());
        suite.bootstrap_owner(owner.address()).unwrap();
        router(AppState::new(suite))
    }

    /// Send a request, signing it when `signer` is given.
    pub(crate) async fn send(
        app: &Router,
        signer: Option<&LocalClaimSigner>,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let bytes = body.map(|b| serde_json::to_vec(&b).unwrap()).unwrap_or_default();
        let mut builder = Request::builder().method(method.clone()).uri(path);
        if !bytes.is_empty() {
            builder = builder.header("content-type", "application/json");
        }
        if let Some(signer) = signer {
            for (name, value) in signed_headers(signer, &method, path, &bytes) {
                builder = builder.header(name, value);
            }
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::from(bytes)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/registry"));
        assert!(doc.paths.paths.contains_key("/v1/token/transfer"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("signed_request"));
    }

    /// Full onboarding through the HTTP surface: trust setup, identity,
    /// claim, registration, mint and transfer.
    #[tokio::test]
    async fn end_to_end_onboarding_and_transfer() {
        let owner = LocalClaimSigner::random();
        let issuer_key = LocalClaimSigner::random();
        let alice = LocalClaimSigner::random();
        let bob = LocalClaimSigner::random();
        let app = test_app(&owner);
        let topic = topic_from_name("CLAIM_TOPIC");

        let (status, _) = send(&app, Some(&owner), Method::POST, "/v1/claim-topics",
            Some(json!({ "topic": topic }))).await;
        assert_eq!(status, StatusCode::CREATED);

        // Issuer identity managed by the owner, signing with `issuer_key`.
        let (status, body) = send(&app, Some(&owner), Method::POST, "/v1/identities", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let issuer: Address = body["identity"].as_str().unwrap().parse().unwrap();
        let (status, _) = send(&app, Some(&owner), Method::POST,
            &format!("/v1/identities/{issuer}/keys"),
            Some(json!({ "key": issuer_key.address(), "role": "claim_signer" }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Some(&owner), Method::POST, "/v1/trusted-issuers",
            Some(json!({ "issuer": issuer, "topics": [topic] }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let mut identities = Vec::new();
        for investor in [&alice, &bob] {
            let (status, body) =
                send(&app, Some(investor), Method::POST, "/v1/identities", None).await;
            assert_eq!(status, StatusCode::CREATED);
            let identity: Address = body["identity"].as_str().unwrap().parse().unwrap();

            let data = b"kyc ok";
            let signature = issuer_key.sign_claim(identity, topic, data).unwrap();
            let claim = json!({
                "topic": topic,
                "scheme": 1,
                "issuer": issuer,
                "signature": signature,
                "data": alloy::hex::encode_prefixed(data),
            });
            let (status, _) = send(&app, Some(investor), Method::POST,
                &format!("/v1/identities/{identity}/claims"), Some(claim)).await;
            assert_eq!(status, StatusCode::CREATED);

            let (status, _) = send(&app, Some(&owner), Method::POST, "/v1/registry",
                Some(json!({ "wallet": investor.address(), "identity": identity, "country": 840 })))
                .await;
            assert_eq!(status, StatusCode::CREATED);
            identities.push(identity);
        }

        let (status, body) = send(&app, None, Method::GET,
            &format!("/v1/registry/{}/verification", alice.address()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified"], true);

        // Starts paused.
        let (status, body) = send(&app, Some(&owner), Method::POST, "/v1/token/mint",
            Some(json!({ "to": alice.address(), "amount": 100 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "compliance_error");

        let (status, _) = send(&app, Some(&owner), Method::POST, "/v1/token/unpause", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Some(&owner), Method::POST, "/v1/token/mint",
            Some(json!({ "to": alice.address(), "amount": 100 }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Some(&alice), Method::POST, "/v1/token/transfer",
            Some(json!({ "to": bob.address(), "amount": 40 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from_balance"], 60);
        assert_eq!(body["to_balance"], 40);

        let (status, body) = send(&app, Some(&alice), Method::POST, "/v1/token/transfer",
            Some(json!({ "to": bob.address(), "amount": 1000 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "insufficient_balance");

        let (_, body) = send(&app, None, Method::GET, "/v1/token", None).await;
        assert_eq!(body["total_supply"], 100);
        assert_eq!(body["symbol"], "TSTOCK");
    }

    #[tokio::test]
    async fn unsigned_mutation_is_rejected() {
        let owner = LocalClaimSigner::random();
        let app = test_app(&owner);
        let (status, body) = send(&app, None, Method::POST, "/v1/token/pause", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn replayed_mutation_is_rejected_once_accepted() {
        let owner = LocalClaimSigner::random();
        let app = test_app(&owner);
        let headers = signed_headers(&owner, &Method::POST, "/v1/token/unpause", b"");
        let request = || {
            let mut builder = Request::builder().method(Method::POST).uri("/v1/token/unpause");
            for (name, value) in &headers {
                builder = builder.header(*name, value.as_str());
            }
            builder.body(Body::empty()).unwrap()
        };

        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Re-pause, then replay the captured unpause.
        let (status, _) = send(&app, Some(&owner), Method::POST, "/v1/token/pause", None).await;
        assert_eq!(status, StatusCode::OK);
        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "replayed_request");

        let (_, body) = send(&app, None, Method::GET, "/v1/token", None).await;
        assert_eq!(body["paused"], true);
    }

    #[tokio::test]
    async fn caller_without_role_is_forbidden() {
        let owner = LocalClaimSigner::random();
        let stranger = LocalClaimSigner::random();
        let app = test_app(&owner);
        let (status, body) = send(&app, Some(&stranger), Method::POST, "/v1/claim-topics",
            Some(json!({ "topic": "0x01" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "authorization_error");
    }

    #[tokio::test]
    async fn malformed_path_parameters_are_bad_requests() {
        let app = router(AppState::default());
        let (status, _) = send(&app, None, Method::GET, "/v1/registry/not-an-address", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, None, Method::GET,
            "/v1/identities/0x0000000000000000000000000000000000000001/claims/0x12", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
