// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Service status plus a summary of the loaded compliance state.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub suite: SuiteSummary,
}

/// Counts over the live state. Reading them takes the suite read lock, so a
/// response also proves the writer is not wedged.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuiteSummary {
    /// "redb" or "memory".
    pub backend: String,
    pub paused: bool,
    pub total_supply: u128,
    pub holders: usize,
    pub identities: usize,
    pub registered_wallets: usize,
    pub claim_topics: usize,
    pub trusted_issuers: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LivenessResponse {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up and state is readable", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let suite = state.suite.read().await;
    let loaded = suite.state();
    let summary = SuiteSummary {
        backend: suite.backend_name().to_string(),
        paused: suite.paused(),
        total_supply: suite.total_supply(),
        holders: loaded.ledger.holder_count(),
        identities: loaded.identities.len(),
        registered_wallets: loaded.registry.len(),
        claim_topics: suite.claim_topics().len(),
        trusted_issuers: suite.trusted_issuers().issuers().len(),
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        suite: summary,
    })
}

/// Process liveness only; never touches the suite.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is running", body = LivenessResponse))
)]
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
    })
}
