// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Claim Verification Engine
//!
//! Pure predicates over the current registries. Nothing here stores a
//! result: every call re-reads the identity's claims, the trusted issuers
//! and the required topics, so revoking trust or removing a claim takes
//! effect on the very next query.
//!
//! A claim is valid when:
//!
//! 1. its issuer is trusted for the claim's topic, and
//! 2. the signature over `(identity, topic, data)` recovers to a key holding
//!    the `ClaimSigner` role on the issuer's identity.
//!
//! An identity is verified when every required topic has at least one
//! valid claim. No required topics means every identity is verified.

use serde::Serialize;
use utoipa::ToSchema;

use crate::identity::{recover_claim_signer, Identity, IdentityStore};
use crate::registry::{ClaimTopicsRegistry, TrustedIssuersRegistry};
use crate::types::{Address, Claim, ClaimId, ClaimTopic};

/// Whether `claim` is a valid attestation about `identity`.
pub fn verify_claim(
    identity: Address,
    claim: &Claim,
    issuers: &TrustedIssuersRegistry,
    identities: &IdentityStore,
) -> bool {
    if !issuers.has_claim_topic(&claim.issuer, claim.topic) {
        return false;
    }
    let Some(issuer) = identities.get(&claim.issuer) else {
        return false;
    };
    match recover_claim_signer(identity, claim.topic, &claim.data, &claim.signature) {
        Some(signer) => issuer.is_claim_signer(&signer),
        None => false,
    }
}

/// Whether `identity` satisfies every required topic.
pub fn is_verified(
    identity: &Identity,
    topics: &ClaimTopicsRegistry,
    issuers: &TrustedIssuersRegistry,
    identities: &IdentityStore,
) -> bool {
    topics.iter().all(|topic| {
        identity
            .claims_by_topic(topic)
            .any(|claim| verify_claim(identity.address, claim, issuers, identities))
    })
}

/// Per-topic outcome of a verification run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicStatus {
    #[schema(value_type = String)]
    pub topic: ClaimTopic,
    pub satisfied: bool,
    /// Claims that currently validate for this topic.
    #[schema(value_type = Vec<String>)]
    pub valid_claims: Vec<ClaimId>,
}

/// Verify every required topic and report which claims satisfy each.
///
/// Unlike [`is_verified`] this evaluates all claims, so it is meant for
/// diagnostics rather than the compliance path.
pub fn verification_report(
    identity: &Identity,
    topics: &ClaimTopicsRegistry,
    issuers: &TrustedIssuersRegistry,
    identities: &IdentityStore,
) -> Vec<TopicStatus> {
    topics
        .iter()
        .map(|topic| {
            let valid_claims: Vec<ClaimId> = identity
                .claims_by_topic(topic)
                .filter(|claim| verify_claim(identity.address, claim, issuers, identities))
                .map(Claim::id)
                .collect();
            TopicStatus {
                topic,
                satisfied: !valid_claims.is_empty(),
                valid_claims,
            }
        })
        .collect()
}
