// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trusted Issuers Registry: which issuer identities may attest which topics.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CoreError, CoreResult};
use crate::storage::Change;
use crate::types::{Address, ClaimTopic};

pub const MAX_TRUSTED_ISSUERS: usize = 50;
pub const MAX_TOPICS_PER_ISSUER: usize = 15;

#[derive(Debug, Clone, Default)]
pub struct TrustedIssuersRegistry {
    issuers: BTreeMap<Address, BTreeSet<ClaimTopic>>,
}

impl TrustedIssuersRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issuers(&self) -> Vec<Address> {
        self.issuers.keys().copied().collect()
    }

    pub fn is_trusted(&self, issuer: &Address) -> bool {
        self.issuers.contains_key(issuer)
    }

    pub fn issuer_topics(&self, issuer: &Address) -> Option<Vec<ClaimTopic>> {
        self.issuers
            .get(issuer)
            .map(|topics| topics.iter().copied().collect())
    }

    /// Whether `issuer` is currently trusted for `topic`.
    pub fn has_claim_topic(&self, issuer: &Address, topic: ClaimTopic) -> bool {
        self.issuers
            .get(issuer)
            .is_some_and(|topics| topics.contains(&topic))
    }

    pub fn issuers_for_topic(&self, topic: ClaimTopic) -> Vec<Address> {
        self.issuers
            .iter()
            .filter(|(_, topics)| topics.contains(&topic))
            .map(|(issuer, _)| *issuer)
            .collect()
    }

    pub fn plan_add(&self, issuer: Address, topics: &[ClaimTopic]) -> CoreResult<Change> {
        if issuer.is_zero() {
            return Err(CoreError::InvalidArgument("issuer is the null address".into()));
        }
        if self.issuers.contains_key(&issuer) {
            return Err(CoreError::TrustedIssuerExists(issuer));
        }
        if self.issuers.len() >= MAX_TRUSTED_ISSUERS {
            return Err(CoreError::LimitExceeded(format!(
                "at most {MAX_TRUSTED_ISSUERS} trusted issuers"
            )));
        }
        let topics = validate_topics(topics)?;
        Ok(Change::PutTrustedIssuer(issuer, topics))
    }

    pub fn plan_update(&self, issuer: Address, topics: &[ClaimTopic]) -> CoreResult<Change> {
        if !self.issuers.contains_key(&issuer) {
            return Err(CoreError::TrustedIssuerNotFound(issuer));
        }
        let topics = validate_topics(topics)?;
        Ok(Change::PutTrustedIssuer(issuer, topics))
    }

    pub fn plan_remove(&self, issuer: Address) -> CoreResult<Change> {
        if !self.issuers.contains_key(&issuer) {
            return Err(CoreError::TrustedIssuerNotFound(issuer));
        }
        Ok(Change::RemoveTrustedIssuer(issuer))
    }

    pub(crate) fn put(&mut self, issuer: Address, topics: &[ClaimTopic]) {
        self.issuers.insert(issuer, topics.iter().copied().collect());
    }

    pub(crate) fn remove(&mut self, issuer: &Address) {
        self.issuers.remove(issuer);
    }
}

/// Deduplicate and bound an issuer's topic list.
fn validate_topics(topics: &[ClaimTopic]) -> CoreResult<Vec<ClaimTopic>> {
    let unique: BTreeSet<ClaimTopic> = topics.iter().copied().collect();
    if unique.is_empty() {
        return Err(CoreError::InvalidArgument(
            "trusted issuer needs at least one claim topic".into(),
        ));
    }
    if unique.len() > MAX_TOPICS_PER_ISSUER {
        return Err(CoreError::LimitExceeded(format!(
            "at most {MAX_TOPICS_PER_ISSUER} topics per issuer"
        )));
    }
    Ok(unique.into_iter().collect())
}
