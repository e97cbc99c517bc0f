// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity Registry: binds wallets to identities and answers live
//! verification queries for them.
//!
//! The registry owns only the binding. Deleting a record leaves the
//! identity and its claims in place; re-registering the wallet later starts
//! from whatever claims the newly bound identity carries.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::identity::IdentityStore;
use crate::registry::{ClaimTopicsRegistry, TrustedIssuersRegistry};
use crate::storage::Change;
use crate::types::{Address, IdentityRecord, Jurisdiction, NULL_JURISDICTION};
use crate::verification;

/// Read interface the compliance gate consumes.
pub trait IdentityVerifier {
    fn is_registered(&self, wallet: &Address) -> bool;

    /// Live verification of the identity bound to `wallet`. Unbound wallets
    /// are never verified.
    fn is_verified(&self, wallet: &Address) -> bool;

    fn investor_country(&self, wallet: &Address) -> Jurisdiction;
}

#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    records: BTreeMap<Address, IdentityRecord>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, wallet: &Address) -> Option<&IdentityRecord> {
        self.records.get(wallet)
    }

    pub fn contains(&self, wallet: &Address) -> bool {
        self.records.contains_key(wallet)
    }

    /// Bound identity, or the null address when unbound.
    pub fn identity(&self, wallet: &Address) -> Address {
        self.records
            .get(wallet)
            .map(|record| record.identity)
            .unwrap_or(Address::ZERO)
    }

    /// Stored jurisdiction, or [`NULL_JURISDICTION`] when unbound.
    pub fn investor_country(&self, wallet: &Address) -> Jurisdiction {
        self.records
            .get(wallet)
            .map(|record| record.jurisdiction)
            .unwrap_or(NULL_JURISDICTION)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn plan_register(
        &self,
        identities: &IdentityStore,
        wallet: Address,
        identity: Address,
        jurisdiction: Jurisdiction,
    ) -> CoreResult<Change> {
        if wallet.is_zero() {
            return Err(CoreError::InvalidArgument("wallet is the null address".into()));
        }
        if self.records.contains_key(&wallet) {
            return Err(CoreError::AlreadyRegistered(wallet));
        }
        if !identities.contains(&identity) {
            return Err(CoreError::IdentityNotFound(identity));
        }
        Ok(Change::PutIdentityRecord(IdentityRecord {
            wallet,
            identity,
            jurisdiction,
            registered_at: Utc::now(),
        }))
    }

    pub fn plan_delete(&self, wallet: Address) -> CoreResult<Change> {
        if !self.records.contains_key(&wallet) {
            return Err(CoreError::NotRegistered(wallet));
        }
        Ok(Change::RemoveIdentityRecord(wallet))
    }

    pub fn plan_update_identity(
        &self,
        identities: &IdentityStore,
        wallet: Address,
        identity: Address,
    ) -> CoreResult<Change> {
        let record = self
            .records
            .get(&wallet)
            .ok_or(CoreError::NotRegistered(wallet))?;
        if !identities.contains(&identity) {
            return Err(CoreError::IdentityNotFound(identity));
        }
        Ok(Change::PutIdentityRecord(IdentityRecord {
            identity,
            ..record.clone()
        }))
    }

    pub fn plan_update_country(
        &self,
        wallet: Address,
        jurisdiction: Jurisdiction,
    ) -> CoreResult<Change> {
        let record = self
            .records
            .get(&wallet)
            .ok_or(CoreError::NotRegistered(wallet))?;
        Ok(Change::PutIdentityRecord(IdentityRecord {
            jurisdiction,
            ..record.clone()
        }))
    }

    pub(crate) fn put(&mut self, record: IdentityRecord) {
        self.records.insert(record.wallet, record);
    }

    pub(crate) fn remove(&mut self, wallet: &Address) {
        self.records.remove(wallet);
    }
}

/// Point-in-time view over everything verification depends on.
#[derive(Clone, Copy)]
pub struct RegistryView<'a> {
    pub registry: &'a IdentityRegistry,
    pub identities: &'a IdentityStore,
    pub topics: &'a ClaimTopicsRegistry,
    pub issuers: &'a TrustedIssuersRegistry,
}

impl IdentityVerifier for RegistryView<'_> {
    fn is_registered(&self, wallet: &Address) -> bool {
        self.registry.contains(wallet)
    }

    fn is_verified(&self, wallet: &Address) -> bool {
        let bound = self.registry.identity(wallet);
        if bound.is_zero() {
            return false;
        }
        match self.identities.get(&bound) {
            Some(identity) => {
                verification::is_verified(identity, self.topics, self.issuers, self.identities)
            }
            None => false,
        }
    }

    fn investor_country(&self, wallet: &Address) -> Jurisdiction {
        self.registry.investor_country(wallet)
    }
}
