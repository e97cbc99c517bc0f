// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identities
//!
//! An identity is a subject's container of signed claims. It is created
//! independently of any wallet binding, addressed by its own EVM-style
//! address, and outlives registry records that point at it.
//!
//! Each identity carries a [`RoleMap`]:
//!
//! - `Owner` holders manage claims and keys.
//! - `ClaimSigner` holders sign claims when this identity acts as an issuer.

pub mod signing;

use std::collections::BTreeMap;

use alloy::{
    primitives::{keccak256, U256},
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

use crate::auth::{Role, RoleMap};
use crate::types::{Address, Claim, ClaimId, ClaimTopic};

pub use signing::{
    claim_digest, recover_claim_signer, recover_message_signer, ClaimSigner, LocalClaimSigner,
    SigningError,
};

/// A subject's set of keys and claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub address: Address,
    pub keys: RoleMap,
    pub claims: BTreeMap<ClaimId, Claim>,
}

impl Identity {
    /// New identity managed by `manager`.
    pub fn new(address: Address, manager: Address) -> Self {
        Self {
            address,
            keys: RoleMap::with(manager, Role::Owner),
            claims: BTreeMap::new(),
        }
    }

    pub fn claim(&self, claim_id: &ClaimId) -> Option<&Claim> {
        self.claims.get(claim_id)
    }

    /// Claims attached under `topic`, from any issuer.
    pub fn claims_by_topic(&self, topic: ClaimTopic) -> impl Iterator<Item = &Claim> {
        self.claims.values().filter(move |claim| claim.topic == topic)
    }

    pub fn claim_ids_by_topic(&self, topic: ClaimTopic) -> Vec<ClaimId> {
        self.claims
            .iter()
            .filter(|(_, claim)| claim.topic == topic)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Whether `key` may sign claims on behalf of this identity.
    pub fn is_claim_signer(&self, key: &Address) -> bool {
        self.keys.has_role(key, Role::ClaimSigner)
    }
}

/// All identities known to the suite, keyed by identity address.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    identities: BTreeMap<Address, Identity>,
    nonce: u64,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<&Identity> {
        self.identities.get(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.identities.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Nonce the next created identity will be derived from.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Address the next identity created by `manager` will receive.
    pub fn next_address(&self, manager: Address) -> Address {
        derive_identity_address(manager, self.nonce)
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    pub(crate) fn insert(&mut self, identity: Identity) {
        self.identities.insert(identity.address, identity);
    }

    pub(crate) fn get_mut(&mut self, address: &Address) -> Option<&mut Identity> {
        self.identities.get_mut(address)
    }
}

/// `keccak256(abi.encode(manager, nonce))[12..]`.
pub fn derive_identity_address(manager: Address, nonce: u64) -> Address {
    let hash = keccak256((manager, U256::from(nonce)).abi_encode_params());
    Address::from_word(hash)
}
