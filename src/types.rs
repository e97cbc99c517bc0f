// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Core domain types shared by the registries, the verification engine and
//! the ledger.

use alloy::{
    primitives::{keccak256, Address as EvmAddress, Bytes, B256, U256},
    sol_types::SolValue,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 20-byte EVM address. Used for wallets, identities, issuers and principals.
pub type Address = EvmAddress;

/// Attestation category. Topics are 256-bit values, usually
/// `keccak256("SOME_TOPIC_NAME")`.
pub type ClaimTopic = U256;

/// Claim identifier: `keccak256(abi.encode(issuer, topic))`.
pub type ClaimId = B256;

/// ISO-3166 numeric country code of an investor.
pub type Jurisdiction = u16;

/// Returned by `investor_country` for unbound wallets.
pub const NULL_JURISDICTION: Jurisdiction = 0;

/// Token amounts. Balances can never go negative.
pub type Amount = u128;

/// Derive a claim id from its issuer and topic.
pub fn claim_id(issuer: Address, topic: ClaimTopic) -> ClaimId {
    keccak256((issuer, topic).abi_encode_params())
}

/// Topic value for a human readable topic name (`keccak256(name)`).
pub fn topic_from_name(name: &str) -> ClaimTopic {
    U256::from_be_bytes(keccak256(name.as_bytes()).0)
}

/// A signed attestation attached to an identity.
///
/// Claims are never edited in place; adding a claim with an existing
/// `(issuer, topic)` pair replaces the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claim {
    /// Attestation category.
    #[schema(value_type = String)]
    pub topic: ClaimTopic,
    /// Signature scheme (1 = ECDSA).
    pub scheme: u64,
    /// Identity of the issuer that attested this claim.
    #[schema(value_type = String)]
    pub issuer: Address,
    /// 65-byte `r || s || v` signature over the claim digest.
    #[schema(value_type = String)]
    pub signature: Bytes,
    /// Opaque claim payload.
    #[schema(value_type = String)]
    pub data: Bytes,
    /// Optional off-chain location of the claim document.
    #[serde(default)]
    pub uri: String,
}

impl Claim {
    /// The `(issuer, topic)` derived identifier of this claim.
    pub fn id(&self) -> ClaimId {
        claim_id(self.issuer, self.topic)
    }
}

/// Wallet to identity binding owned by the identity registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityRecord {
    /// Bound wallet.
    #[schema(value_type = String)]
    pub wallet: Address,
    /// Identity the wallet resolves to.
    #[schema(value_type = String)]
    pub identity: Address,
    /// Investor jurisdiction.
    pub jurisdiction: Jurisdiction,
    /// When the binding was created.
    pub registered_at: DateTime<Utc>,
}
