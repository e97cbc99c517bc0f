// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded state database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `suite_roles`: principal → JSON role set
//! - `claim_topics`: topic (32 bytes BE) → empty marker
//! - `trusted_issuers`: issuer → JSON topic list
//! - `identities`: identity → JSON key roles
//! - `claims`: identity ‖ claim id → JSON Claim
//! - `identity_records`: wallet → JSON IdentityRecord
//! - `balances`: holder → u128 big-endian
//! - `ledger_meta`: key → value (`total_supply`, `paused`, `identity_nonce`)

use std::collections::BTreeSet;
use std::path::Path;

use alloy::primitives::{B256, U256};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{Change, StateBackend, StoreError, StoreResult};
use crate::auth::{Role, RoleMap};
use crate::types::{Address, Claim, ClaimTopic, IdentityRecord};

// =============================================================================
// Table Definitions
// =============================================================================

const SUITE_ROLES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("suite_roles");

const CLAIM_TOPICS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("claim_topics");

const TRUSTED_ISSUERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("trusted_issuers");

const IDENTITIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("identities");

/// Key format: `identity (20 bytes) | claim_id (32 bytes)`, so one identity's
/// claims are contiguous.
const CLAIMS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("claims");

const IDENTITY_RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("identity_records");

const BALANCES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("balances");

const LEDGER_META: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger_meta");

/// Value stored for every registered claim topic.
const MARKER: &[u8] = &[];

const META_TOTAL_SUPPLY: &str = "total_supply";
const META_PAUSED: &str = "paused";
const META_IDENTITY_NONCE: &str = "identity_nonce";

// =============================================================================
// Key Helpers
// =============================================================================

fn claim_key(identity: &Address, claim_id: &B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + 32);
    key.extend_from_slice(identity.as_slice());
    key.extend_from_slice(claim_id.as_slice());
    key
}

fn decode_address(bytes: &[u8]) -> StoreResult<Address> {
    if bytes.len() != 20 {
        return Err(StoreError::Corrupt(format!(
            "address key has {} bytes",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(bytes))
}

fn decode_topic(bytes: &[u8]) -> StoreResult<ClaimTopic> {
    U256::try_from_be_slice(bytes)
        .ok_or_else(|| StoreError::Corrupt(format!("topic key has {} bytes", bytes.len())))
}

fn decode_u128(bytes: &[u8]) -> StoreResult<u128> {
    let raw: [u8; 16] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("u128 value has {} bytes", bytes.len())))?;
    Ok(u128::from_be_bytes(raw))
}

fn decode_u64(bytes: &[u8]) -> StoreResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("u64 value has {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

// =============================================================================
// RedbBackend
// =============================================================================

/// File-backed state store. One redb write transaction per changeset.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SUITE_ROLES)?;
            let _ = write_txn.open_table(CLAIM_TOPICS)?;
            let _ = write_txn.open_table(TRUSTED_ISSUERS)?;
            let _ = write_txn.open_table(IDENTITIES)?;
            let _ = write_txn.open_table(CLAIMS)?;
            let _ = write_txn.open_table(IDENTITY_RECORDS)?;
            let _ = write_txn.open_table(BALANCES)?;
            let _ = write_txn.open_table(LEDGER_META)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened state database");
        Ok(Self { db })
    }
}

impl StateBackend for RedbBackend {
    fn name(&self) -> &'static str {
        "redb"
    }

    /// Replays tables in dependency order: identities before their claims,
    /// identities before the records that bind them.
    fn load(&self) -> StoreResult<Vec<Change>> {
        let read_txn = self.db.begin_read()?;
        let mut changes = Vec::new();

        let table = read_txn.open_table(SUITE_ROLES)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            let roles: BTreeSet<Role> = serde_json::from_slice(value.value())?;
            changes.push(Change::PutSuiteRoles(decode_address(key.value())?, roles));
        }

        let table = read_txn.open_table(CLAIM_TOPICS)?;
        for entry in table.iter()? {
            let (key, _) = entry?;
            changes.push(Change::AddClaimTopic(decode_topic(key.value())?));
        }

        let table = read_txn.open_table(TRUSTED_ISSUERS)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            let topics: Vec<ClaimTopic> = serde_json::from_slice(value.value())?;
            changes.push(Change::PutTrustedIssuer(decode_address(key.value())?, topics));
        }

        let table = read_txn.open_table(IDENTITIES)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            let keys: RoleMap = serde_json::from_slice(value.value())?;
            changes.push(Change::PutIdentityKeys(decode_address(key.value())?, keys));
        }

        let table = read_txn.open_table(CLAIMS)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key = key.value();
            if key.len() != 52 {
                return Err(StoreError::Corrupt(format!("claim key has {} bytes", key.len())));
            }
            let claim: Claim = serde_json::from_slice(value.value())?;
            changes.push(Change::PutClaim(decode_address(&key[..20])?, claim));
        }

        let meta = read_txn.open_table(LEDGER_META)?;
        if let Some(value) = meta.get(META_IDENTITY_NONCE)? {
            changes.push(Change::SetIdentityNonce(decode_u64(value.value())?));
        }

        let table = read_txn.open_table(IDENTITY_RECORDS)?;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: IdentityRecord = serde_json::from_slice(value.value())?;
            changes.push(Change::PutIdentityRecord(record));
        }

        let table = read_txn.open_table(BALANCES)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            changes.push(Change::PutBalance(
                decode_address(key.value())?,
                decode_u128(value.value())?,
            ));
        }

        if let Some(value) = meta.get(META_TOTAL_SUPPLY)? {
            changes.push(Change::SetTotalSupply(decode_u128(value.value())?));
        }
        if let Some(value) = meta.get(META_PAUSED)? {
            changes.push(Change::SetPaused(value.value().first() == Some(&1)));
        }

        Ok(changes)
    }

    fn commit(&self, changes: &[Change]) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut roles = write_txn.open_table(SUITE_ROLES)?;
            let mut topics = write_txn.open_table(CLAIM_TOPICS)?;
            let mut issuers = write_txn.open_table(TRUSTED_ISSUERS)?;
            let mut identities = write_txn.open_table(IDENTITIES)?;
            let mut claims = write_txn.open_table(CLAIMS)?;
            let mut records = write_txn.open_table(IDENTITY_RECORDS)?;
            let mut balances = write_txn.open_table(BALANCES)?;
            let mut meta = write_txn.open_table(LEDGER_META)?;

            for change in changes {
                match change {
                    Change::PutSuiteRoles(principal, set) if set.is_empty() => {
                        roles.remove(principal.as_slice())?;
                    }
                    Change::PutSuiteRoles(principal, set) => {
                        let json = serde_json::to_vec(set)?;
                        roles.insert(principal.as_slice(), json.as_slice())?;
                    }
                    Change::AddClaimTopic(topic) => {
                        let key = topic.to_be_bytes::<32>();
                        topics.insert(key.as_slice(), MARKER)?;
                    }
                    Change::RemoveClaimTopic(topic) => {
                        let key = topic.to_be_bytes::<32>();
                        topics.remove(key.as_slice())?;
                    }
                    Change::PutTrustedIssuer(issuer, list) => {
                        let json = serde_json::to_vec(list)?;
                        issuers.insert(issuer.as_slice(), json.as_slice())?;
                    }
                    Change::RemoveTrustedIssuer(issuer) => {
                        issuers.remove(issuer.as_slice())?;
                    }
                    Change::PutIdentityKeys(identity, keys) => {
                        let json = serde_json::to_vec(keys)?;
                        identities.insert(identity.as_slice(), json.as_slice())?;
                    }
                    Change::PutClaim(identity, claim) => {
                        let json = serde_json::to_vec(claim)?;
                        let key = claim_key(identity, &claim.id());
                        claims.insert(key.as_slice(), json.as_slice())?;
                    }
                    Change::RemoveClaim(identity, claim_id) => {
                        let key = claim_key(identity, claim_id);
                        claims.remove(key.as_slice())?;
                    }
                    Change::SetIdentityNonce(nonce) => {
                        meta.insert(META_IDENTITY_NONCE, nonce.to_be_bytes().as_slice())?;
                    }
                    Change::PutIdentityRecord(record) => {
                        let json = serde_json::to_vec(record)?;
                        records.insert(record.wallet.as_slice(), json.as_slice())?;
                    }
                    Change::RemoveIdentityRecord(wallet) => {
                        records.remove(wallet.as_slice())?;
                    }
                    Change::PutBalance(holder, 0) => {
                        balances.remove(holder.as_slice())?;
                    }
                    Change::PutBalance(holder, amount) => {
                        balances.insert(holder.as_slice(), amount.to_be_bytes().as_slice())?;
                    }
                    Change::SetTotalSupply(supply) => {
                        meta.insert(META_TOTAL_SUPPLY, supply.to_be_bytes().as_slice())?;
                    }
                    Change::SetPaused(paused) => {
                        meta.insert(META_PAUSED, [u8::from(*paused)].as_slice())?;
                    }
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::topic_from_name;
    use alloy::primitives::Bytes;
    use chrono::Utc;

    fn temp_db() -> (RedbBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = RedbBackend::open(&dir.path().join("state.redb")).unwrap();
        (db, dir)
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn sample_claim(issuer: Address) -> Claim {
        Claim {
            topic: topic_from_name("CLAIM_TOPIC"),
            scheme: 1,
            issuer,
            signature: Bytes::from(vec![7u8; 65]),
            data: Bytes::from_static(b"kyc"),
            uri: "https://issuer.example/claims/1".to_string(),
        }
    }

    #[test]
    fn empty_database_loads_nothing() {
        let (db, _dir) = temp_db();
        assert!(db.load().unwrap().is_empty());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.redb");
        let topic = topic_from_name("CLAIM_TOPIC");
        let claim = sample_claim(addr(0xc0));
        let record = IdentityRecord {
            wallet: addr(1),
            identity: addr(0xa0),
            jurisdiction: 840,
            registered_at: Utc::now(),
        };

        {
            let db = RedbBackend::open(&path).unwrap();
            db.commit(&[
                Change::PutSuiteRoles(addr(9), [Role::Owner, Role::Agent].into()),
                Change::AddClaimTopic(topic),
                Change::PutTrustedIssuer(addr(0xc0), vec![topic]),
                Change::PutIdentityKeys(addr(0xa0), RoleMap::with(addr(1), Role::Owner)),
                Change::PutClaim(addr(0xa0), claim.clone()),
                Change::SetIdentityNonce(3),
                Change::PutIdentityRecord(record.clone()),
            ])
            .unwrap();
            db.commit(&[
                Change::PutBalance(addr(1), 250),
                Change::SetTotalSupply(250),
                Change::SetPaused(false),
            ])
            .unwrap();
        }

        let db = RedbBackend::open(&path).unwrap();
        let loaded = db.load().unwrap();
        assert_eq!(
            loaded,
            vec![
                Change::PutSuiteRoles(addr(9), [Role::Owner, Role::Agent].into()),
                Change::AddClaimTopic(topic),
                Change::PutTrustedIssuer(addr(0xc0), vec![topic]),
                Change::PutIdentityKeys(addr(0xa0), RoleMap::with(addr(1), Role::Owner)),
                Change::PutClaim(addr(0xa0), claim),
                Change::SetIdentityNonce(3),
                Change::PutIdentityRecord(record),
                Change::PutBalance(addr(1), 250),
                Change::SetTotalSupply(250),
                Change::SetPaused(false),
            ]
        );
    }

    #[test]
    fn removals_delete_rows() {
        let (db, _dir) = temp_db();
        let topic = topic_from_name("CLAIM_TOPIC");
        let claim = sample_claim(addr(0xc0));
        db.commit(&[
            Change::AddClaimTopic(topic),
            Change::PutIdentityKeys(addr(0xa0), RoleMap::with(addr(1), Role::Owner)),
            Change::PutClaim(addr(0xa0), claim.clone()),
            Change::PutBalance(addr(1), 5),
            Change::PutSuiteRoles(addr(2), [Role::Agent].into()),
        ])
        .unwrap();
        db.commit(&[
            Change::RemoveClaimTopic(topic),
            Change::RemoveClaim(addr(0xa0), claim.id()),
            Change::PutBalance(addr(1), 0),
            Change::PutSuiteRoles(addr(2), BTreeSet::new()),
        ])
        .unwrap();

        assert_eq!(
            db.load().unwrap(),
            vec![Change::PutIdentityKeys(
                addr(0xa0),
                RoleMap::with(addr(1), Role::Owner)
            )]
        );
    }

    #[test]
    fn paused_flag_round_trips_both_ways() {
        let (db, _dir) = temp_db();
        db.commit(&[Change::SetPaused(true)]).unwrap();
        assert_eq!(db.load().unwrap(), vec![Change::SetPaused(true)]);
        db.commit(&[Change::SetPaused(false)]).unwrap();
        assert_eq!(db.load().unwrap(), vec![Change::SetPaused(false)]);
    }
}
