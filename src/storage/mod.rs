// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable state for the registries and the ledger.
//!
//! Every operation is expressed as an ordered changeset of [`Change`]s. A
//! [`StateBackend`] commits a changeset atomically; the suite applies the
//! same changeset to its in-memory state only after the commit succeeded.
//! On startup the backend replays its contents as a changeset.
//!
//! ## Backends
//!
//! - [`MemoryBackend`] - append-only in-process log (tests, ephemeral runs)
//! - [`RedbBackend`] - redb file database (pure Rust, ACID)
//!
//! Verification results are never stored. They are recomputed from claims,
//! issuers and topics on every query.

pub mod database;

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::auth::{Role, RoleMap};
use crate::types::{Address, Amount, Claim, ClaimId, ClaimTopic, IdentityRecord};

pub use database::RedbBackend;

/// A single state write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Replace a principal's suite-level roles (empty set removes it).
    PutSuiteRoles(Address, BTreeSet<Role>),
    AddClaimTopic(ClaimTopic),
    RemoveClaimTopic(ClaimTopic),
    PutTrustedIssuer(Address, Vec<ClaimTopic>),
    RemoveTrustedIssuer(Address),
    /// Create an identity or replace its keys. Claims are untouched.
    PutIdentityKeys(Address, RoleMap),
    PutClaim(Address, Claim),
    RemoveClaim(Address, ClaimId),
    SetIdentityNonce(u64),
    PutIdentityRecord(IdentityRecord),
    RemoveIdentityRecord(Address),
    PutBalance(Address, Amount),
    SetTotalSupply(Amount),
    SetPaused(bool),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable, totally ordered store behind the suite.
pub trait StateBackend: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Current contents, as a changeset that rebuilds them from empty state.
    fn load(&self) -> StoreResult<Vec<Change>>;

    /// Durably apply `changes`, all or nothing.
    fn commit(&self, changes: &[Change]) -> StoreResult<()>;
}

/// In-process append-only change log.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    log: Mutex<Vec<Change>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed changes.
    pub fn len(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> StoreResult<Vec<Change>> {
        let log = self
            .log
            .lock()
            .map_err(|_| StoreError::Unavailable("change log lock poisoned".into()))?;
        Ok(log.clone())
    }

    fn commit(&self, changes: &[Change]) -> StoreResult<()> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| StoreError::Unavailable("change log lock poisoned".into()))?;
        log.extend_from_slice(changes);
        Ok(())
    }
}
