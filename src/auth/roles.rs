// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal roles and the pure authorization check.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{CoreError, CoreResult};
use crate::types::Address;

/// Roles a principal can hold.
///
/// ## Role Scopes
///
/// - On the suite: `Owner` manages topics, issuers and agents; `Agent`
///   registers identities and operates the ledger.
/// - On an identity: `Owner` is management authority (claims and keys);
///   `ClaimSigner` keys sign claims when the identity acts as an issuer.
///
/// Roles are not hierarchical. An owner that also wants to act as an agent
/// must be granted `Agent` explicitly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Agent,
    ClaimSigner,
}

impl Role {
    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "owner" => Some(Role::Owner),
            "agent" => Some(Role::Agent),
            "claim_signer" | "claimsigner" => Some(Role::ClaimSigner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Agent => write!(f, "agent"),
            Role::ClaimSigner => write!(f, "claim_signer"),
        }
    }
}

/// Map from principal to the roles it holds within one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMap {
    grants: BTreeMap<Address, BTreeSet<Role>>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map with a single principal holding a single role.
    pub fn with(principal: Address, role: Role) -> Self {
        let mut map = Self::new();
        map.grant(principal, role);
        map
    }

    pub fn has_role(&self, principal: &Address, role: Role) -> bool {
        self.grants
            .get(principal)
            .is_some_and(|roles| roles.contains(&role))
    }

    /// Roles held by `principal` (empty when unknown).
    pub fn roles_of(&self, principal: &Address) -> BTreeSet<Role> {
        self.grants.get(principal).cloned().unwrap_or_default()
    }

    /// All principals holding `role`.
    pub fn holders(&self, role: Role) -> Vec<Address> {
        self.grants
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(principal, _)| *principal)
            .collect()
    }

    /// Grant a role. Returns `false` if it was already held.
    pub fn grant(&mut self, principal: Address, role: Role) -> bool {
        self.grants.entry(principal).or_default().insert(role)
    }

    /// Revoke a role. Returns `false` if it was not held.
    pub fn revoke(&mut self, principal: &Address, role: Role) -> bool {
        let Some(roles) = self.grants.get_mut(principal) else {
            return false;
        };
        let removed = roles.remove(&role);
        if roles.is_empty() {
            self.grants.remove(principal);
        }
        removed
    }

    /// Replace all roles of a principal. An empty set removes the principal.
    pub fn set_roles(&mut self, principal: Address, roles: BTreeSet<Role>) {
        if roles.is_empty() {
            self.grants.remove(&principal);
        } else {
            self.grants.insert(principal, roles);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &BTreeSet<Role>)> {
        self.grants.iter()
    }
}

/// Check that `principal` holds `role` in `map`.
///
/// Called at the start of every privileged operation, before any state is
/// inspected for mutation.
pub fn authorize(map: &RoleMap, principal: &Address, role: Role) -> CoreResult<()> {
    if map.has_role(principal, role) {
        Ok(())
    } else {
        Err(CoreError::Authorization {
            principal: *principal,
            role,
        })
    }
}
