// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-managed registries.
//!
//! Registries are read directly; mutations are planned as [`Change`]s and
//! only applied once the suite has committed them.
//!
//! [`Change`]: crate::storage::Change

pub mod claim_topics;
pub mod identity_registry;
pub mod trusted_issuers;

pub use claim_topics::{ClaimTopicsRegistry, MAX_CLAIM_TOPICS};
pub use identity_registry::{IdentityRegistry, IdentityVerifier, RegistryView};
pub use trusted_issuers::{TrustedIssuersRegistry, MAX_TOPICS_PER_ISSUER, MAX_TRUSTED_ISSUERS};
