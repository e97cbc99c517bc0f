// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Compliance Ledger - Identity-Gated Security Token Service
//!
//! A permissioned token ledger in the ERC-3643 mould: tokens only reach
//! wallets bound to an identity whose claims, signed by trusted issuers,
//! cover every required topic.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Signed-request authentication and role checks
//! - `compliance` - Transfer gate and pluggable policies
//! - `identity` - Identities, keys, claims and claim signing
//! - `registry` - Claim topics, trusted issuers and the identity registry
//! - `verification` - Claim validity and identity verification
//! - `ledger` - Balances, supply and pause state
//! - `suite` - The coordinator every operation goes through
//! - `storage` - State backends (redb or in-memory)

pub mod api;
pub mod auth;
pub mod compliance;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod registry;
pub mod state;
pub mod storage;
pub mod suite;
pub mod types;
pub mod verification;
