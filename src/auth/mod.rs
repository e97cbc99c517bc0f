// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Callers authenticate with their EVM key; there are no sessions or tokens.
//!
//! ## Auth Flow
//!
//! 1. The caller builds `"{METHOD}\n{PATH}\n{TIMESTAMP}\n{keccak256(body)}"`
//! 2. It signs that text with EIP-191 personal-message prefixing
//! 3. It sends `X-Principal`, `X-Timestamp` and `X-Signature` headers
//! 4. The server:
//!    - recovers the signer and requires it to equal `X-Principal`
//!    - rejects timestamps outside `AUTH_MAX_SKEW_SECS`
//!    - rejects a request it already accepted within that window
//!    - hands the principal to the suite, which checks its roles
//!
//! ## Security
//!
//! - Every mutating endpoint requires a signature; read-only GETs do not
//! - Role checks happen in the suite via [`authorize`], never in handlers

pub mod error;
pub mod extractor;
pub mod replay;
pub mod roles;

pub use error::AuthError;
pub use extractor::{signing_message, verify_request, Signed};
pub use replay::ReplayGuard;
pub use roles::{authorize, Role, RoleMap};
