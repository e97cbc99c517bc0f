// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::ReplayGuard;
use crate::compliance::ComplianceGate;
use crate::config::DEFAULT_AUTH_MAX_SKEW_SECS;
use crate::suite::ComplianceSuite;

/// Signed-request verification settings.
#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    pub max_skew_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_skew_secs: DEFAULT_AUTH_MAX_SKEW_SECS,
        }
    }
}

/// Shared handler state.
///
/// Mutating handlers hold the write lock for the whole operation, which
/// serializes every state transition into one total order. Queries take the
/// read lock and see a consistent snapshot.
#[derive(Clone)]
pub struct AppState {
    pub suite: Arc<RwLock<ComplianceSuite>>,
    pub auth: AuthConfig,
    pub replay: Arc<ReplayGuard>,
}

impl AppState {
    pub fn new(suite: ComplianceSuite) -> Self {
        Self {
            suite: Arc::new(RwLock::new(suite)),
            auth: AuthConfig::default(),
            replay: Arc::new(ReplayGuard::default()),
        }
    }

    pub fn with_auth_config(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ComplianceSuite::in_memory(ComplianceGate::new()))
    }
}
