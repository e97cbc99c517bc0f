// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;

use compliance_ledger::{
    api::router,
    config::{init_tracing, AppConfig, ConfigError},
    error::CoreError,
    state::{AppState, AuthConfig},
    storage::{MemoryBackend, RedbBackend, StateBackend, StoreError},
    suite::ComplianceSuite,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("state store: {0}")]
    Store(#[from] StoreError),
    #[error("suite: {0}")]
    Core(#[from] CoreError),
    #[error("invalid bind address {0}")]
    BindAddress(String),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    let backend: Box<dyn StateBackend> = match config.state_db_path() {
        Some(path) => {
            info!(path = %path.display(), "Opening state database");
            Box::new(RedbBackend::open(&path)?)
        }
        None => {
            warn!("DATA_DIR not set; state will not survive a restart");
            Box::new(MemoryBackend::new())
        }
    };

    let gate = config.compliance_gate();
    let mut suite = ComplianceSuite::open(backend, config.token.clone(), gate)?;

    match config.suite_owner {
        Some(owner) => {
            if !suite.bootstrap_owner(owner)? {
                info!(owners = ?suite.owners(), "Suite owner already set; SUITE_OWNER ignored");
            }
        }
        None if suite.owners().is_empty() => {
            warn!("No suite owner; set SUITE_OWNER to administer the suite");
        }
        None => {}
    }

    info!(
        backend = suite.backend_name(),
        policies = ?suite.gate().policy_names(),
        paused = suite.paused(),
        "Compliance suite ready"
    );

    let state = AppState::new(suite).with_auth_config(AuthConfig {
        max_skew_secs: config.auth_max_skew_secs,
    });
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| StartupError::BindAddress(format!("{}:{}", config.host, config.port)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Compliance ledger listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
