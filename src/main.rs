// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use custody_ca::{
    api::router,
    config::AppConfig,
    crypto::{PasswordPolicy, SerialNumberSource},
    service::{CertificateService, IssuanceSettings},
    state::AppState,
    storage::{AuditDispatcher, CaDatabase},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.json_logs);

    if config.jwt_secret.is_none() {
        if cfg!(feature = "dev") {
            tracing::warn!("JWT_SECRET not set, accepting unverified tokens (dev build)");
        } else {
            tracing::warn!("JWT_SECRET not set, every authenticated request will be rejected");
        }
    }

    let database_path = config.database_path();
    let db = Arc::new(CaDatabase::open(&database_path)?);
    tracing::info!(path = %database_path.display(), "Opened certificate database");

    let shutdown = CancellationToken::new();
    let (dispatcher, audit_worker) = AuditDispatcher::channel(db.clone());
    let audit_task = tokio::spawn(audit_worker.run(shutdown.clone()));

    let settings = IssuanceSettings {
        password_policy: PasswordPolicy::new(config.key_password_min_length),
        default_validity_days: config.default_validity_days,
        default_rsa_key_size: config.default_rsa_key_size,
    };
    let service = CertificateService::new(
        db.clone(),
        dispatcher,
        SerialNumberSource::from_entropy(),
        settings,
    );
    let state = AppState::new(service, db, config.auth_config());
    let app = router(state);

    let addr = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Custody CA listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if let Err(e) = audit_task.await {
        tracing::warn!(error = %e, "Audit worker did not stop cleanly");
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Graceful shutdown initiated");
}
