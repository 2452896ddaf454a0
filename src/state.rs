// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::service::CertificateService;
use crate::storage::CaDatabase;

/// How bearer tokens are verified.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// HS256 secret. Without one, tokens are only accepted in `dev` builds.
    pub secret: Option<String>,
    /// Expected `iss` claim, checked when set.
    pub issuer: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CertificateService>,
    pub db: Arc<CaDatabase>,
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(service: CertificateService, db: Arc<CaDatabase>, auth_config: AuthConfig) -> Self {
        Self {
            service: Arc::new(service),
            db,
            auth_config,
        }
    }
}
