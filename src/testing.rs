// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit and router tests.

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::auth::{Principal, Role, TokenClaims};
use crate::crypto::SerialNumberSource;
use crate::models::{Certificate, CertificateRequest, CertificateSubject, Signatory, User};
use crate::service::{CertificateService, IssuanceSettings};
use crate::state::{AppState, AuthConfig};
use crate::storage::{AuditDispatcher, AuditWorker, CaDatabase, UserDirectory};

pub const TEST_JWT_SECRET: &str = "test-secret-for-router-tests";

/// Key password used by every fixture certificate.
pub const TEST_KEY_PASSWORD: &str = "edcc550504ad1e531a5a008644932355";

/// Sign an HS256 bearer token for `principal`, valid for an hour.
pub fn issue_token(principal: &Principal, secret: &str) -> String {
    let claims = TokenClaims {
        sub: principal.user_id.clone(),
        account_id: principal.account_id.clone(),
        role: Some(principal.role.to_string()),
        exp: chrono::Utc::now().timestamp() + 3600,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// A certificate request with a fast 1024-bit RSA key.
pub fn certificate_request(name: &str, certificate_type: &str, signatory: Option<Signatory>) -> CertificateRequest {
    let mut options = serde_json::Map::new();
    options.insert("keySize".to_string(), serde_json::json!(1024));

    CertificateRequest {
        name: name.to_string(),
        subject: CertificateSubject {
            common_name: format!("{name}.example.com"),
            country: "NL".into(),
            organization: "Example Org".into(),
            email: "pki@example.com".into(),
            ..Default::default()
        },
        certificate_type: certificate_type.to_string(),
        algorithm: "RSA".to_string(),
        password: TEST_KEY_PASSWORD.to_string(),
        options,
        signatory,
        expires_in_days: 0,
    }
}

pub fn signatory(certificate: &Certificate) -> Option<Signatory> {
    Some(Signatory {
        id: certificate.id.clone(),
        password: TEST_KEY_PASSWORD.to_string(),
    })
}

/// A database in a temp dir, the service over it, and the audit worker that
/// a test drains with [`TestEnv::flush_audit`].
pub struct TestEnv {
    pub db: Arc<CaDatabase>,
    pub state: AppState,
    worker: Option<AuditWorker>,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(CaDatabase::open(&dir.path().join("test.redb")).unwrap());
        let (dispatcher, worker) = AuditDispatcher::channel(db.clone());

        let settings = IssuanceSettings {
            default_rsa_key_size: 1024,
            ..Default::default()
        };
        let service = CertificateService::new(db.clone(), dispatcher, SerialNumberSource::seeded(7), settings);
        let auth_config = AuthConfig {
            secret: Some(TEST_JWT_SECRET.to_string()),
            issuer: None,
        };

        Self {
            state: AppState::new(service, db.clone(), auth_config),
            db,
            worker: Some(worker),
            _dir: dir,
        }
    }

    pub fn service(&self) -> &CertificateService {
        &self.state.service
    }

    /// Store a user in `account_id` and return its principal.
    pub fn add_user(&self, account_id: &str) -> Principal {
        let user = User::new(format!("{account_id}@example.com"), Role::User, account_id);
        self.db.save_user(&user).unwrap();
        Principal::new(user.id, account_id, Role::User)
    }

    pub fn issue(&self, principal: &Principal, request: &CertificateRequest) -> Certificate {
        self.service().create(principal, request).unwrap()
    }

    /// Write every audit event dispatched so far. Call at most once.
    pub async fn flush_audit(&mut self) {
        if let Some(worker) = self.worker.take() {
            let shutdown = CancellationToken::new();
            shutdown.cancel();
            worker.run(shutdown).await;
        }
    }
}
