// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Certificate Service
//!
//! Issuance and every read path over certificates and their keys.
//!
//! ## Issuance
//!
//! 1. Reject weak key passwords and malformed requests
//! 2. Resolve the principal to a stored user
//! 3. Generate key material for the requested algorithm
//! 4. Seal the new private key under the request password
//! 5. Resolve the signing key (self for roots, unlocked signatory otherwise)
//! 6. Sign the certificate
//! 7. Persist key pair and certificate in one transaction
//! 8. Audit `CREATE` for both
//!
//! Plaintext key material lives only on the stack of a single call.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};

use super::access::{check_owned, AccessGuard, AccountAccessGuard};
use super::chain::ChainResolver;
use crate::auth::Principal;
use crate::crypto::keys::DEFAULT_RSA_KEY_SIZE;
use crate::crypto::{
    CertificateSigner, CertificateTemplate, KeyCustodian, KeyGeneratorRegistry, PasswordPolicy,
    SerialNumberSource,
};
use crate::error::{CaError, CaResult};
use crate::models::{
    attachment_filename, validity_end, Attachment, Certificate, CertificateFilter,
    CertificateOptions, CertificatePage, CertificateRequest, CertificateResponse, PEM_FORMAT,
};
use crate::storage::audit::{
    certificate_body_resource, certificate_resource, key_pair_resource, private_key_resource,
};
use crate::storage::{AuditDispatcher, AuditEvent, AuditSink, CaDatabase, CertificateStore, KeyStore};

/// Validity window when a request leaves `expiresInDays` at 0.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

const FULLCHAIN_CATEGORY: &str = "fullchain";
const PRIVATE_KEY_CATEGORY: &str = "private-key";

/// Issuance policy knobs.
#[derive(Debug, Clone)]
pub struct IssuanceSettings {
    pub password_policy: PasswordPolicy,
    pub default_validity_days: u32,
    pub default_rsa_key_size: usize,
}

impl Default for IssuanceSettings {
    fn default() -> Self {
        Self {
            password_policy: PasswordPolicy::default(),
            default_validity_days: DEFAULT_VALIDITY_DAYS,
            default_rsa_key_size: DEFAULT_RSA_KEY_SIZE,
        }
    }
}

pub struct CertificateService {
    certificates: Arc<dyn CertificateStore>,
    keys: Arc<dyn KeyStore>,
    access: Arc<dyn AccessGuard>,
    audit: Arc<dyn AuditSink>,
    background_audit: AuditDispatcher,
    custodian: Arc<KeyCustodian>,
    generators: Arc<KeyGeneratorRegistry>,
    chain: ChainResolver,
    signer: CertificateSigner,
    serials: SerialNumberSource,
    settings: IssuanceSettings,
}

impl CertificateService {
    /// Wire the service to a single database for every store contract.
    pub fn new(
        db: Arc<CaDatabase>,
        background_audit: AuditDispatcher,
        serials: SerialNumberSource,
        settings: IssuanceSettings,
    ) -> Self {
        let certificates: Arc<dyn CertificateStore> = db.clone();
        let keys: Arc<dyn KeyStore> = db.clone();
        let access: Arc<dyn AccessGuard> = Arc::new(AccountAccessGuard::new(db.clone()));
        let audit: Arc<dyn AuditSink> = db;
        let custodian = Arc::new(KeyCustodian::new());
        let generators = Arc::new(KeyGeneratorRegistry::with_defaults(
            settings.default_rsa_key_size,
        ));

        let chain = ChainResolver::new(
            certificates.clone(),
            keys.clone(),
            access.clone(),
            custodian.clone(),
            generators.clone(),
        );

        Self {
            certificates,
            keys,
            access,
            audit,
            background_audit,
            custodian,
            generators,
            chain,
            signer: CertificateSigner,
            serials,
            settings,
        }
    }

    // =========================================================================
    // Issuance
    // =========================================================================

    /// Issue a certificate and its sealed key pair.
    pub fn create(&self, principal: &Principal, request: &CertificateRequest) -> CaResult<Certificate> {
        self.settings.password_policy.allowed(&request.password)?;
        let certificate_type = request.validate()?;

        let user = self.access.resolve_user(principal)?;
        if self.certificates.find_by_name(&user.account_id, &request.name)?.is_some() {
            return Err(CaError::Conflict(format!(
                "a certificate named {} already exists",
                request.name
            )));
        }

        let created_at = Utc::now().trunc_subsecs(0);
        let validity_days = match request.expires_in_days {
            0 => self.settings.default_validity_days,
            days => days,
        };
        let expires_at = validity_end(created_at, validity_days)?;

        let keys = self.generators.generate(&request.algorithm, &request.options)?;
        let plaintext = keys.encode()?;
        let key_pair = self
            .custodian
            .encrypt(&plaintext, &request.password, &user.account_id)?;
        drop(plaintext);

        let authority = self.chain.resolve_signing_authority(
            principal,
            certificate_type,
            request.signatory.as_ref(),
        )?;

        let template = CertificateTemplate {
            certificate_type,
            subject: request.subject.clone(),
            serial_number: self.serials.next()?,
            not_before: created_at,
            not_after: expires_at,
        };
        let body = self.signer.sign(&template, keys.as_ref(), &authority)?;

        let certificate = Certificate {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.clone(),
            serial_number: template.serial_number,
            subject: template.subject,
            body,
            format: PEM_FORMAT.to_string(),
            certificate_type,
            signatory_id: authority.signatory_id().map(str::to_string),
            key_pair_id: key_pair.id.clone(),
            account_id: user.account_id.clone(),
            created_at,
            expires_at,
        };

        self.certificates.save_issued(&key_pair, &certificate)?;

        self.audit(AuditEvent::create(&user.id, certificate_resource(&certificate.id)))?;
        self.audit(AuditEvent::create(&user.id, key_pair_resource(&key_pair.id)))?;

        tracing::info!(
            certificate_id = %certificate.id,
            certificate_type = %certificate.certificate_type,
            account_id = %certificate.account_id,
            signatory_id = ?certificate.signatory_id,
            "Issued certificate"
        );

        Ok(certificate)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_certificate(&self, principal: &Principal, id: &str) -> CaResult<Certificate> {
        let certificate = self.find_owned_certificate(principal, id)?;
        self.audit(AuditEvent::read(&principal.user_id, certificate_resource(&certificate.id)))?;
        Ok(certificate)
    }

    /// All certificates of an account on a single page.
    ///
    /// Read events for the listed certificates are written in the background.
    pub fn get_certificates(&self, principal: &Principal, filter: &CertificateFilter) -> CaResult<CertificatePage> {
        if filter.account_id.is_empty() {
            return Err(CaError::validation("accountId is required"));
        }
        self.access.assert_account_access(principal, &filter.account_id)?;

        let certificates = if filter.types.is_empty() {
            self.certificates.find_by_account(&filter.account_id)?
        } else {
            self.certificates
                .find_by_account_and_types(&filter.account_id, &filter.types)?
        };

        self.background_audit.dispatch(
            certificates
                .iter()
                .map(|c| AuditEvent::read(&principal.user_id, certificate_resource(&c.id)))
                .collect(),
        );

        Ok(CertificatePage::single(
            certificates.into_iter().map(CertificateResponse::from).collect(),
        ))
    }

    pub fn get_options(&self) -> CaResult<CertificateOptions> {
        Ok(CertificateOptions {
            types: self.certificates.find_active_types()?,
            algorithms: self.generators.algorithms(),
            formats: vec![PEM_FORMAT.to_string()],
        })
    }

    /// The certificate body, or with `fullchain` every body from the
    /// certificate up to (excluding) its root.
    pub fn get_certificate_body(&self, principal: &Principal, id: &str, fullchain: bool) -> CaResult<Attachment> {
        if fullchain {
            return self.get_certificate_chain_body(principal, id);
        }

        let certificate = self.find_owned_certificate(principal, id)?;
        self.audit(AuditEvent::read(&principal.user_id, certificate_body_resource(&certificate.id)))?;

        let filename = attachment_filename(
            &certificate.name,
            certificate.certificate_type.as_str(),
            &certificate.format,
        );
        Ok(Attachment::text(certificate.body, filename))
    }

    fn get_certificate_chain_body(&self, principal: &Principal, id: &str) -> CaResult<Attachment> {
        let chain = self.chain.resolve_chain(principal, id)?;
        let Some(leaf) = chain.first() else {
            return Err(CaError::validation(format!(
                "no certificate chain exists for certificate {id}"
            )));
        };
        let filename = attachment_filename(&leaf.name, FULLCHAIN_CATEGORY, &leaf.format);

        let mut body = String::new();
        for certificate in &chain {
            body.push_str(&certificate.body);
            self.audit(AuditEvent::read(&principal.user_id, certificate_body_resource(&certificate.id)))?;
        }

        Ok(Attachment::text(body, filename))
    }

    /// Export a certificate's private key after verifying its password.
    pub fn get_certificate_private_key(&self, principal: &Principal, id: &str, password: &str) -> CaResult<Attachment> {
        if password.is_empty() {
            return Err(CaError::validation("password is required"));
        }

        let certificate = self.find_owned_certificate(principal, id)?;
        let key_pair = self
            .keys
            .find_key_pair(&certificate.key_pair_id)?
            .ok_or_else(|| CaError::not_found(format!("key pair does not exist for certificate {id}")))?;
        let key_pair = check_owned(self.access.as_ref(), principal, key_pair)?;

        let plaintext = match self.custodian.unlock_for_export(&key_pair, password) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                if matches!(e, CaError::Unauthenticated(_)) {
                    let event = AuditEvent::read(&principal.user_id, private_key_resource(&key_pair.id))
                        .failed("invalid password");
                    if let Err(audit_err) = self.audit.log(&event) {
                        tracing::warn!(error = %audit_err, "Failed to audit rejected key export");
                    }
                }
                return Err(e);
            }
        };

        self.audit(AuditEvent::read(&principal.user_id, private_key_resource(&key_pair.id)))?;
        tracing::info!(
            certificate_id = %certificate.id,
            key_pair_id = %key_pair.id,
            "Exported private key"
        );

        let filename = attachment_filename(&certificate.name, PRIVATE_KEY_CATEGORY, &plaintext.format);
        Ok(Attachment::text(plaintext.private_key.to_string(), filename))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn find_owned_certificate(&self, principal: &Principal, id: &str) -> CaResult<Certificate> {
        let certificate = self
            .certificates
            .find_certificate(id)?
            .ok_or_else(|| CaError::not_found(format!("certificate with id {id} does not exist")))?;
        check_owned(self.access.as_ref(), principal, certificate)
    }

    fn audit(&self, event: AuditEvent) -> CaResult<()> {
        self.audit
            .log(&event)
            .map_err(|e| CaError::internal(format!("failed to write audit event for {}: {e}", event.resource)))
    }
}
