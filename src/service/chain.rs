// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signatory resolution and chain traversal.

use std::collections::HashSet;
use std::sync::Arc;

use super::access::{check_owned, AccessGuard};
use crate::auth::Principal;
use crate::crypto::{KeyCustodian, KeyGeneratorRegistry, SigningAuthority};
use crate::error::{CaError, CaResult};
use crate::models::{Certificate, CertificateType, Signatory};
use crate::storage::{CertificateStore, KeyStore};

pub struct ChainResolver {
    certificates: Arc<dyn CertificateStore>,
    keys: Arc<dyn KeyStore>,
    access: Arc<dyn AccessGuard>,
    custodian: Arc<KeyCustodian>,
    generators: Arc<KeyGeneratorRegistry>,
}

impl ChainResolver {
    pub fn new(
        certificates: Arc<dyn CertificateStore>,
        keys: Arc<dyn KeyStore>,
        access: Arc<dyn AccessGuard>,
        custodian: Arc<KeyCustodian>,
        generators: Arc<KeyGeneratorRegistry>,
    ) -> Self {
        Self {
            certificates,
            keys,
            access,
            custodian,
            generators,
        }
    }

    /// Find the key that signs a new certificate of `certificate_type`.
    ///
    /// Roots sign themselves. Everything else needs a stored `ROOT_CA` or
    /// `INTERMEDIATE_CA` signatory in the principal's account, unlocked with
    /// the signatory password. A wrong signatory password surfaces as
    /// `Internal`, like any other decryption failure.
    pub fn resolve_signing_authority(
        &self,
        principal: &Principal,
        certificate_type: CertificateType,
        signatory: Option<&Signatory>,
    ) -> CaResult<SigningAuthority> {
        if certificate_type == CertificateType::RootCa {
            return Ok(SigningAuthority::SelfSigned);
        }

        let signatory = signatory
            .ok_or_else(|| CaError::validation(format!("a signatory is required for {certificate_type}")))?;

        let certificate = self
            .certificates
            .find_certificate(&signatory.id)?
            .ok_or_else(|| {
                CaError::precondition(format!("signatory certificate {} does not exist", signatory.id))
            })?;
        let certificate = check_owned(self.access.as_ref(), principal, certificate)?;

        if !certificate.certificate_type.can_sign() {
            return Err(CaError::validation(format!(
                "certificate {} of type {} cannot sign other certificates",
                certificate.id, certificate.certificate_type
            )));
        }

        let key_pair = self
            .keys
            .find_key_pair(&certificate.key_pair_id)?
            .ok_or_else(|| {
                CaError::precondition(format!(
                    "key pair of signatory certificate {} does not exist",
                    certificate.id
                ))
            })?;

        let plaintext = self.custodian.unlock_for_signing(&key_pair, &signatory.password)?;
        let key = self.generators.load(&plaintext)?;

        Ok(SigningAuthority::Signatory { certificate, key })
    }

    /// Certificates from `certificate_id` up to, but excluding, its root.
    ///
    /// Each visited certificate, the root included, is access-checked before
    /// traversal continues.
    pub fn resolve_chain(&self, principal: &Principal, certificate_id: &str) -> CaResult<Vec<Certificate>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(certificate_id.to_string());

        while let Some(id) = next {
            if !visited.insert(id.clone()) {
                return Err(CaError::internal(format!(
                    "certificate chain of {certificate_id} loops back to {id}"
                )));
            }

            let certificate = self
                .certificates
                .find_certificate(&id)?
                .ok_or_else(|| CaError::not_found(format!("certificate with id {id} does not exist")))?;
            let certificate = check_owned(self.access.as_ref(), principal, certificate)?;

            if certificate.is_root() {
                break;
            }

            next = certificate.signatory_id.clone();
            chain.push(certificate);
        }

        Ok(chain)
    }
}
