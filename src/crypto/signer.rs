// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! X.509 template assembly and signing.
//!
//! | Type               | CA  | Key usage                     | Extended key usage      |
//! |--------------------|-----|-------------------------------|-------------------------|
//! | `ROOT_CA`          | no  | not set                       | not set                 |
//! | `INTERMEDIATE_CA`  | yes | DigitalSignature, KeyCertSign | ClientAuth, ServerAuth  |
//! | `USER_CERTIFICATE` | no  | DigitalSignature              | ClientAuth, ServerAuth  |

use chrono::{DateTime, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose, SerialNumber,
};
use time::OffsetDateTime;

use super::keys::KeyEncoder;
use crate::error::{CaError, CaResult};
use crate::models::{Certificate, CertificateSubject, CertificateType};

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";

/// PKCS#9 emailAddress.
const EMAIL_ADDRESS_OID: [u64; 7] = [1, 2, 840, 113549, 1, 9, 1];

/// Fields of the certificate being issued.
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    pub certificate_type: CertificateType,
    pub subject: CertificateSubject,
    pub serial_number: i64,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Key that signs a new certificate.
pub enum SigningAuthority {
    /// The certificate's own key (roots).
    SelfSigned,
    /// A stored CA certificate and its unlocked key.
    Signatory {
        certificate: Certificate,
        key: Box<dyn KeyEncoder>,
    },
}

impl SigningAuthority {
    pub fn signatory_id(&self) -> Option<&str> {
        match self {
            SigningAuthority::SelfSigned => None,
            SigningAuthority::Signatory { certificate, .. } => Some(&certificate.id),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CertificateSigner;

impl CertificateSigner {
    /// Sign the template for `subject_key` and return the PEM body.
    pub fn sign(
        &self,
        template: &CertificateTemplate,
        subject_key: &dyn KeyEncoder,
        authority: &SigningAuthority,
    ) -> CaResult<String> {
        let params = certificate_params(template)?;
        let subject_key_pair = subject_key.signing_key()?;

        let certificate = match authority {
            SigningAuthority::SelfSigned => params.self_signed(&subject_key_pair),
            SigningAuthority::Signatory { certificate, key } => {
                let issuer_key_pair = key.signing_key()?;
                let issuer = CertificateParams::from_ca_cert_pem(&certificate.body)
                    .and_then(|issuer_params| issuer_params.self_signed(&issuer_key_pair))
                    .map_err(|e| {
                        CaError::internal(format!(
                            "failed to load signatory certificate {}: {e}",
                            certificate.id
                        ))
                    })?;
                params.signed_by(&subject_key_pair, &issuer, &issuer_key_pair)
            }
        }
        .map_err(|e| CaError::internal(format!("certificate signing failed: {e}")))?;

        let block = pem::Pem::new(PEM_CERTIFICATE_TAG, certificate.der().as_ref().to_vec());
        Ok(pem::encode_config(
            &block,
            pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
        ))
    }
}

fn certificate_params(template: &CertificateTemplate) -> CaResult<CertificateParams> {
    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(&template.subject);

    let serial = u64::try_from(template.serial_number)
        .ok()
        .filter(|serial| *serial > 0)
        .ok_or_else(|| CaError::internal("serial number must be positive"))?;
    params.serial_number = Some(SerialNumber::from(serial));
    params.not_before = to_offset(template.not_before)?;
    params.not_after = to_offset(template.not_after)?;

    match template.certificate_type {
        CertificateType::RootCa => {}
        CertificateType::IntermediateCa => {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
            params.key_usages = vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyCertSign,
            ];
            params.extended_key_usages = vec![
                ExtendedKeyUsagePurpose::ClientAuth,
                ExtendedKeyUsagePurpose::ServerAuth,
            ];
        }
        CertificateType::UserCertificate => {
            params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
            params.extended_key_usages = vec![
                ExtendedKeyUsagePurpose::ClientAuth,
                ExtendedKeyUsagePurpose::ServerAuth,
            ];
        }
    }

    Ok(params)
}

fn distinguished_name(subject: &CertificateSubject) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    let fields = [
        (DnType::CommonName, &subject.common_name),
        (DnType::CountryName, &subject.country),
        (DnType::StateOrProvinceName, &subject.state),
        (DnType::LocalityName, &subject.locality),
        (DnType::OrganizationName, &subject.organization),
        (DnType::OrganizationalUnitName, &subject.organizational_unit),
        (DnType::CustomDnType(EMAIL_ADDRESS_OID.to_vec()), &subject.email),
    ];
    for (ty, value) in fields {
        if !value.is_empty() {
            dn.push(ty, value.as_str());
        }
    }
    dn
}

fn to_offset(at: DateTime<Utc>) -> CaResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| CaError::internal(format!("validity timestamp out of range: {e}")))
}
