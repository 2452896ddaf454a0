// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain and API Data Models
//!
//! Stored records ([`KeyPair`], [`Certificate`], [`User`],
//! [`CertificateTypeRecord`]) and the request/response shapes of the
//! certificate API. Stored records are never serialized to API clients
//! directly: [`CertificateResponse`] is the outward view of a certificate and
//! key pairs only leave the engine as a private-key [`Attachment`].
//!
//! ## Model Categories
//!
//! - **Key material**: [`KeyPair`] (sealed, as persisted) and
//!   [`PlaintextKeyPair`] (transient, in-memory only)
//! - **Certificates**: [`Certificate`], [`CertificateSubject`], [`CertificateType`]
//! - **Requests**: [`CertificateRequest`], [`Signatory`], [`CertificateFilter`]
//! - **Responses**: [`CertificatePage`], [`CertificateOptions`], [`Attachment`]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::auth::Role;
use crate::error::{CaError, CaResult};

/// Encoding tag for keys and certificate bodies.
pub const PEM_FORMAT: &str = "PEM";

/// Content type of every downloadable attachment.
pub const TEXT_PLAIN: &str = "text/plain";

// =============================================================================
// Certificate Types
// =============================================================================

/// Authority level of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateType {
    RootCa,
    IntermediateCa,
    UserCertificate,
}

impl CertificateType {
    pub const ALL: [CertificateType; 3] = [
        CertificateType::RootCa,
        CertificateType::IntermediateCa,
        CertificateType::UserCertificate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::RootCa => "ROOT_CA",
            CertificateType::IntermediateCa => "INTERMEDIATE_CA",
            CertificateType::UserCertificate => "USER_CERTIFICATE",
        }
    }

    /// Whether certificates of this type may sign other certificates.
    pub fn can_sign(&self) -> bool {
        matches!(self, CertificateType::RootCa | CertificateType::IntermediateCa)
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateType {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CertificateType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CaError::validation(format!("unsupported certificate type: {s}")))
    }
}

/// Reference data describing which certificate types are offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateTypeRecord {
    pub name: CertificateType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Key Pairs
// =============================================================================

/// Password verification material, independent of the encryption salt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Base64 PBKDF2 digest of the key password.
    pub password_hash: String,
    /// Base64 salt used for `password_hash` only.
    pub salt: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// A key pair as persisted: the private key is always ciphertext.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub id: String,
    /// PEM-encoded public key (plaintext).
    pub public_key: String,
    /// Base64 of `nonce || AES-256-GCM(private key PEM)`.
    pub private_key: String,
    pub format: String,
    pub algorithm: String,
    /// Base64 salt fed to the key-encryption-key derivation.
    pub encryption_salt: String,
    pub credentials: Credentials,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("algorithm", &self.algorithm)
            .field("account_id", &self.account_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// A freshly generated or freshly decrypted key pair.
///
/// Lives only on the stack of a single engine call; the private key is wiped
/// on drop.
pub struct PlaintextKeyPair {
    pub id: String,
    pub public_key: String,
    pub private_key: Zeroizing<String>,
    pub format: String,
    pub algorithm: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for PlaintextKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaintextKeyPair")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Certificates
// =============================================================================

/// Distinguished-name fields of a certificate subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateSubject {
    pub common_name: String,
    pub country: String,
    pub state: String,
    pub locality: String,
    pub organization: String,
    pub organizational_unit: String,
    pub email: String,
}

/// An issued certificate as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    /// Unique within the owning account.
    pub name: String,
    pub serial_number: i64,
    pub subject: CertificateSubject,
    /// Signed certificate, PEM-encoded.
    pub body: String,
    pub format: String,
    #[serde(rename = "type")]
    pub certificate_type: CertificateType,
    /// Absent if and only if `certificate_type` is `ROOT_CA`.
    pub signatory_id: Option<String>,
    pub key_pair_id: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Certificate {
    pub fn is_root(&self) -> bool {
        self.certificate_type == CertificateType::RootCa
    }
}

/// Certificate view returned to API clients (never includes the key pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub id: String,
    pub name: String,
    pub serial_number: i64,
    pub subject: CertificateSubject,
    pub body: String,
    pub format: String,
    #[serde(rename = "type")]
    pub certificate_type: CertificateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatory_id: Option<String>,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Certificate> for CertificateResponse {
    fn from(cert: Certificate) -> Self {
        Self {
            id: cert.id,
            name: cert.name,
            serial_number: cert.serial_number,
            subject: cert.subject,
            body: cert.body,
            format: cert.format,
            certificate_type: cert.certificate_type,
            signatory_id: cert.signatory_id,
            account_id: cert.account_id,
            created_at: cert.created_at,
            expires_at: cert.expires_at,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A stored identity that principals are resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, role: Role, account_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            role,
            account_id: account_id.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Certificate that should sign a new certificate, unlocked by its password.
#[derive(Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Signatory {
    pub id: String,
    pub password: String,
}

impl fmt::Debug for Signatory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signatory")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Request to issue a new certificate.
#[derive(Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateRequest {
    pub name: String,
    pub subject: CertificateSubject,
    /// One of `ROOT_CA`, `INTERMEDIATE_CA`, `USER_CERTIFICATE`.
    #[serde(rename = "type")]
    pub certificate_type: String,
    /// Key algorithm tag, e.g. `RSA`.
    pub algorithm: String,
    /// Password protecting the new private key.
    pub password: String,
    /// Algorithm parameters, e.g. `{"keySize": 2048}`.
    #[schema(value_type = Object)]
    pub options: serde_json::Map<String, serde_json::Value>,
    /// Required unless `type` is `ROOT_CA`.
    pub signatory: Option<Signatory>,
    /// Validity window; 0 selects the default.
    pub expires_in_days: u32,
}

impl fmt::Debug for CertificateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateRequest")
            .field("name", &self.name)
            .field("type", &self.certificate_type)
            .field("algorithm", &self.algorithm)
            .field("signatory", &self.signatory)
            .field("expires_in_days", &self.expires_in_days)
            .finish_non_exhaustive()
    }
}

impl CertificateRequest {
    /// Check the shape of the request and resolve its certificate type.
    ///
    /// Runs before any cryptographic work.
    pub fn validate(&self) -> CaResult<CertificateType> {
        if self.name.trim().is_empty() {
            return Err(CaError::validation("certificate name is required"));
        }
        if self.name.chars().any(char::is_control) {
            return Err(CaError::validation("certificate name must not contain control characters"));
        }
        if self.expires_in_days != 0 {
            validity_end(Utc::now(), self.expires_in_days)?;
        }

        let certificate_type: CertificateType = self.certificate_type.parse()?;
        if certificate_type == CertificateType::RootCa {
            return Ok(certificate_type);
        }

        match &self.signatory {
            Some(s) if !s.id.is_empty() && !s.password.is_empty() => Ok(certificate_type),
            Some(s) if s.id.is_empty() => Err(CaError::validation(format!(
                "signatory id is required for {certificate_type}"
            ))),
            Some(_) => Err(CaError::validation("signatory password is required")),
            None => Err(CaError::validation(format!(
                "a signatory is required for {certificate_type}"
            ))),
        }
    }
}

/// Latest `notAfter` an X.509 GeneralizedTime can carry.
pub fn latest_expiry() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|t| t.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// End of a validity window of `days` starting at `start`.
pub fn validity_end(start: DateTime<Utc>, days: u32) -> CaResult<DateTime<Utc>> {
    Duration::try_days(i64::from(days))
        .and_then(|window| start.checked_add_signed(window))
        .filter(|end| *end <= latest_expiry())
        .ok_or_else(|| CaError::validation(format!("expiresInDays {days} ends after year 9999")))
}

/// Listing filter for an account's certificates.
#[derive(Debug, Clone, Default)]
pub struct CertificateFilter {
    pub account_id: String,
    /// Empty means all types.
    pub types: Vec<CertificateType>,
}

// =============================================================================
// Responses
// =============================================================================

/// A page of certificates. Listing currently returns everything on one page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePage {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub results_per_page: usize,
    pub results: Vec<CertificateResponse>,
}

impl CertificatePage {
    pub fn single(results: Vec<CertificateResponse>) -> Self {
        let total = results.len();
        Self {
            current_page: 1,
            total_pages: 1,
            total_results: total,
            results_per_page: total,
            results,
        }
    }
}

/// Options a client may pick from when requesting a certificate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CertificateOptions {
    pub types: Vec<CertificateTypeRecord>,
    pub algorithms: Vec<String>,
    pub formats: Vec<String>,
}

/// A downloadable text attachment.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub body: String,
    pub filename: String,
    pub content_type: String,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl Attachment {
    pub fn text(body: String, filename: String) -> Self {
        Self {
            body,
            filename,
            content_type: TEXT_PLAIN.to_string(),
        }
    }
}

/// Build the download filename for a certificate artefact.
///
/// Lowercase `{name}.{category}.{format}` with spaces and underscores
/// replaced by hyphens.
pub fn attachment_filename(name: &str, category: &str, format: &str) -> String {
    format!("{name}.{category}.{format}")
        .to_lowercase()
        .replace(['_', ' '], "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(certificate_type: &str, signatory: Option<Signatory>) -> CertificateRequest {
        CertificateRequest {
            name: "test-cert".into(),
            certificate_type: certificate_type.into(),
            algorithm: "RSA".into(),
            password: "a-long-enough-password".into(),
            signatory,
            ..Default::default()
        }
    }

    #[test]
    fn certificate_type_round_trips_through_strings() {
        for t in CertificateType::ALL {
            assert_eq!(t.as_str().parse::<CertificateType>().unwrap(), t);
            assert_eq!(serde_json::to_string(&t).unwrap(), format!("\"{t}\""));
        }
        assert!(matches!(
            "ODD_TYPE".parse::<CertificateType>(),
            Err(CaError::Validation(_))
        ));
    }

    #[test]
    fn only_authorities_can_sign() {
        assert!(CertificateType::RootCa.can_sign());
        assert!(CertificateType::IntermediateCa.can_sign());
        assert!(!CertificateType::UserCertificate.can_sign());
    }

    #[test]
    fn root_request_needs_no_signatory() {
        assert_eq!(request("ROOT_CA", None).validate().unwrap(), CertificateType::RootCa);
    }

    #[test]
    fn non_root_request_needs_signatory_id_and_password() {
        assert!(request("INTERMEDIATE_CA", None).validate().is_err());

        let missing_id = Signatory {
            id: String::new(),
            password: "some-password".into(),
        };
        assert!(matches!(
            request("INTERMEDIATE_CA", Some(missing_id)).validate(),
            Err(CaError::Validation(_))
        ));

        let missing_password = Signatory {
            id: "root-id".into(),
            password: String::new(),
        };
        assert!(matches!(
            request("USER_CERTIFICATE", Some(missing_password)).validate(),
            Err(CaError::Validation(_))
        ));

        let ok = Signatory {
            id: "root-id".into(),
            password: "root-password".into(),
        };
        assert_eq!(
            request("USER_CERTIFICATE", Some(ok)).validate().unwrap(),
            CertificateType::UserCertificate
        );
    }

    #[test]
    fn request_rejects_blank_name_and_unknown_type() {
        let mut blank = request("ROOT_CA", None);
        blank.name = "  ".into();
        assert!(blank.validate().is_err());
        assert!(request("ODD_TYPE", None).validate().is_err());
    }

    #[test]
    fn request_rejects_control_characters_in_name() {
        let mut multiline = request("ROOT_CA", None);
        multiline.name = "line\nbreak".into();
        assert!(matches!(multiline.validate(), Err(CaError::Validation(_))));

        let mut quoted = request("ROOT_CA", None);
        quoted.name = "evil\"; filename=\"x.sh".into();
        assert!(quoted.validate().is_ok());
    }

    #[test]
    fn validity_beyond_year_9999_is_rejected() {
        let mut overflowing = request("ROOT_CA", None);
        overflowing.expires_in_days = u32::MAX;
        assert!(matches!(overflowing.validate(), Err(CaError::Validation(_))));

        let mut far = request("ROOT_CA", None);
        far.expires_in_days = 3_000_000;
        assert!(matches!(far.validate(), Err(CaError::Validation(_))));

        let mut decade = request("ROOT_CA", None);
        decade.expires_in_days = 3650;
        assert!(decade.validate().is_ok());
    }

    #[test]
    fn validity_end_stops_at_generalized_time_limit() {
        let start = NaiveDate::from_ymd_opt(9999, 12, 30)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
            .and_utc();
        assert_eq!(validity_end(start, 1).unwrap(), start + Duration::days(1));
        assert!(validity_end(start, 2).is_err());
        assert!(latest_expiry() < DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn request_deserializes_camel_case() {
        let json = r#"{
            "name": "root-ca",
            "subject": {"commonName": "Test Root", "organizationalUnit": "Eng"},
            "type": "ROOT_CA",
            "algorithm": "RSA",
            "password": "edcc550504ad1e531a5a008644932355",
            "options": {"keySize": 2048},
            "expiresInDays": 30
        }"#;
        let req: CertificateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.subject.common_name, "Test Root");
        assert_eq!(req.subject.organizational_unit, "Eng");
        assert_eq!(req.options["keySize"], 2048);
        assert_eq!(req.expires_in_days, 30);
        assert!(req.signatory.is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let req = request(
            "INTERMEDIATE_CA",
            Some(Signatory {
                id: "root".into(),
                password: "signatory-secret".into(),
            }),
        );
        let rendered = format!("{req:?}");
        assert!(!rendered.contains("a-long-enough-password"));
        assert!(!rendered.contains("signatory-secret"));
    }

    #[test]
    fn attachment_filename_is_normalized() {
        assert_eq!(
            attachment_filename("test-root-ca", "ROOT_CA", "PEM"),
            "test-root-ca.root-ca.pem"
        );
        assert_eq!(
            attachment_filename("My Intermediate_CA", "fullchain", "PEM"),
            "my-intermediate-ca.fullchain.pem"
        );
    }

    #[test]
    fn response_omits_key_pair_reference() {
        let cert = Certificate {
            id: "c1".into(),
            name: "root".into(),
            serial_number: 7,
            subject: CertificateSubject::default(),
            body: "pem".into(),
            format: PEM_FORMAT.into(),
            certificate_type: CertificateType::RootCa,
            signatory_id: None,
            key_pair_id: "kp1".into(),
            account_id: "acc".into(),
            created_at: Utc::now(),
            expires_at: Utc::now(),
        };
        let json = serde_json::to_value(CertificateResponse::from(cert)).unwrap();
        assert!(json.get("keyPairId").is_none());
        assert!(json.get("signatoryId").is_none());
        assert_eq!(json["type"], "ROOT_CA");
    }

    #[test]
    fn single_page_reflects_result_count() {
        let page = CertificatePage::single(Vec::new());
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_results, 0);
    }
}
