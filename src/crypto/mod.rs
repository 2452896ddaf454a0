// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cryptography
//!
//! - [`keys`] - key generation behind an algorithm registry
//! - [`password`] - key password policy and verification credentials
//! - [`custody`] - encryption of private keys at rest
//! - [`signer`] - certificate templates and signing
//! - [`serial`] - serial number source

pub mod custody;
pub mod keys;
pub mod password;
pub mod serial;
pub mod signer;

pub use custody::{KeyCustodian, UnlockMode};
pub use keys::{KeyEncoder, KeyGeneratorRegistry, KeyMaterialGenerator, RsaKeyGenerator};
pub use password::PasswordPolicy;
pub use serial::SerialNumberSource;
pub use signer::{CertificateSigner, CertificateTemplate, SigningAuthority};
