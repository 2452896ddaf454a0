// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Store contracts consumed by the issuance engine.
//!
//! Every method is synchronous: callers on the async runtime go through
//! `spawn_blocking`.

use super::StoreResult;
use crate::models::{Certificate, CertificateType, CertificateTypeRecord, KeyPair, User};

/// Certificates and the reference data describing them.
pub trait CertificateStore: Send + Sync {
    /// Persist a key pair and its certificate atomically.
    ///
    /// Fails with [`super::StoreError::DuplicateName`] if the account already
    /// has a certificate with the same name; nothing is written in that case.
    fn save_issued(&self, key_pair: &KeyPair, certificate: &Certificate) -> StoreResult<()>;

    fn find_certificate(&self, id: &str) -> StoreResult<Option<Certificate>>;

    fn find_by_name(&self, account_id: &str, name: &str) -> StoreResult<Option<Certificate>>;

    /// All certificates of an account, oldest first.
    fn find_by_account(&self, account_id: &str) -> StoreResult<Vec<Certificate>>;

    /// Certificates of an account whose type is one of `types`, oldest first.
    fn find_by_account_and_types(
        &self,
        account_id: &str,
        types: &[CertificateType],
    ) -> StoreResult<Vec<Certificate>>;

    /// Certificate types currently offered.
    fn find_active_types(&self) -> StoreResult<Vec<CertificateTypeRecord>>;
}

/// Sealed key pairs.
pub trait KeyStore: Send + Sync {
    fn find_key_pair(&self, id: &str) -> StoreResult<Option<KeyPair>>;
}

/// Stored identities that authenticated principals resolve to.
pub trait UserDirectory: Send + Sync {
    fn save_user(&self, user: &User) -> StoreResult<()>;

    fn find_user(&self, id: &str) -> StoreResult<Option<User>>;
}
