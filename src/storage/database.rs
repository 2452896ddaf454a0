// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded certificate database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `key_pairs`: key_pair_id → serialized KeyPair (private key sealed)
//! - `certificates`: certificate_id → serialized Certificate
//! - `certificate_names`: `account|name` → certificate_id (uniqueness)
//! - `account_certificates`: `account|certificate_id` → certificate type
//! - `account_key_pairs`: `account|key_pair_id` → ()
//! - `certificate_types`: type name → serialized CertificateTypeRecord
//! - `users`: user_id → serialized User
//! - `audit_events`: event_id → serialized AuditEvent
//! - `audit_resource_index`: `resource|timestamp|event_id` → event_id

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;

use super::audit::{AuditEvent, AuditSink};
use super::repository::{CertificateStore, KeyStore, UserDirectory};
use super::{StoreError, StoreResult};
use crate::models::{Certificate, CertificateType, CertificateTypeRecord, KeyPair, User};

// =============================================================================
// Table Definitions
// =============================================================================

type RecordTable = TableDefinition<'static, &'static str, &'static [u8]>;

const KEY_PAIRS: RecordTable = TableDefinition::new("key_pairs");

const CERTIFICATES: RecordTable = TableDefinition::new("certificates");

/// `account|name` → certificate_id.
const CERTIFICATE_NAMES: TableDefinition<&str, &str> = TableDefinition::new("certificate_names");

/// `account|certificate_id` → certificate type, for per-account range scans.
const ACCOUNT_CERTIFICATES: TableDefinition<&str, &str> =
    TableDefinition::new("account_certificates");

/// `account|key_pair_id` → ().
const ACCOUNT_KEY_PAIRS: TableDefinition<&str, ()> = TableDefinition::new("account_key_pairs");

const CERTIFICATE_TYPES: RecordTable = TableDefinition::new("certificate_types");

const USERS: RecordTable = TableDefinition::new("users");

const AUDIT_EVENTS: RecordTable = TableDefinition::new("audit_events");

/// `resource|zero-padded micros|event_id` → event_id, oldest first.
const AUDIT_RESOURCE_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("audit_resource_index");

// =============================================================================
// Index Key Helpers
// =============================================================================

fn composite_key(owner: &str, item: &str) -> String {
    format!("{owner}|{item}")
}

/// Half-open range covering every composite key of `owner`.
///
/// `}` sorts directly after `|`, so `owner|..owner}` holds exactly the keys
/// with that prefix.
fn prefix_range(owner: &str) -> (String, String) {
    (format!("{owner}|"), format!("{owner}}}"))
}

fn audit_index_key(event: &AuditEvent) -> String {
    format!(
        "{}|{:020}|{}",
        event.resource,
        event.timestamp.timestamp_micros().max(0),
        event.event_id
    )
}

// =============================================================================
// CaDatabase
// =============================================================================

/// Embedded ACID store for the certificate authority.
pub struct CaDatabase {
    db: Database,
}

impl CaDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(KEY_PAIRS)?;
            let _ = write_txn.open_table(CERTIFICATES)?;
            let _ = write_txn.open_table(CERTIFICATE_NAMES)?;
            let _ = write_txn.open_table(ACCOUNT_CERTIFICATES)?;
            let _ = write_txn.open_table(ACCOUNT_KEY_PAIRS)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
            let _ = write_txn.open_table(AUDIT_RESOURCE_INDEX)?;

            let mut types = write_txn.open_table(CERTIFICATE_TYPES)?;
            let now = Utc::now();
            for certificate_type in CertificateType::ALL {
                if types.get(certificate_type.as_str())?.is_some() {
                    continue;
                }
                let record = CertificateTypeRecord {
                    name: certificate_type,
                    active: true,
                    created_at: now,
                    updated_at: now,
                };
                let json = serde_json::to_vec(&record)?;
                types.insert(certificate_type.as_str(), json.as_slice())?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap round trip used by the readiness probe.
    pub fn check_ready(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(CERTIFICATE_TYPES)?;
        Ok(())
    }

    fn get_record<T: DeserializeOwned>(&self, table: RecordTable, key: &str) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Certificates of an account, optionally restricted to some types.
    fn scan_account_certificates(
        &self,
        account_id: &str,
        types: Option<&[CertificateType]>,
    ) -> StoreResult<Vec<Certificate>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_CERTIFICATES)?;
        let certificates = read_txn.open_table(CERTIFICATES)?;

        let (start, end) = prefix_range(account_id);
        let mut results = Vec::new();
        for entry in index.range(start.as_str()..end.as_str())? {
            let (key, stored_type) = entry?;

            if let Some(types) = types {
                if !types.iter().any(|t| t.as_str() == stored_type.value()) {
                    continue;
                }
            }

            let Some(certificate_id) = key.value().strip_prefix(start.as_str()) else {
                continue;
            };
            match certificates.get(certificate_id)? {
                Some(value) => results.push(serde_json::from_slice::<Certificate>(value.value())?),
                None => tracing::warn!(
                    certificate_id = %certificate_id,
                    account_id = %account_id,
                    "Account index points to a missing certificate"
                ),
            }
        }

        results.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(results)
    }

    /// Audit events recorded for a resource, oldest first.
    pub fn find_audit_events_by_resource(&self, resource: &str) -> StoreResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(AUDIT_RESOURCE_INDEX)?;
        let events = read_txn.open_table(AUDIT_EVENTS)?;

        let (start, end) = prefix_range(resource);
        let mut results = Vec::new();
        for entry in index.range(start.as_str()..end.as_str())? {
            let (_, event_id) = entry?;
            if let Some(value) = events.get(event_id.value())? {
                results.push(serde_json::from_slice::<AuditEvent>(value.value())?);
            }
        }
        Ok(results)
    }

    /// Replace a stored certificate record in place.
    #[cfg(test)]
    pub(crate) fn overwrite_certificate(&self, certificate: &Certificate) -> StoreResult<()> {
        let json = serde_json::to_vec(certificate)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CERTIFICATES)?;
            table.insert(certificate.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(ACCOUNT_CERTIFICATES)?;
            let key = composite_key(&certificate.account_id, &certificate.id);
            index.insert(key.as_str(), certificate.certificate_type.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl CertificateStore for CaDatabase {
    fn save_issued(&self, key_pair: &KeyPair, certificate: &Certificate) -> StoreResult<()> {
        let key_pair_json = serde_json::to_vec(key_pair)?;
        let certificate_json = serde_json::to_vec(certificate)?;
        let name_key = composite_key(&certificate.account_id, &certificate.name);

        let write_txn = self.db.begin_write()?;
        let duplicate = {
            let mut names = write_txn.open_table(CERTIFICATE_NAMES)?;
            if names.get(name_key.as_str())?.is_some() {
                true
            } else {
                names.insert(name_key.as_str(), certificate.id.as_str())?;

                let mut key_pairs = write_txn.open_table(KEY_PAIRS)?;
                key_pairs.insert(key_pair.id.as_str(), key_pair_json.as_slice())?;

                let mut account_key_pairs = write_txn.open_table(ACCOUNT_KEY_PAIRS)?;
                let key = composite_key(&key_pair.account_id, &key_pair.id);
                account_key_pairs.insert(key.as_str(), ())?;

                let mut certificates = write_txn.open_table(CERTIFICATES)?;
                certificates.insert(certificate.id.as_str(), certificate_json.as_slice())?;

                let mut account_certificates = write_txn.open_table(ACCOUNT_CERTIFICATES)?;
                let key = composite_key(&certificate.account_id, &certificate.id);
                account_certificates.insert(key.as_str(), certificate.certificate_type.as_str())?;
                false
            }
        };

        if duplicate {
            write_txn.abort()?;
            return Err(StoreError::DuplicateName {
                account_id: certificate.account_id.clone(),
                name: certificate.name.clone(),
            });
        }

        write_txn.commit()?;
        Ok(())
    }

    fn find_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        self.get_record(CERTIFICATES, id)
    }

    fn find_by_name(&self, account_id: &str, name: &str) -> StoreResult<Option<Certificate>> {
        let certificate_id = {
            let read_txn = self.db.begin_read()?;
            let names = read_txn.open_table(CERTIFICATE_NAMES)?;
            let key = composite_key(account_id, name);
            match names.get(key.as_str())? {
                Some(id) => id.value().to_string(),
                None => return Ok(None),
            }
        };
        self.find_certificate(&certificate_id)
    }

    fn find_by_account(&self, account_id: &str) -> StoreResult<Vec<Certificate>> {
        self.scan_account_certificates(account_id, None)
    }

    fn find_by_account_and_types(
        &self,
        account_id: &str,
        types: &[CertificateType],
    ) -> StoreResult<Vec<Certificate>> {
        self.scan_account_certificates(account_id, Some(types))
    }

    fn find_active_types(&self) -> StoreResult<Vec<CertificateTypeRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CERTIFICATE_TYPES)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: CertificateTypeRecord = serde_json::from_slice(value.value())?;
            if record.active {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl KeyStore for CaDatabase {
    fn find_key_pair(&self, id: &str) -> StoreResult<Option<KeyPair>> {
        self.get_record(KEY_PAIRS, id)
    }
}

#[cfg(test)]
impl CaDatabase {
    /// Key pair belonging to a certificate.
    pub(crate) fn find_key_pair_by_certificate(&self, certificate_id: &str) -> StoreResult<Option<KeyPair>> {
        match self.find_certificate(certificate_id)? {
            Some(certificate) => self.find_key_pair(&certificate.key_pair_id),
            None => Ok(None),
        }
    }

    pub(crate) fn find_key_pairs_by_account(&self, account_id: &str) -> StoreResult<Vec<KeyPair>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_KEY_PAIRS)?;
        let key_pairs = read_txn.open_table(KEY_PAIRS)?;

        let (start, end) = prefix_range(account_id);
        let mut results = Vec::new();
        for entry in index.range(start.as_str()..end.as_str())? {
            let (key, _) = entry?;
            let Some(key_pair_id) = key.value().strip_prefix(start.as_str()) else {
                continue;
            };
            if let Some(value) = key_pairs.get(key_pair_id)? {
                results.push(serde_json::from_slice::<KeyPair>(value.value())?);
            }
        }
        Ok(results)
    }
}

impl UserDirectory for CaDatabase {
    fn save_user(&self, user: &User) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            table.insert(user.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.get_record(USERS, id)
    }
}

impl AuditSink for CaDatabase {
    fn log(&self, event: &AuditEvent) -> StoreResult<()> {
        let json = serde_json::to_vec(event)?;
        let index_key = audit_index_key(event);

        let write_txn = self.db.begin_write()?;
        {
            let mut events = write_txn.open_table(AUDIT_EVENTS)?;
            events.insert(event.event_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(AUDIT_RESOURCE_INDEX)?;
            index.insert(index_key.as_str(), event.event_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
