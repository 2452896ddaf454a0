// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for key pairs, certificates, users and audit events, in a
//! single embedded redb database.
//!
//! ## Layout
//!
//! ```text
//! {DATA_DIR}/
//!   ca.redb   # every table, see `database`
//! ```
//!
//! The engine only talks to the store through the contracts in
//! [`repository`] and [`audit::AuditSink`]. Private keys reach the store as
//! ciphertext; the store never sees plaintext key material.

pub mod audit;
pub mod database;
pub mod repository;

pub use audit::{AuditActivity, AuditDispatcher, AuditEvent, AuditSink, AuditWorker};
pub use database::CaDatabase;
pub use repository::{CertificateStore, KeyStore, UserDirectory};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("certificate name {name} is already used in account {account_id}")]
    DuplicateName { account_id: String, name: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
