// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody CA - Self-hosted Certificate Authority
//!
//! Issues root, intermediate and user certificates and keeps every generated
//! private key encrypted at rest under a password chosen by the requester.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token authentication
//! - `crypto` - Key generation, key custody, certificate signing
//! - `service` - Issuance engine and read paths
//! - `storage` - Embedded database and audit log (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod service;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
