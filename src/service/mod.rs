// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Issuance Engine
//!
//! - [`access`] - account ownership checks against stored users
//! - [`chain`] - signatory resolution and chain traversal
//! - [`certificates`] - the [`CertificateService`] every API handler calls

pub mod access;
pub mod certificates;
pub mod chain;

pub use access::{AccessGuard, AccountAccessGuard, AccountOwned};
pub use certificates::{CertificateService, IssuanceSettings, DEFAULT_VALIDITY_DAYS};
pub use chain::ChainResolver;

#[cfg(test)]
mod tests;
