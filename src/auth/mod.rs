// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the certificate API.
//!
//! ## Auth Flow
//!
//! 1. The account service issues an HS256 JWT for a logged-in user
//! 2. Clients send `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - Verifies signature, expiry and (optionally) issuer
//!    - Extracts `sub` → `user_id`, `accountId`, `role`
//!
//! A verified token only yields a [`Principal`]. The engine still resolves the
//! principal against stored users before touching account data.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::{Principal, TokenClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use roles::Role;
