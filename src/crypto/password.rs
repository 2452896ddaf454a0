// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key password policy and verification credentials.
//!
//! Credentials are a PBKDF2-HMAC-SHA256 digest with their own salt. They are
//! only ever used to check a password and share nothing with the salt that
//! feeds key-encryption-key derivation.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{CaError, CaResult};
use crate::models::Credentials;

/// Default minimum number of characters in a key password.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 12;

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};
const CREDENTIAL_SALT_LEN: usize = 16;
const CREDENTIAL_HASH_LEN: usize = 32;

/// Rules a key password must satisfy before any key is generated.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Reject passwords too weak to protect a private key.
    pub fn allowed(&self, password: &str) -> CaResult<()> {
        if password.trim().is_empty() {
            return Err(CaError::validation("a key password is required"));
        }
        if password.chars().count() < self.min_length {
            return Err(CaError::validation(format!(
                "key password must be at least {} characters",
                self.min_length
            )));
        }
        let mut chars = password.chars();
        if let Some(first) = chars.next() {
            if chars.all(|c| c == first) {
                return Err(CaError::validation(
                    "key password must not repeat a single character",
                ));
            }
        }
        Ok(())
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PASSWORD_LENGTH)
    }
}

/// Derive verification credentials for `password` with a fresh salt.
pub fn hash(password: &str, rng: &SystemRandom) -> CaResult<Credentials> {
    let mut salt = [0u8; CREDENTIAL_SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| CaError::internal("failed to generate credential salt"))?;

    let mut digest = [0u8; CREDENTIAL_HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut digest,
    );

    Ok(Credentials {
        password_hash: Base64::encode_string(&digest),
        salt: Base64::encode_string(&salt),
    })
}

/// Check `password` against stored credentials.
///
/// A mismatch is `Unauthenticated`; unreadable credentials are `Internal`.
pub fn verify(credentials: &Credentials, password: &str) -> CaResult<()> {
    let salt = Base64::decode_vec(&credentials.salt)
        .map_err(|_| CaError::internal("stored credential salt is not valid base64"))?;
    let digest = Base64::decode_vec(&credentials.password_hash)
        .map_err(|_| CaError::internal("stored credential hash is not valid base64"))?;

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &digest,
    )
    .map_err(|_| CaError::unauthenticated("invalid password"))
}
