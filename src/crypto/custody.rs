// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Custody
//!
//! Private keys are stored as AES-256-GCM ciphertext under a key-encryption
//! key derived from the caller's password:
//!
//! ```text
//! kek        = HMAC-SHA256(key = password, msg = encryption_salt)
//! privateKey = base64(nonce || AES-256-GCM(kek, nonce, aad = key_pair.id, pem))
//! ```
//!
//! The record id is bound as associated data, so ciphertext copied onto
//! another key pair record fails to open.
//!
//! Two unlock modes share one primitive:
//!
//! - [`KeyCustodian::unlock_for_export`] verifies the password credentials
//!   first and reports a wrong password as `Unauthenticated`.
//! - [`KeyCustodian::unlock_for_signing`] decrypts directly; any failure,
//!   including a wrong password, is `Internal`.

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::password;
use crate::error::{CaError, CaResult};
use crate::models::{KeyPair, PlaintextKeyPair};

const ENCRYPTION_SALT_LEN: usize = 32;
const KEK_LEN: usize = 32;

/// Whether an unlock must check the password credentials before decrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockMode {
    Export,
    Signing,
}

/// Encrypts and decrypts private keys. Holds no key material between calls.
pub struct KeyCustodian {
    rng: SystemRandom,
}

impl KeyCustodian {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Seal a freshly generated key pair under `password` for `account_id`.
    pub fn encrypt(&self, key_pair: &PlaintextKeyPair, password: &str, account_id: &str) -> CaResult<KeyPair> {
        let credentials = password::hash(password, &self.rng)?;

        let mut salt = [0u8; ENCRYPTION_SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| CaError::internal("failed to generate encryption salt"))?;

        let kek = derive_kek(password, &salt)?;
        let private_key = self.seal(&kek, &key_pair.id, key_pair.private_key.as_bytes())?;

        Ok(KeyPair {
            id: key_pair.id.clone(),
            public_key: key_pair.public_key.clone(),
            private_key,
            format: key_pair.format.clone(),
            algorithm: key_pair.algorithm.clone(),
            encryption_salt: Base64::encode_string(&salt),
            credentials,
            account_id: account_id.to_string(),
            created_at: key_pair.created_at,
        })
    }

    /// Open a stored key pair with `password`, without checking credentials.
    pub fn decrypt(&self, key_pair: &KeyPair, password: &str) -> CaResult<PlaintextKeyPair> {
        let salt = Base64::decode_vec(&key_pair.encryption_salt).map_err(|_| {
            CaError::internal(format!("key pair {} has a malformed encryption salt", key_pair.id))
        })?;
        let sealed = Base64::decode_vec(&key_pair.private_key).map_err(|_| {
            CaError::internal(format!("key pair {} has a malformed ciphertext", key_pair.id))
        })?;

        let kek = derive_kek(password, &salt)?;
        let private_key = open(&kek, &key_pair.id, sealed)?;

        Ok(PlaintextKeyPair {
            id: key_pair.id.clone(),
            public_key: key_pair.public_key.clone(),
            private_key,
            format: key_pair.format.clone(),
            algorithm: key_pair.algorithm.clone(),
            created_at: key_pair.created_at,
        })
    }

    /// Check a password against the key pair's credentials.
    pub fn verify(&self, key_pair: &KeyPair, password: &str) -> CaResult<()> {
        password::verify(&key_pair.credentials, password)
    }

    pub fn unlock(&self, key_pair: &KeyPair, password: &str, mode: UnlockMode) -> CaResult<PlaintextKeyPair> {
        if mode == UnlockMode::Export {
            self.verify(key_pair, password)?;
        }
        self.decrypt(key_pair, password)
    }

    pub fn unlock_for_export(&self, key_pair: &KeyPair, password: &str) -> CaResult<PlaintextKeyPair> {
        self.unlock(key_pair, password, UnlockMode::Export)
    }

    pub fn unlock_for_signing(&self, key_pair: &KeyPair, password: &str) -> CaResult<PlaintextKeyPair> {
        self.unlock(key_pair, password, UnlockMode::Signing)
    }

    fn seal(&self, kek: &[u8; KEK_LEN], key_pair_id: &str, plaintext: &[u8]) -> CaResult<String> {
        let key = aead_key(kek)?;

        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| CaError::internal("failed to generate nonce"))?;

        let mut in_out = Zeroizing::new(plaintext.to_vec());
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(key_pair_id.as_bytes()),
            &mut *in_out,
        )
        .map_err(|_| CaError::internal("private key encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&in_out);
        Ok(Base64::encode_string(&sealed))
    }
}

impl Default for KeyCustodian {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_kek(password: &str, salt: &[u8]) -> CaResult<Zeroizing<[u8; KEK_LEN]>> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(password.as_bytes())
        .map_err(|_| CaError::internal("failed to initialise key derivation"))?;
    mac.update(salt);

    let mut kek = Zeroizing::new([0u8; KEK_LEN]);
    kek.copy_from_slice(&mac.finalize().into_bytes());
    Ok(kek)
}

fn aead_key(kek: &[u8; KEK_LEN]) -> CaResult<LessSafeKey> {
    let unbound = UnboundKey::new(&AES_256_GCM, kek)
        .map_err(|_| CaError::internal("invalid key-encryption key"))?;
    Ok(LessSafeKey::new(unbound))
}

fn open(kek: &[u8; KEK_LEN], key_pair_id: &str, sealed: Vec<u8>) -> CaResult<Zeroizing<String>> {
    if sealed.len() <= NONCE_LEN + AES_256_GCM.tag_len() {
        return Err(CaError::internal(format!(
            "key pair {key_pair_id} ciphertext is truncated"
        )));
    }

    let key = aead_key(kek)?;
    let mut sealed = Zeroizing::new(sealed);
    let (nonce, ciphertext) = sealed.split_at_mut(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce)
        .map_err(|_| CaError::internal("invalid nonce"))?;

    let plaintext = key
        .open_in_place(nonce, Aad::from(key_pair_id.as_bytes()), ciphertext)
        .map_err(|_| CaError::internal(format!("failed to decrypt key pair {key_pair_id}")))?;

    let pem = std::str::from_utf8(plaintext)
        .map_err(|_| CaError::internal(format!("key pair {key_pair_id} is not valid UTF-8")))?;
    Ok(Zeroizing::new(pem.to_string()))
}
