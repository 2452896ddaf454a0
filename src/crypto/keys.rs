// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key material generation.
//!
//! A [`KeyMaterialGenerator`] produces [`KeyEncoder`]s for one algorithm tag.
//! The [`KeyGeneratorRegistry`] maps tags to generators so the issuance path
//! never names a concrete algorithm.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde_json::{Map, Value};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CaError, CaResult};
use crate::models::{PlaintextKeyPair, PEM_FORMAT};

pub const RSA_ALGORITHM: &str = "RSA";

/// Modulus size used when a request carries no `keySize` option.
pub const DEFAULT_RSA_KEY_SIZE: usize = 2048;

/// Smallest modulus that can carry a PKCS#1 v1.5 SHA-256 signature.
pub const MIN_RSA_KEY_SIZE: usize = 512;

/// Option carrying the RSA modulus size in bits.
pub const KEY_SIZE_OPTION: &str = "keySize";

/// An asymmetric key pair that can be encoded for custody and used to sign.
pub trait KeyEncoder: Send + Sync {
    /// Algorithm tag, e.g. `RSA`.
    fn algorithm(&self) -> &'static str;

    /// Public key as SPKI PEM.
    fn public_key(&self) -> CaResult<String>;

    /// Private key as PKCS#8 PEM. Wiped when the returned value is dropped.
    fn private_key(&self) -> CaResult<Zeroizing<String>>;

    /// Signing handle understood by the certificate builder.
    fn signing_key(&self) -> CaResult<rcgen::KeyPair>;

    /// Produce a plaintext record ready to be handed to the key custodian.
    fn encode(&self) -> CaResult<PlaintextKeyPair> {
        Ok(PlaintextKeyPair {
            id: uuid::Uuid::new_v4().to_string(),
            public_key: self.public_key()?,
            private_key: self.private_key()?,
            format: PEM_FORMAT.to_string(),
            algorithm: self.algorithm().to_string(),
            created_at: Utc::now().trunc_subsecs(0),
        })
    }
}

/// Produces fresh key pairs for a single algorithm.
pub trait KeyMaterialGenerator: Send + Sync {
    fn algorithm(&self) -> &'static str;

    /// Generate a fresh key pair from request options.
    fn generate(&self, options: &Map<String, Value>) -> CaResult<Box<dyn KeyEncoder>>;

    /// Rebuild a key pair from its decrypted private key PEM.
    fn load(&self, private_key_pem: &str) -> CaResult<Box<dyn KeyEncoder>>;
}

// =============================================================================
// RSA
// =============================================================================

#[derive(Debug, Clone)]
pub struct RsaKeyGenerator {
    default_key_size: usize,
}

impl RsaKeyGenerator {
    pub fn new(default_key_size: usize) -> Self {
        Self { default_key_size }
    }

    fn key_size(&self, options: &Map<String, Value>) -> CaResult<usize> {
        let Some(value) = options.get(KEY_SIZE_OPTION) else {
            return Ok(self.default_key_size);
        };

        let bits = value
            .as_u64()
            .filter(|bits| *bits > 0)
            .ok_or_else(|| CaError::validation("keySize must be a positive integer"))?;
        let bits = usize::try_from(bits)
            .map_err(|_| CaError::validation(format!("keySize {bits} is out of range")))?;

        if bits < MIN_RSA_KEY_SIZE {
            return Err(CaError::validation(format!(
                "keySize must be at least {MIN_RSA_KEY_SIZE} bits"
            )));
        }
        Ok(bits)
    }
}

impl Default for RsaKeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_RSA_KEY_SIZE)
    }
}

impl KeyMaterialGenerator for RsaKeyGenerator {
    fn algorithm(&self) -> &'static str {
        RSA_ALGORITHM
    }

    fn generate(&self, options: &Map<String, Value>) -> CaResult<Box<dyn KeyEncoder>> {
        let bits = self.key_size(options)?;
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| CaError::internal(format!("rsa key generation failed: {e}")))?;

        tracing::debug!(bits, "Generated RSA key pair");
        Ok(Box::new(RsaKeyEncoder { key }))
    }

    fn load(&self, private_key_pem: &str) -> CaResult<Box<dyn KeyEncoder>> {
        let key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .map_err(|e| CaError::internal(format!("failed to parse rsa private key: {e}")))?;
        Ok(Box::new(RsaKeyEncoder { key }))
    }
}

pub struct RsaKeyEncoder {
    key: RsaPrivateKey,
}

impl KeyEncoder for RsaKeyEncoder {
    fn algorithm(&self) -> &'static str {
        RSA_ALGORITHM
    }

    fn public_key(&self) -> CaResult<String> {
        self.key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CaError::internal(format!("failed to encode rsa public key: {e}")))
    }

    fn private_key(&self) -> CaResult<Zeroizing<String>> {
        self.key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CaError::internal(format!("failed to encode rsa private key: {e}")))
    }

    fn signing_key(&self) -> CaResult<rcgen::KeyPair> {
        let public_key = self
            .key
            .to_public_key()
            .to_pkcs1_der()
            .map_err(|e| CaError::internal(format!("failed to encode rsa public key: {e}")))?
            .as_bytes()
            .to_vec();

        let remote = RsaRemoteKey {
            signing_key: SigningKey::<Sha256>::new(self.key.clone()),
            public_key,
        };
        rcgen::KeyPair::from_remote(Box::new(remote))
            .map_err(|e| CaError::internal(format!("failed to prepare signing key: {e}")))
    }
}

/// PKCS#1 v1.5 SHA-256 signer handed to rcgen.
struct RsaRemoteKey {
    signing_key: SigningKey<Sha256>,
    /// PKCS#1 `RSAPublicKey` DER.
    public_key: Vec<u8>,
}

impl rcgen::RemoteKeyPair for RsaRemoteKey {
    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, rcgen::Error> {
        self.signing_key
            .try_sign(msg)
            .map(|signature| signature.to_vec())
            .map_err(|_| rcgen::Error::RemoteKeyError)
    }

    fn algorithm(&self) -> &'static rcgen::SignatureAlgorithm {
        &rcgen::PKCS_RSA_SHA256
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Generators keyed by algorithm tag.
#[derive(Clone)]
pub struct KeyGeneratorRegistry {
    generators: HashMap<&'static str, Arc<dyn KeyMaterialGenerator>>,
}

impl KeyGeneratorRegistry {
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Registry with every algorithm this build ships.
    pub fn with_defaults(rsa_key_size: usize) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(RsaKeyGenerator::new(rsa_key_size)));
        registry
    }

    pub fn register(&mut self, generator: Arc<dyn KeyMaterialGenerator>) {
        self.generators.insert(generator.algorithm(), generator);
    }

    pub fn generate(&self, algorithm: &str, options: &Map<String, Value>) -> CaResult<Box<dyn KeyEncoder>> {
        self.generators
            .get(algorithm)
            .ok_or_else(|| CaError::validation(format!("unsupported algorithm: {algorithm}")))?
            .generate(options)
    }

    /// Rebuild a decrypted key pair as an encoder.
    pub fn load(&self, key_pair: &PlaintextKeyPair) -> CaResult<Box<dyn KeyEncoder>> {
        self.generators
            .get(key_pair.algorithm.as_str())
            .ok_or_else(|| {
                CaError::internal(format!(
                    "key pair {} uses unregistered algorithm {}",
                    key_pair.id, key_pair.algorithm
                ))
            })?
            .load(&key_pair.private_key)
    }

    /// Registered algorithm tags, sorted.
    pub fn algorithms(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.generators.keys().map(|tag| tag.to_string()).collect();
        tags.sort();
        tags
    }
}

impl Default for KeyGeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults(DEFAULT_RSA_KEY_SIZE)
    }
}
