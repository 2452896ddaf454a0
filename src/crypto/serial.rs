// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate serial numbers.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CaError, CaResult};

/// Source of positive 63-bit serial numbers, injected into the engine.
pub struct SerialNumberSource {
    rng: Mutex<StdRng>,
}

impl SerialNumberSource {
    /// Seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence, for tests and reproducible fixtures.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Next serial number in `1..=i64::MAX`.
    pub fn next(&self) -> CaResult<i64> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| CaError::internal("serial number source lock poisoned"))?;
        Ok(rng.gen_range(1..=i64::MAX))
    }
}
