// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account access enforcement.
//!
//! Every engine operation that returns account data passes through an
//! [`AccessGuard`] first. The guard resolves the principal against stored
//! users, so a validly signed token for a deleted or unknown user is still
//! rejected.

use std::sync::Arc;

use crate::auth::Principal;
use crate::error::{CaError, CaResult};
use crate::models::{Certificate, KeyPair, User};
use crate::storage::UserDirectory;

/// Resources that belong to exactly one account.
pub trait AccountOwned {
    fn owner_account_id(&self) -> &str;
}

impl AccountOwned for Certificate {
    fn owner_account_id(&self) -> &str {
        &self.account_id
    }
}

impl AccountOwned for KeyPair {
    fn owner_account_id(&self) -> &str {
        &self.account_id
    }
}

/// Decides whether a principal may touch an account's data.
pub trait AccessGuard: Send + Sync {
    /// Resolve the stored user behind a principal.
    ///
    /// # Errors
    /// `Unauthenticated` if no such user exists.
    fn resolve_user(&self, principal: &Principal) -> CaResult<User>;

    /// # Errors
    /// `Unauthenticated` for unknown principals, `AccessDenied` when the
    /// principal's account differs from `account_id`.
    fn assert_account_access(&self, principal: &Principal, account_id: &str) -> CaResult<()>;
}

/// Check access to a resource and hand it back.
pub fn check_owned<T: AccountOwned>(guard: &dyn AccessGuard, principal: &Principal, resource: T) -> CaResult<T> {
    guard.assert_account_access(principal, resource.owner_account_id())?;
    Ok(resource)
}

/// Guard backed by the user directory.
///
/// The stored user's account is authoritative; the account claim in the
/// token is not trusted on its own.
pub struct AccountAccessGuard {
    users: Arc<dyn UserDirectory>,
}

impl AccountAccessGuard {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

impl AccessGuard for AccountAccessGuard {
    fn resolve_user(&self, principal: &Principal) -> CaResult<User> {
        self.users.find_user(&principal.user_id)?.ok_or_else(|| {
            tracing::warn!(user_id = %principal.user_id, "Principal has no stored user");
            CaError::unauthenticated(format!("no user found for principal {}", principal.user_id))
        })
    }

    fn assert_account_access(&self, principal: &Principal, account_id: &str) -> CaResult<()> {
        let user = self.resolve_user(principal)?;
        if user.account_id != account_id {
            tracing::warn!(
                user_id = %user.id,
                account_id = %account_id,
                "Account access denied"
            );
            return Err(CaError::access_denied(format!(
                "user {} may not access account {account_id}",
                user.id
            )));
        }
        Ok(())
    }
}
