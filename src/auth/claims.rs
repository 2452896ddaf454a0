// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the authenticated principal.

use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Claims carried by an API bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Account the user belongs to
    #[serde(default)]
    pub account_id: String,
    /// Role name, see [`Role::parse`]
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// The authenticated caller of an engine operation.
///
/// A principal is only a claim: the engine still resolves `user_id` against
/// stored users before trusting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub account_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, account_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            account_id: account_id.into(),
            role,
        }
    }

    pub fn from_claims(claims: TokenClaims) -> Self {
        let role = claims
            .role
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or_default();

        Self {
            user_id: claims.sub,
            account_id: claims.account_id,
            role,
        }
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            sub: "user_123".to_string(),
            account_id: "account_1".to_string(),
            role: Some("USER".to_string()),
            exp: 1700003600,
            iss: None,
        }
    }

    #[test]
    fn from_claims_extracts_identity() {
        let principal = Principal::from_claims(sample_claims());
        assert_eq!(principal.user_id, "user_123");
        assert_eq!(principal.account_id, "account_1");
        assert_eq!(principal.role, Role::User);
    }

    #[test]
    fn missing_role_defaults_to_anonymous() {
        let mut claims = sample_claims();
        claims.role = None;
        let principal = Principal::from_claims(claims);
        assert_eq!(principal.role, Role::Anonymous);
        assert!(!principal.has_role(Role::User));
    }

    #[test]
    fn claims_use_camel_case() {
        let claims: TokenClaims =
            serde_json::from_str(r#"{"sub":"u","accountId":"a","role":"ADMIN","exp":1}"#).unwrap();
        assert_eq!(claims.account_id, "a");
        assert_eq!(Principal::from_claims(claims).role, Role::Admin);
    }
}
