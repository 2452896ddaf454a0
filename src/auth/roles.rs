// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Account administrator
/// - `User` - Normal account member, can issue and read the account's certificates
/// - `Anonymous` - Unauthenticated session token, no access to certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Account administrator
    Admin,
    /// Normal account member
    User,
    /// Session without an identity
    Anonymous,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User | Role::Anonymous) => true,
            (Role::Anonymous, Role::Anonymous) => true,
            _ => false,
        }
    }

    /// Parse role from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            "ANONYMOUS" => Some(Role::Anonymous),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Tokens without a role claim get the least privilege.
    fn default() -> Self {
        Role::Anonymous
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::User => write!(f, "USER"),
            Role::Anonymous => write!(f, "ANONYMOUS"),
        }
    }
}
