// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated principals.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal is Principal
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::{AuthError, Principal, Role, TokenClaims};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for principals allowed to work with certificates.
///
/// Rejects missing or invalid tokens with 401 and anonymous sessions with 403.
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = match parts.extensions.get::<Principal>().cloned() {
            Some(principal) => principal,
            None => {
                let auth_header = parts
                    .headers
                    .get(AUTHORIZATION)
                    .ok_or(AuthError::MissingAuthHeader)?
                    .to_str()
                    .map_err(|_| AuthError::InvalidAuthHeader)?;

                let token = auth_header
                    .strip_prefix("Bearer ")
                    .ok_or(AuthError::InvalidAuthHeader)?;

                verify_token(token, &state.auth_config)?
            }
        };

        if !principal.has_role(Role::User) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(Auth(principal))
    }
}

/// Verify a bearer token and extract the principal.
pub fn verify_token(token: &str, config: &AuthConfig) -> Result<Principal, AuthError> {
    match config.secret.as_deref() {
        Some(secret) => verify_signed(token, secret, config.issuer.as_deref()),
        None => verify_unsigned(token),
    }
}

fn verify_signed(token: &str, secret: &str, issuer: Option<&str>) -> Result<Principal, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        _ => AuthError::MalformedToken,
    })?;

    Ok(Principal::from_claims(token_data.claims))
}

/// Development token decoding (no signature check).
///
/// WARNING: only compiled with the `dev` feature.
#[cfg(feature = "dev")]
fn verify_unsigned(token: &str) -> Result<Principal, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;

    let now = chrono::Utc::now().timestamp();
    if token_data.claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(Principal::from_claims(token_data.claims))
}

#[cfg(not(feature = "dev"))]
fn verify_unsigned(_token: &str) -> Result<Principal, AuthError> {
    Err(AuthError::Misconfigured(
        "token secret is not configured".to_string(),
    ))
}
