// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error types shared by the issuance engine and the HTTP layer.
//!
//! [`CaError`] carries the semantic outcome of an engine operation. The API
//! layer converts it into an [`ApiError`], which decides the HTTP status and
//! the message a caller is allowed to see.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StoreError;

/// Semantic error kinds returned by every engine operation.
#[derive(Debug, thiserror::Error)]
pub enum CaError {
    /// Request rejected before any work was done (weak password, unsupported
    /// algorithm or type, wrong signatory type, nothing to export...).
    #[error("{0}")]
    Validation(String),

    /// Referenced certificate or private key does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The principal has no stored identity, or the export password is wrong.
    #[error("{0}")]
    Unauthenticated(String),

    /// The principal's account does not own the resource.
    #[error("{0}")]
    AccessDenied(String),

    /// A required signatory certificate or its key pair does not exist yet.
    #[error("{0}")]
    Precondition(String),

    /// Certificate name already used within the account.
    #[error("{0}")]
    Conflict(String),

    /// Cryptographic or persistence failure. The message is for logs only.
    #[error("internal failure: {0}")]
    Internal(String),
}

impl CaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<StoreError> for CaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName { name, .. } => {
                CaError::Conflict(format!("a certificate named {name} already exists"))
            }
            other => CaError::Internal(other.to_string()),
        }
    }
}

pub type CaResult<T> = Result<T, CaError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<CaError> for ApiError {
    fn from(err: CaError) -> Self {
        match err {
            CaError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            CaError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            CaError::Unauthenticated(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            CaError::AccessDenied(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            CaError::Precondition(msg) => Self::new(StatusCode::PRECONDITION_REQUIRED, msg),
            CaError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            CaError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed with internal error");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
