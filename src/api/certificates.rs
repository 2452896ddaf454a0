// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate API endpoints.
//!
//! Thin adapters over [`CertificateService`]: every handler authenticates the
//! caller, moves the engine call onto the blocking pool (key generation and
//! signing are CPU-bound), and maps engine errors to HTTP statuses.

use std::fmt::{self, Write};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Auth,
    error::{ApiError, CaResult},
    models::{
        Attachment, CertificateFilter, CertificateOptions, CertificatePage, CertificateRequest,
        CertificateResponse, CertificateType,
    },
    service::CertificateService,
    state::AppState,
};

/// Query parameters for listing certificates.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListCertificatesQuery {
    /// Account whose certificates are listed.
    pub account_id: Option<String>,
    /// Comma-separated certificate types, e.g. `ROOT_CA,INTERMEDIATE_CA`.
    pub types: Option<String>,
}

impl ListCertificatesQuery {
    fn into_filter(self) -> CaResult<CertificateFilter> {
        let types = self
            .types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::parse::<CertificateType>)
            .collect::<CaResult<Vec<_>>>()?;

        Ok(CertificateFilter {
            account_id: self.account_id.unwrap_or_default(),
            types,
        })
    }
}

/// Query parameters for downloading a certificate body.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CertificateBodyQuery {
    /// Concatenate the bodies up to (excluding) the root.
    #[serde(default)]
    pub fullchain: bool,
}

/// Password that unlocks a certificate's private key for export.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct PrivateKeyRequest {
    pub password: String,
}

impl fmt::Debug for PrivateKeyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyRequest").finish_non_exhaustive()
    }
}

/// Run an engine call on the blocking pool.
async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&CertificateService) -> CaResult<T> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || call(service.as_ref()))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Certificate task failed");
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

/// `Content-Disposition` value carrying `filename` as a quoted ASCII
/// fallback and as an RFC 5987 `filename*` parameter.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len());
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn attachment_response(attachment: Attachment) -> Response {
    let disposition = content_disposition(&attachment.filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        attachment.body,
    )
        .into_response()
}

/// Issue a certificate and its password-protected key pair.
///
/// Root certificates sign themselves; every other type needs a signatory
/// certificate from the caller's account and that certificate's password.
#[utoipa::path(
    post,
    path = "/v1/certificates",
    tag = "Certificates",
    security(("bearer_auth" = [])),
    request_body = CertificateRequest,
    responses(
        (status = 201, description = "Certificate issued", body = CertificateResponse),
        (status = 400, description = "Invalid request or weak password"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Signatory belongs to another account"),
        (status = 409, description = "Certificate name already used"),
        (status = 428, description = "Signatory does not exist"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_certificate(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CertificateRequest>,
) -> Result<(StatusCode, Json<CertificateResponse>), ApiError> {
    let certificate = run_blocking(&state, move |service| service.create(&user, &request)).await?;
    Ok((StatusCode::CREATED, Json(certificate.into())))
}

/// List the certificates of an account.
#[utoipa::path(
    get,
    path = "/v1/certificates",
    tag = "Certificates",
    security(("bearer_auth" = [])),
    params(ListCertificatesQuery),
    responses(
        (status = 200, description = "Certificates of the account", body = CertificatePage),
        (status = 400, description = "Missing account or unknown type"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account belongs to someone else")
    )
)]
pub async fn list_certificates(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<ListCertificatesQuery>,
) -> Result<Json<CertificatePage>, ApiError> {
    let filter = query.into_filter()?;
    let page = run_blocking(&state, move |service| service.get_certificates(&user, &filter)).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/v1/certificates/{certificate_id}",
    tag = "Certificates",
    security(("bearer_auth" = [])),
    params(("certificate_id" = String, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Certificate", body = CertificateResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Certificate belongs to another account"),
        (status = 404, description = "Certificate not found")
    )
)]
pub async fn get_certificate(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateResponse>, ApiError> {
    let certificate = run_blocking(&state, move |service| {
        service.get_certificate(&user, &certificate_id)
    })
    .await?;
    Ok(Json(certificate.into()))
}

/// Download a certificate body, or its chain with `fullchain=true`.
#[utoipa::path(
    get,
    path = "/v1/certificates/{certificate_id}/body",
    tag = "Certificates",
    security(("bearer_auth" = [])),
    params(
        ("certificate_id" = String, Path, description = "Certificate ID"),
        CertificateBodyQuery
    ),
    responses(
        (status = 200, description = "PEM attachment", body = String, content_type = "text/plain"),
        (status = 400, description = "No chain to export"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Certificate belongs to another account"),
        (status = 404, description = "Certificate not found")
    )
)]
pub async fn get_certificate_body(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
    Query(query): Query<CertificateBodyQuery>,
) -> Result<Response, ApiError> {
    let attachment = run_blocking(&state, move |service| {
        service.get_certificate_body(&user, &certificate_id, query.fullchain)
    })
    .await?;
    Ok(attachment_response(attachment))
}

/// Export a certificate's private key.
///
/// The password is the one given when the certificate was issued.
#[utoipa::path(
    post,
    path = "/v1/certificates/{certificate_id}/private-key",
    tag = "Certificates",
    security(("bearer_auth" = [])),
    params(("certificate_id" = String, Path, description = "Certificate ID")),
    request_body = PrivateKeyRequest,
    responses(
        (status = 200, description = "PEM attachment", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing password"),
        (status = 401, description = "Unauthorized or wrong password"),
        (status = 403, description = "Certificate belongs to another account"),
        (status = 404, description = "Certificate or key not found")
    )
)]
pub async fn get_certificate_private_key(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
    Json(request): Json<PrivateKeyRequest>,
) -> Result<Response, ApiError> {
    let attachment = run_blocking(&state, move |service| {
        service.get_certificate_private_key(&user, &certificate_id, &request.password)
    })
    .await?;
    Ok(attachment_response(attachment))
}

/// Certificate types, key algorithms and formats a request may use.
#[utoipa::path(
    get,
    path = "/v1/certificate-options",
    tag = "Certificates",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Available options", body = CertificateOptions),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_certificate_options(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<CertificateOptions>, ApiError> {
    let options = run_blocking(&state, |service| service.get_options()).await?;
    Ok(Json(options))
}
