// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CertificateOptions, CertificatePage, CertificateRequest, CertificateResponse,
        CertificateSubject, CertificateType, CertificateTypeRecord, Signatory,
    },
    state::AppState,
};

pub mod certificates;
pub mod health;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/certificates",
            get(certificates::list_certificates).post(certificates::create_certificate),
        )
        .route("/certificates/{certificate_id}", get(certificates::get_certificate))
        .route(
            "/certificates/{certificate_id}/body",
            get(certificates::get_certificate_body),
        )
        .route(
            "/certificates/{certificate_id}/private-key",
            post(certificates::get_certificate_private_key),
        )
        .route(
            "/certificate-options",
            get(certificates::get_certificate_options),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        certificates::create_certificate,
        certificates::list_certificates,
        certificates::get_certificate,
        certificates::get_certificate_body,
        certificates::get_certificate_private_key,
        certificates::get_certificate_options
    ),
    components(
        schemas(
            CertificateRequest,
            CertificateResponse,
            CertificateSubject,
            CertificateType,
            CertificateTypeRecord,
            CertificatePage,
            CertificateOptions,
            Signatory,
            certificates::PrivateKeyRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Certificates", description = "Certificate issuance and key export"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
