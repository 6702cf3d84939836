//! # Admission Webhook
//!
//! HTTP transport for the validating webhooks.
//!
//! Provides endpoints:
//! - `POST /validate-v1-secret` - Secret create/update
//! - `POST /validate-compliance-security-local-v1alpha1-secretpolicy` - SecretPolicy create/update
//!
//! Both take and return `admission.k8s.io/v1` `AdmissionReview` objects.
//! The server listens on `WEBHOOK_PORT` and serves HTTPS when
//! `WEBHOOK_TLS_CERT_FILE` and `WEBHOOK_TLS_KEY_FILE` are set, plain HTTP
//! otherwise.

use super::{validate_policy, AdmissionDecision, SecretAdmission};
use crate::config::TlsFiles;
use crate::constants::{POLICY_WEBHOOK_PATH, SECRET_WEBHOOK_PATH};
use anyhow::Context;
use crate::crd::SecretPolicy;
use axum::{extract::State, routing::post, Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for the webhook handlers
#[derive(Debug, Clone)]
pub struct WebhookState {
    pub secrets: SecretAdmission,
}

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(SECRET_WEBHOOK_PATH, post(validate_secret_handler))
        .route(POLICY_WEBHOOK_PATH, post(validate_policy_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the webhook routes on `0.0.0.0:port` until the process exits
///
/// With `tls` set the certificate is loaded once at startup.
pub async fn start_webhook_server(
    port: u16,
    tls: Option<TlsFiles>,
    state: Arc<WebhookState>,
) -> Result<(), anyhow::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    match tls {
        Some(files) => {
            let tls_config = load_tls(&files).await?;
            info!("Admission webhook listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            warn!("No webhook certificate configured, serving plain HTTP");
            let listener = TcpListener::bind(addr).await?;
            info!("Admission webhook listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

/// Load the PEM certificate chain and private key into a rustls server config
///
/// # Errors
///
/// Returns an error if either file cannot be read or holds no usable PEM item.
pub async fn load_tls(files: &TlsFiles) -> Result<RustlsConfig, anyhow::Error> {
    RustlsConfig::from_pem_file(&files.cert_path, &files.key_path)
        .await
        .with_context(|| {
            format!(
                "failed to load webhook certificate {} and key {}",
                files.cert_path.display(),
                files.key_path.display()
            )
        })
}

async fn validate_secret_handler(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let response = match request_of(review) {
        Ok(req) => review_secret(&state.secrets, &req).await,
        Err(response) => response,
    };
    Json(response.into_review())
}

async fn validate_policy_handler(
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let response = match request_of(review) {
        Ok(req) => review_policy(&req),
        Err(response) => response,
    };
    Json(response.into_review())
}

fn request_of(
    review: AdmissionReview<DynamicObject>,
) -> Result<AdmissionRequest<DynamicObject>, AdmissionResponse> {
    review.try_into().map_err(|e: kube::core::admission::ConvertAdmissionReviewError| {
        warn!("Invalid admission review: {}", e);
        AdmissionResponse::invalid(e.to_string())
    })
}

/// Answer a Secret admission request
pub async fn review_secret(
    admission: &SecretAdmission,
    req: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let response = AdmissionResponse::from(req);
    if req.kind.kind != "Secret" {
        return errored(
            response,
            500,
            format!("expected a Secret but got {}", req.kind.kind),
        );
    }
    let Some(object) = req.object.as_ref() else {
        return allowed(response, "no object to validate");
    };
    let mut secret: Secret = match decode(object) {
        Ok(secret) => secret,
        Err(e) => return errored(response, 400, format!("failed to decode Secret: {e}")),
    };
    if secret.metadata.namespace.is_none() {
        secret.metadata.namespace.clone_from(&req.namespace);
    }

    match admission.review(&secret).await {
        Ok(AdmissionDecision::Allow { message }) => allowed(response, message),
        Ok(AdmissionDecision::Deny { reason }) => {
            info!(
                secret.namespace = secret.metadata.namespace.as_deref().unwrap_or_default(),
                secret.name = req.name.as_str(),
                "Denied Secret write"
            );
            response.deny(reason)
        }
        Err(e) => {
            warn!("Secret admission failed: {}", e);
            errored(response, 500, e.to_string())
        }
    }
}

/// Answer a SecretPolicy admission request
#[must_use]
pub fn review_policy(req: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    let response = AdmissionResponse::from(req);
    if req.kind.kind != "SecretPolicy" {
        return errored(
            response,
            500,
            format!("expected a SecretPolicy but got {}", req.kind.kind),
        );
    }
    let Some(object) = req.object.as_ref() else {
        return allowed(response, "no object to validate");
    };
    let policy: SecretPolicy = match decode(object) {
        Ok(policy) => policy,
        Err(e) => return errored(response, 400, format!("failed to decode SecretPolicy: {e}")),
    };

    let validation = validate_policy(&policy.spec);
    let mut response = if validation.is_valid() {
        response
    } else {
        response.deny(validation.errors.join("; "))
    };
    if !validation.warnings.is_empty() {
        response.warnings = Some(validation.warnings);
    }
    response
}

fn decode<K: DeserializeOwned>(object: &DynamicObject) -> Result<K, serde_json::Error> {
    serde_json::to_value(object).and_then(serde_json::from_value)
}

fn allowed(mut response: AdmissionResponse, message: impl Into<String>) -> AdmissionResponse {
    response.result.message = message.into();
    response
}

/// Reject with an operational error rather than a policy denial
fn errored(response: AdmissionResponse, code: u16, message: String) -> AdmissionResponse {
    let mut response = response.deny(message);
    response.result.code = code;
    response
}
