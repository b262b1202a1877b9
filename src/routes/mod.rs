use axum::extract::multipart::Field;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderValue;
use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequest, Request},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub mod audit;
pub mod certifications;
pub mod citizens;
pub mod delivery;
pub mod documents;
pub mod fingerprints;
pub mod health;

const MAX_BODY_BYTES: usize = 1024 * 1024 * 64;

/// Everything outside the RFC 5987 `attr-char` set.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

pub fn create_router(state: AppState) -> Router<()> {
    let cors = match state.config.cors_allowed_origin.as_ref() {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(err) => {
                        warn!(origin = value, error = %err, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(headers))
        }
        None => CorsLayer::new().allow_origin(AllowOrigin::mirror_request()),
    }
    .allow_methods(AllowMethods::mirror_request())
    .allow_headers(AllowHeaders::mirror_request())
    .allow_credentials(true);

    let citizens_routes = Router::new()
        .route(
            "/",
            get(citizens::list_citizens).post(citizens::register_citizen),
        )
        .route(
            "/national/:national_id",
            get(citizens::get_citizen_by_national_id),
        )
        .route(
            "/:id",
            get(citizens::get_citizen)
                .patch(citizens::update_citizen)
                .delete(citizens::delete_citizen),
        );

    let fingerprints_routes = Router::new()
        .route(
            "/",
            get(fingerprints::list_fingerprints).post(fingerprints::enroll_fingerprint),
        )
        .route("/verify", post(fingerprints::verify_fingerprint))
        .route(
            "/citizen/:citizen_id",
            get(fingerprints::get_fingerprint_by_citizen)
                .put(fingerprints::update_fingerprint)
                .delete(fingerprints::clear_fingerprint),
        );

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::register_document),
        )
        .route("/upload", post(documents::upload_document))
        .route("/external", post(documents::register_external_document))
        .route(
            "/:id",
            get(documents::get_document)
                .patch(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/:id/toggle", post(documents::toggle_document))
        .route("/:id/download", get(delivery::download_document));

    let certifications_routes = Router::new()
        .route(
            "/",
            get(certifications::list_certifications).post(certifications::certify),
        )
        .route(
            "/:id",
            get(certifications::get_certification).delete(certifications::delete_certification),
        )
        .route("/:id/revoke", post(certifications::revoke_certification))
        .route(
            "/:id/download",
            get(certifications::download_certified_document),
        )
        .route("/:id/print", get(certifications::print_certified_document));

    let drive_routes = Router::new()
        .route("/:file_id", get(delivery::proxy_drive_file))
        .route("/:file_id/metadata", get(delivery::drive_file_metadata));

    Router::new()
        .nest("/api/citizens", citizens_routes)
        .nest("/api/fingerprints", fingerprints_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/certifications", certifications_routes)
        .nest("/api/drive", drive_routes)
        .route("/api/delivery/email", post(delivery::email_document))
        .route("/api/stamp", post(delivery::stamp_document))
        .route("/api/audit", get(audit::list_audit_entries))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// JSON body extractor whose rejections use the error envelope.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

pub(crate) fn parse_id(raw: &str, label: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::validation(format!("{label} must be a valid UUID")))
}

pub(crate) fn content_disposition(disposition: &str, filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' | '\r' | '\n' => '_',
            _ => ch,
        })
        .collect();
    let encoded = utf8_percent_encode(&sanitized, FILENAME_ENCODE_SET);
    format!("{disposition}; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

pub(crate) async fn field_bytes(field: Field<'_>) -> AppResult<Vec<u8>> {
    let name = field.name().unwrap_or_default().to_string();
    field.bytes().await.map(|data| data.to_vec()).map_err(|err| {
        error!(field = %name, error = %err, "failed to read multipart field");
        AppError::validation(format!("failed to read field {name}: {err}"))
    })
}

pub(crate) async fn field_text(field: Field<'_>) -> AppResult<String> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map(|value| value.trim().to_string())
        .map_err(|err| AppError::validation(format!("invalid value for {name}: {err}")))
}

pub(crate) fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    error!(error = %err, "invalid multipart data");
    AppError::validation(format!("invalid multipart data: {err}"))
}
