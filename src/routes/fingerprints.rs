use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::citizens::CitizenResponse;
use super::{parse_id, to_iso, ApiJson};
use crate::audit;
use crate::envelope::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::models::{Fingerprint, NewFingerprint};
use crate::state::AppState;
use crate::utils::pagination::ListQuery;

#[derive(Deserialize)]
pub struct EnrollFingerprintRequest {
    pub citizen_id: String,
    pub template: String,
}

#[derive(Deserialize)]
pub struct TemplateRequest {
    pub template: String,
}

#[derive(Serialize)]
pub struct FingerprintResponse {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub template: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Fingerprint> for FingerprintResponse {
    fn from(fingerprint: Fingerprint) -> Self {
        Self {
            id: fingerprint.id,
            citizen_id: fingerprint.citizen_id,
            template: fingerprint.template,
            created_at: to_iso(fingerprint.created_at),
            updated_at: to_iso(fingerprint.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct VerificationResponse {
    pub matched: bool,
    pub fingerprint_id: Uuid,
    pub citizen: CitizenResponse,
}

fn required_template(template: &str) -> AppResult<String> {
    if template.is_empty() {
        return Err(AppError::validation("template is required"));
    }
    Ok(template.to_string())
}

pub async fn enroll_fingerprint(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EnrollFingerprintRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<FingerprintResponse>>)> {
    let citizen_id = parse_id(&payload.citizen_id, "citizen_id")?;
    let template = required_template(&payload.template)?;

    let citizen = state
        .store
        .find_citizen(citizen_id)?
        .ok_or_else(|| AppError::not_found("citizen not found"))?;

    if state
        .store
        .find_fingerprint_by_citizen(citizen.id)?
        .is_some()
    {
        return Err(AppError::conflict(
            "fingerprint already enrolled for this citizen",
        ));
    }

    let fingerprint = state.store.insert_fingerprint(NewFingerprint {
        id: Uuid::new_v4(),
        citizen_id: citizen.id,
        template,
    })?;

    info!(citizen_id = %citizen.id, "fingerprint enrolled");
    audit::record(
        state.store.as_ref(),
        audit::FINGERPRINT_ENROLLED,
        format!("Fingerprint enrolled for {}", citizen.full_name()),
        citizen.id.to_string(),
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "fingerprint enrolled successfully",
            fingerprint.into(),
        )),
    ))
}

/// Identifies the citizen whose enrolled template the matcher accepts.
pub async fn verify_fingerprint(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TemplateRequest>,
) -> AppResult<Json<ApiResponse<VerificationResponse>>> {
    let template = required_template(&payload.template)?;
    let matched = if state.matcher.is_exact() {
        state.store.find_fingerprint_by_template(&template)?
    } else {
        // Fuzzy matchers have to see every enrollment; cost grows with the table.
        let enrolled = state.store.all_fingerprints()?;
        state.matcher.identify(&enrolled, &template).cloned()
    };
    let matched =
        matched.ok_or_else(|| AppError::not_found("no citizen matches this fingerprint"))?;

    let citizen = match state.store.find_citizen(matched.citizen_id)? {
        Some(citizen) => citizen,
        None => {
            warn!(citizen_id = %matched.citizen_id, "fingerprint references a missing citizen");
            return Err(AppError::not_found("no citizen matches this fingerprint"));
        }
    };

    Ok(Json(ApiResponse::success(
        "fingerprint verified",
        VerificationResponse {
            matched: true,
            fingerprint_id: matched.id,
            citizen: citizen.into(),
        },
    )))
}

pub async fn get_fingerprint_by_citizen(
    State(state): State<AppState>,
    Path(citizen_id): Path<String>,
) -> AppResult<Json<ApiResponse<FingerprintResponse>>> {
    let citizen_id = parse_id(&citizen_id, "citizen_id")?;
    let fingerprint = state
        .store
        .find_fingerprint_by_citizen(citizen_id)?
        .ok_or_else(|| AppError::not_found("no fingerprint enrolled for this citizen"))?;
    Ok(Json(ApiResponse::success(
        "fingerprint retrieved",
        fingerprint.into(),
    )))
}

pub async fn list_fingerprints(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<FingerprintResponse>>>> {
    let page = query.page_request();
    let (fingerprints, total) = state.store.list_fingerprints(page)?;
    Ok(Json(ApiResponse::paginated(
        "fingerprints retrieved",
        fingerprints.into_iter().map(FingerprintResponse::from).collect(),
        page.pagination(total),
    )))
}

pub async fn update_fingerprint(
    State(state): State<AppState>,
    Path(citizen_id): Path<String>,
    ApiJson(payload): ApiJson<TemplateRequest>,
) -> AppResult<Json<ApiResponse<FingerprintResponse>>> {
    let citizen_id = parse_id(&citizen_id, "citizen_id")?;
    let template = required_template(&payload.template)?;
    let fingerprint = state
        .store
        .update_fingerprint(citizen_id, template, Utc::now().naive_utc())?
        .ok_or_else(|| AppError::not_found("no fingerprint enrolled for this citizen"))?;
    info!(citizen_id = %citizen_id, "fingerprint updated");
    Ok(Json(ApiResponse::success(
        "fingerprint updated successfully",
        fingerprint.into(),
    )))
}

pub async fn clear_fingerprint(
    State(state): State<AppState>,
    Path(citizen_id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let citizen_id = parse_id(&citizen_id, "citizen_id")?;
    if !state.store.delete_fingerprint(citizen_id)? {
        return Err(AppError::not_found("no fingerprint enrolled for this citizen"));
    }
    info!(citizen_id = %citizen_id, "fingerprint cleared");
    Ok(Json(ApiResponse::empty("fingerprint cleared successfully")))
}
