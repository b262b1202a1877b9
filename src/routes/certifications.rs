use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::citizens::CitizenResponse;
use super::delivery::file_response;
use super::documents::DocumentResponse;
use super::{parse_id, to_iso, ApiJson};
use crate::certification::CertifyRequest;
use crate::delivery::attachment_filename;
use crate::envelope::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::format::{sniff_format, ContentKind};
use crate::models::Certification;
use crate::state::AppState;
use crate::store::CertificationFilter;
use crate::utils::pagination::PageRequest;

#[derive(Deserialize)]
pub struct CertifyPayload {
    pub citizen_id: String,
    pub document_id: String,
    #[serde(alias = "fingerprint")]
    pub fingerprint_template: String,
    #[serde(default)]
    pub stamp_details: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CertificationListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub citizen_id: Option<String>,
    pub document_id: Option<String>,
}

#[derive(Serialize)]
pub struct CertificationResponse {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub document_id: Uuid,
    pub approved: bool,
    pub certified_reference: String,
    pub stamp_details: String,
    pub output_format: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Certification> for CertificationResponse {
    fn from(certification: Certification) -> Self {
        Self {
            id: certification.id,
            citizen_id: certification.citizen_id,
            document_id: certification.document_id,
            approved: certification.approved,
            certified_reference: certification.certified_reference,
            stamp_details: certification.stamp_details,
            output_format: certification.output_format,
            created_at: to_iso(certification.created_at),
            updated_at: to_iso(certification.updated_at),
        }
    }
}

/// Certification with the citizen and document as they are now. Either
/// snapshot is absent when the referenced record was deleted.
#[derive(Serialize)]
pub struct CertificationDetailResponse {
    pub certification: CertificationResponse,
    pub citizen: Option<CitizenResponse>,
    pub document: Option<DocumentResponse>,
}

#[derive(Serialize)]
pub struct PrintResponse {
    pub certification_id: Uuid,
    pub certified_reference: String,
    pub output_format: String,
    pub approved: bool,
    pub document_type: Option<String>,
    pub citizen_name: Option<String>,
}

fn find_certification(state: &AppState, raw_id: &str) -> AppResult<Certification> {
    let id = parse_id(raw_id, "certification id")?;
    state
        .store
        .find_certification(id)?
        .ok_or_else(|| AppError::not_found("certification not found"))
}

pub async fn certify(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CertifyPayload>,
) -> AppResult<(StatusCode, Json<ApiResponse<CertificationDetailResponse>>)> {
    let request = CertifyRequest {
        citizen_id: parse_id(&payload.citizen_id, "citizen_id")?,
        document_id: parse_id(&payload.document_id, "document_id")?,
        fingerprint_template: payload.fingerprint_template,
        stamp_details: payload.stamp_details.unwrap_or_default(),
        output_format: payload.output_format,
    };
    let outcome = state.certification.certify(request)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "document certified successfully",
            CertificationDetailResponse {
                certification: outcome.certification.into(),
                citizen: Some(outcome.citizen.into()),
                document: Some(outcome.document.into()),
            },
        )),
    ))
}

pub async fn list_certifications(
    State(state): State<AppState>,
    Query(query): Query<CertificationListQuery>,
) -> AppResult<Json<ApiResponse<Vec<CertificationResponse>>>> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref());
    let optional_id = |raw: &Option<String>, label: &str| -> AppResult<Option<Uuid>> {
        match raw.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => parse_id(value, label).map(Some),
            None => Ok(None),
        }
    };
    let filter = CertificationFilter {
        citizen_id: optional_id(&query.citizen_id, "citizen_id")?,
        document_id: optional_id(&query.document_id, "document_id")?,
    };

    let (certifications, total) = state.store.list_certifications(&filter, page)?;
    Ok(Json(ApiResponse::paginated(
        "certifications retrieved",
        certifications
            .into_iter()
            .map(CertificationResponse::from)
            .collect(),
        page.pagination(total),
    )))
}

pub async fn get_certification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<CertificationDetailResponse>>> {
    let certification = find_certification(&state, &id)?;
    let citizen = state.store.find_citizen(certification.citizen_id)?;
    let document = state.store.find_document(certification.document_id)?;

    Ok(Json(ApiResponse::success(
        "certification retrieved",
        CertificationDetailResponse {
            certification: certification.into(),
            citizen: citizen.map(CitizenResponse::from),
            document: document.map(DocumentResponse::from),
        },
    )))
}

pub async fn revoke_certification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<CertificationResponse>>> {
    let id = parse_id(&id, "certification id")?;
    let certification = state.certification.revoke(id)?;
    Ok(Json(ApiResponse::success(
        "certification revoked",
        certification.into(),
    )))
}

pub async fn delete_certification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id, "certification id")?;
    state.certification.delete(id)?;
    Ok(Json(ApiResponse::empty("certification deleted successfully")))
}

/// Streams the certified document. Raster sources are rendered with the
/// certification stamp; anything else is returned as stored.
pub async fn download_certified_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let certification = find_certification(&state, &id)?;
    if !certification.approved {
        return Err(AppError::invalid_state("certification has been revoked"));
    }
    let document = state
        .store
        .find_document(certification.document_id)?
        .ok_or_else(|| AppError::not_found("certified document no longer exists"))?;

    let payload = state.sources.fetch(&document.reference_url).await?;
    let kind = sniff_format(&payload).or_pdf();
    let (bytes, kind) = if kind.is_stampable() {
        let pdf = state
            .renderer()
            .convert_image_to_pdf_with_stamp(payload, kind, &document.document_type)
            .await?;
        (pdf, ContentKind::Pdf)
    } else {
        (payload, kind)
    };

    info!(
        certification_id = %certification.id,
        document_id = %document.id,
        bytes = bytes.len(),
        "certified document downloaded"
    );
    let filename = attachment_filename(
        &document.document_type,
        &certification.id.to_string(),
        kind,
    );
    file_response(bytes, kind.mime_type(), &filename, "attachment")
}

pub async fn print_certified_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<PrintResponse>>> {
    let certification = find_certification(&state, &id)?;
    let document = state.store.find_document(certification.document_id)?;
    let citizen = state.store.find_citizen(certification.citizen_id)?;

    Ok(Json(ApiResponse::success(
        "certification ready for printing",
        PrintResponse {
            certification_id: certification.id,
            certified_reference: certification.certified_reference,
            output_format: certification.output_format,
            approved: certification.approved,
            document_type: document.map(|document| document.document_type),
            citizen_name: citizen.map(|citizen| citizen.full_name()),
        },
    )))
}
