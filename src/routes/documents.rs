use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    content_disposition, field_bytes, field_text, multipart_error, parse_id, to_iso, ApiJson,
};
use crate::audit;
use crate::envelope::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentChangeset, NewDocument};
use crate::sources::drive_view_url;
use crate::state::AppState;
use crate::storage::{storage_key, storage_reference};
use crate::store::DocumentFilter;
use crate::utils::json::{classify_nullable, NullableValue};
use crate::utils::pagination::PageRequest;

pub const SOURCE_GOOGLE_DRIVE: &str = "google_drive";
pub const SOURCE_AWS_S3: &str = "aws_s3";

#[derive(Deserialize)]
pub struct RegisterDocumentRequest {
    pub national_id: i64,
    pub document_type: String,
    pub reference_url: String,
    pub owner_user_id: Option<String>,
    pub content_type: Option<String>,
    pub issue_date: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct ExternalDocumentRequest {
    pub national_id: i64,
    pub document_type: String,
    pub source: String,
    pub document_id: String,
    pub owner_user_id: Option<String>,
    pub issue_date: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct DocumentListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub national_id: Option<String>,
    pub owner_user_id: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub national_id: i64,
    pub owner_user_id: Option<Uuid>,
    pub document_type: String,
    pub reference_url: String,
    pub content_type: Option<String>,
    pub issue_date: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            national_id: document.national_id,
            owner_user_id: document.owner_user_id,
            document_type: document.document_type,
            reference_url: document.reference_url,
            content_type: document.content_type,
            issue_date: document.issue_date.format("%Y-%m-%d").to_string(),
            is_active: document.is_active,
            created_at: to_iso(document.created_at),
            updated_at: to_iso(document.updated_at),
        }
    }
}

fn parse_issue_date(raw: Option<&str>) -> AppResult<NaiveDate> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| AppError::validation("issue_date must use the YYYY-MM-DD format")),
        None => Ok(Utc::now().date_naive()),
    }
}

fn parse_owner(raw: Option<&str>) -> AppResult<Option<Uuid>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_id(value, "owner_user_id").map(Some),
        None => Ok(None),
    }
}

fn required_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn positive_national_id(value: i64) -> AppResult<i64> {
    if value <= 0 {
        return Err(AppError::validation("national_id must be a positive number"));
    }
    Ok(value)
}

fn store_document(state: &AppState, document: NewDocument) -> AppResult<Document> {
    let document = state.store.insert_document(document)?;
    info!(document_id = %document.id, national_id = document.national_id, "document registered");
    audit::record(
        state.store.as_ref(),
        audit::DOCUMENT_REGISTERED,
        format!(
            "{} document registered for national ID {}",
            document.document_type, document.national_id
        ),
        document.id.to_string(),
    );
    Ok(document)
}

fn created(document: Document) -> (StatusCode, Json<ApiResponse<DocumentResponse>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "document registered successfully",
            document.into(),
        )),
    )
}

pub async fn register_document(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterDocumentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<DocumentResponse>>)> {
    let document = NewDocument {
        id: Uuid::new_v4(),
        national_id: positive_national_id(payload.national_id)?,
        owner_user_id: parse_owner(payload.owner_user_id.as_deref())?,
        document_type: required_text(&payload.document_type, "document_type")?,
        reference_url: required_text(&payload.reference_url, "reference_url")?,
        content_type: payload
            .content_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        issue_date: parse_issue_date(payload.issue_date.as_deref())?,
        is_active: payload.is_active.unwrap_or(true),
    };
    Ok(created(store_document(&state, document)?))
}

/// Multipart upload: the `file` part goes to blob storage and the record
/// references it through a `storage://` key.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<DocumentResponse>>)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut national_id: Option<String> = None;
    let mut document_type: Option<String> = None;
    let mut owner_user_id: Option<String> = None;
    let mut issue_date: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                content_type = field.content_type().map(str::to_string);
                file_bytes = Some(field_bytes(field).await?);
            }
            Some("national_id") => national_id = Some(field_text(field).await?),
            Some("document_type") => document_type = Some(field_text(field).await?),
            Some("owner_user_id") => owner_user_id = Some(field_text(field).await?),
            Some("issue_date") => issue_date = Some(field_text(field).await?),
            _ => {}
        }
    }

    let bytes = file_bytes
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::missing_input("file is required"))?;
    let national_id = national_id
        .as_deref()
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or_else(|| AppError::validation("national_id must be a positive number"))
        .and_then(positive_national_id)?;
    let document_type =
        required_text(document_type.as_deref().unwrap_or_default(), "document_type")?;
    let owner_user_id = parse_owner(owner_user_id.as_deref())?;
    let issue_date = parse_issue_date(issue_date.as_deref())?;

    let id = Uuid::new_v4();
    let file_name = sanitize_file_name(file_name.as_deref().unwrap_or("document"));
    let content_type = content_type
        .filter(|value| value != "application/octet-stream")
        .unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
    let key = format!("documents/{id}/{file_name}");

    state
        .storage
        .put_object(
            &key,
            bytes,
            Some(content_type.clone()),
            Some(content_disposition("inline", &file_name)),
        )
        .await?;

    let document = NewDocument {
        id,
        national_id,
        owner_user_id,
        document_type,
        reference_url: storage_reference(&key),
        content_type: Some(content_type),
        issue_date,
        is_active: true,
    };
    Ok(created(store_document(&state, document)?))
}

fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

pub async fn register_external_document(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ExternalDocumentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<DocumentResponse>>)> {
    let national_id = positive_national_id(payload.national_id)?;
    let external_id = required_text(&payload.document_id, "document_id")?;
    let reference_url = match payload.source.trim() {
        SOURCE_GOOGLE_DRIVE => drive_view_url(&external_id),
        SOURCE_AWS_S3 => storage_reference(&external_id),
        _ => {
            return Err(AppError::validation(format!(
                "invalid source: use '{SOURCE_GOOGLE_DRIVE}' or '{SOURCE_AWS_S3}'"
            )))
        }
    };

    let document = NewDocument {
        id: Uuid::new_v4(),
        national_id,
        owner_user_id: parse_owner(payload.owner_user_id.as_deref())?,
        document_type: required_text(&payload.document_type, "document_type")?,
        reference_url,
        content_type: None,
        issue_date: parse_issue_date(payload.issue_date.as_deref())?,
        is_active: true,
    };
    Ok(created(store_document(&state, document)?))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<DocumentResponse>>> {
    let id = parse_id(&id, "document id")?;
    let document = state
        .store
        .find_document(id)?
        .ok_or_else(|| AppError::not_found("document not found"))?;
    Ok(Json(ApiResponse::success("document retrieved", document.into())))
}

impl DocumentListQuery {
    fn filter(&self) -> AppResult<DocumentFilter> {
        let blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let national_id = match blank(&self.national_id) {
            Some(value) => Some(
                value
                    .parse::<i64>()
                    .map_err(|_| AppError::validation("national_id must be a number"))?,
            ),
            None => None,
        };
        let is_active = match blank(&self.is_active).as_deref() {
            Some("true") | Some("1") => Some(true),
            Some("false") | Some("0") => Some(false),
            Some(_) => return Err(AppError::validation("is_active must be true or false")),
            None => None,
        };
        Ok(DocumentFilter {
            search: blank(&self.search),
            national_id,
            owner_user_id: parse_owner(self.owner_user_id.as_deref())?,
            is_active,
        })
    }
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> AppResult<Json<ApiResponse<Vec<DocumentResponse>>>> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref());
    let filter = query.filter()?;
    let (documents, total) = state.store.list_documents(&filter, page)?;
    Ok(Json(ApiResponse::paginated(
        "documents retrieved",
        documents.into_iter().map(DocumentResponse::from).collect(),
        page.pagination(total),
    )))
}

fn document_changeset(body: &Value) -> AppResult<DocumentChangeset> {
    let mut changes = DocumentChangeset::default();

    match body.get("national_id") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let national_id = value
                .as_i64()
                .ok_or_else(|| AppError::validation("national_id must be a number"))?;
            changes.national_id = Some(positive_national_id(national_id)?);
        }
    }

    for (field, slot) in [
        ("document_type", &mut changes.document_type),
        ("reference_url", &mut changes.reference_url),
    ] {
        match body.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::String(value)) => *slot = Some(required_text(value, field)?),
            Some(_) => return Err(AppError::validation(format!("{field} must be a string"))),
        }
    }

    match body.get("is_active") {
        None | Some(Value::Null) => {}
        Some(Value::Bool(active)) => changes.is_active = Some(*active),
        Some(_) => return Err(AppError::validation("is_active must be a boolean")),
    }

    changes.owner_user_id = match classify_nullable(body.get("owner_user_id"))
        .map_err(|err| AppError::validation(format!("owner_user_id: {err}")))?
    {
        NullableValue::Omitted => None,
        NullableValue::Null => Some(None),
        NullableValue::String(value) => Some(parse_owner(Some(&value))?),
    };

    changes.updated_at = Some(Utc::now().naive_utc());
    Ok(changes)
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Json<ApiResponse<DocumentResponse>>> {
    let id = parse_id(&id, "document id")?;
    if !body.is_object() {
        return Err(AppError::validation("request body must be a JSON object"));
    }
    let changes = document_changeset(&body)?;
    let document = state
        .store
        .update_document(id, changes)?
        .ok_or_else(|| AppError::not_found("document not found"))?;
    info!(document_id = %document.id, "document updated");
    Ok(Json(ApiResponse::success(
        "document updated successfully",
        document.into(),
    )))
}

pub async fn toggle_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<DocumentResponse>>> {
    let id = parse_id(&id, "document id")?;
    let existing = state
        .store
        .find_document(id)?
        .ok_or_else(|| AppError::not_found("document not found"))?;
    let changes = DocumentChangeset {
        is_active: Some(!existing.is_active),
        updated_at: Some(Utc::now().naive_utc()),
        ..DocumentChangeset::default()
    };
    let document = state
        .store
        .update_document(id, changes)?
        .ok_or_else(|| AppError::not_found("document not found"))?;
    info!(document_id = %document.id, is_active = document.is_active, "document toggled");
    let message = if document.is_active {
        "document activated"
    } else {
        "document deactivated"
    };
    Ok(Json(ApiResponse::success(message, document.into())))
}

/// Removes the record. Certifications that reference it are left in place.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id, "document id")?;
    let document = state
        .store
        .find_document(id)?
        .ok_or_else(|| AppError::not_found("document not found"))?;
    if !state.store.delete_document(id)? {
        return Err(AppError::not_found("document not found"));
    }

    if let Some(key) = storage_key(&document.reference_url) {
        if let Err(err) = state.storage.delete_object(key).await {
            warn!(document_id = %id, key, error = %err, "failed to delete stored document object");
        }
    }

    info!(document_id = %id, "document deleted");
    Ok(Json(ApiResponse::empty("document deleted successfully")))
}
