use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::{content_disposition, field_bytes, field_text, multipart_error, parse_id};
use crate::delivery::{
    attachment_filename, prepare_attachment, Attachment, DeliveryReceipt, EmailRequest,
};
use crate::envelope::ApiResponse;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::format::{sniff_format, ContentKind};
use crate::sources::DriveFileLinks;
use crate::state::AppState;

const DOCUMENT_PARTS: &[&str] = &["document", "pdf", "pdfFile"];
const STAMP_PARTS: &[&str] = &["stamp", "stampImage"];

pub(crate) fn file_response(
    bytes: Vec<u8>,
    mime_type: &str,
    filename: &str,
    disposition: &str,
) -> AppResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, filename),
        )
        .body(Body::from(bytes))
        .map_err(|err| {
            AppError::new(ErrorKind::Encoding, format!("failed to build response: {err}"))
        })
}

#[derive(Default)]
struct EmailForm {
    email: String,
    document_id: Option<String>,
    document_type: Option<String>,
    file_id: Option<String>,
    upload: Option<(Vec<u8>, Option<String>)>,
    stamp: Option<Vec<u8>>,
}

async fn read_email_form(mut multipart: Multipart) -> AppResult<EmailForm> {
    let mut form = EmailForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "email" => form.email = field_text(field).await?,
            "document_id" => form.document_id = Some(field_text(field).await?),
            "document_type" => form.document_type = Some(field_text(field).await?),
            "file_id" => form.file_id = Some(field_text(field).await?),
            part if DOCUMENT_PARTS.contains(&part) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field_bytes(field).await?;
                if !bytes.is_empty() && form.upload.is_none() {
                    form.upload = Some((bytes, content_type));
                }
            }
            part if STAMP_PARTS.contains(&part) => {
                let bytes = field_bytes(field).await?;
                if !bytes.is_empty() && form.stamp.is_none() {
                    form.stamp = Some(bytes);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Emails a document. The payload comes from the uploaded part, otherwise
/// the Drive `file_id`, otherwise the stored document's reference.
pub async fn email_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<DeliveryReceipt>>> {
    state.delivery.ensure_configured()?;
    let form = read_email_form(multipart).await?;
    if form.email.is_empty() {
        return Err(AppError::validation("email is required"));
    }

    let document_id = non_empty(form.document_id);
    let file_id = non_empty(form.file_id);
    let mut document_type = non_empty(form.document_type);
    let mut payload = Vec::new();
    let mut mime_hint = None;

    if let Some((bytes, content_type)) = form.upload {
        payload = bytes;
        mime_hint = content_type;
    }

    if payload.is_empty() {
        if let Some(file_id) = file_id.as_deref() {
            match state.sources.fetch_drive_file(file_id).await {
                Ok(bytes) => payload = bytes,
                Err(err) => warn!(file_id, error = %err, "drive file could not be resolved"),
            }
        }
    }

    if let Some(raw_id) = document_id.as_deref() {
        let id = parse_id(raw_id, "document_id")?;
        let document = state
            .store
            .find_document(id)?
            .ok_or_else(|| AppError::not_found("document not found"))?;
        if document_type.is_none() {
            document_type = Some(document.document_type.clone());
        }
        if payload.is_empty() {
            match state.sources.fetch(&document.reference_url).await {
                Ok(bytes) => {
                    payload = bytes;
                    mime_hint = document.content_type.clone();
                }
                Err(err) => warn!(
                    document_id = %document.id,
                    error = %err,
                    "stored document could not be resolved"
                ),
            }
        }
    }

    let identifier = document_id
        .or(file_id)
        .unwrap_or_else(|| "upload".to_string());

    let receipt = state
        .delivery
        .email_document(EmailRequest {
            recipient: form.email,
            document_type: document_type.unwrap_or_default(),
            identifier,
            payload,
            stamp_image: form.stamp,
            mime_hint,
        })
        .await?;

    Ok(Json(ApiResponse::success(
        "document sent successfully",
        receipt,
    )))
}

/// Renders an uploaded raster document onto a stamped PDF page.
pub async fn stamp_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut file: Option<Vec<u8>> = None;
    let mut stamp: Option<Vec<u8>> = None;
    let mut document_type = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => file = Some(field_bytes(field).await?),
            part if STAMP_PARTS.contains(&part) => stamp = Some(field_bytes(field).await?),
            "document_type" => document_type = field_text(field).await?,
            _ => {}
        }
    }

    let file = file
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::missing_input("file is required"))?;
    if document_type.is_empty() {
        document_type = "Document".to_string();
    }
    let kind = sniff_format(&file);

    let renderer = state.renderer();
    let pdf = match stamp.filter(|bytes| !bytes.is_empty()) {
        Some(stamp) => {
            renderer
                .convert_image_to_pdf_with_image_stamp(file, stamp, kind, &document_type)
                .await?
        }
        None => {
            renderer
                .convert_image_to_pdf_with_stamp(file, kind, &document_type)
                .await?
        }
    };

    info!(document_type = %document_type, bytes = pdf.len(), "stamped document generated");
    let filename = attachment_filename(&document_type, "stamped", ContentKind::Pdf);
    file_response(pdf, ContentKind::Pdf.mime_type(), &filename, "inline")
}

#[derive(Deserialize, Default)]
pub struct DownloadQuery {
    pub stamp: Option<String>,
}

impl DownloadQuery {
    fn wants_stamp(&self) -> bool {
        matches!(
            self.stamp.as_deref().map(str::trim),
            Some("true") | Some("1") | Some("yes")
        )
    }
}

pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Response> {
    let id = parse_id(&id, "document id")?;
    let document = state
        .store
        .find_document(id)?
        .ok_or_else(|| AppError::not_found("document not found"))?;

    let payload = state.sources.fetch(&document.reference_url).await?;
    if payload.is_empty() {
        return Err(AppError::missing_input("document content is empty"));
    }

    let attachment = if query.wants_stamp() {
        prepare_attachment(
            state.renderer(),
            payload,
            None,
            &document.document_type,
            document.content_type.as_deref(),
        )
        .await
    } else {
        let kind = sniff_format(&payload).or_pdf();
        Attachment::original(payload, kind, document.content_type.as_deref())
    };

    info!(document_id = %document.id, stamped = attachment.stamped, "document downloaded");
    let filename = attachment_filename(
        &document.document_type,
        &document.id.to_string(),
        attachment.kind,
    );
    file_response(attachment.bytes, &attachment.mime_type, &filename, "inline")
}

pub async fn proxy_drive_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> AppResult<Response> {
    let file_id = file_id.trim().to_string();
    if file_id.is_empty() {
        return Err(AppError::validation("file id is required"));
    }
    let bytes = state.sources.fetch_drive_file(&file_id).await?;
    let kind = sniff_format(&bytes).or_pdf();
    let filename = format!("{file_id}.{}", kind.extension());
    file_response(bytes, kind.mime_type(), &filename, "inline")
}

pub async fn drive_file_metadata(
    Path(file_id): Path<String>,
) -> AppResult<Json<ApiResponse<DriveFileLinks>>> {
    let file_id = file_id.trim();
    if file_id.is_empty() {
        return Err(AppError::validation("file id is required"));
    }
    Ok(Json(ApiResponse::success(
        "drive file links",
        DriveFileLinks::new(file_id),
    )))
}

#[cfg(test)]
mod tests {
    use super::DownloadQuery;

    #[test]
    fn stamp_flag_is_lenient() {
        let query = |value: &str| DownloadQuery {
            stamp: Some(value.to_string()),
        };
        assert!(query("true").wants_stamp());
        assert!(query("1").wants_stamp());
        assert!(!query("false").wants_stamp());
        assert!(!DownloadQuery::default().wants_stamp());
    }
}
