use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::to_iso;
use crate::envelope::ApiResponse;
use crate::error::AppResult;
use crate::models::AuditEntry;
use crate::state::AppState;
use crate::utils::pagination::PageRequest;

#[derive(Deserialize, Default)]
pub struct AuditQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub action: Option<String>,
}

#[derive(Serialize)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub action: String,
    pub description: String,
    pub reference: String,
    pub created_at: String,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action,
            description: entry.description,
            reference: entry.reference,
            created_at: to_iso(entry.created_at),
        }
    }
}

pub async fn list_audit_entries(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<ApiResponse<Vec<AuditEntryResponse>>>> {
    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref());
    let action = query
        .action
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let (entries, total) = state.store.list_audit_entries(action, page)?;
    Ok(Json(ApiResponse::paginated(
        "audit entries retrieved",
        entries.into_iter().map(AuditEntryResponse::from).collect(),
        page.pagination(total),
    )))
}
