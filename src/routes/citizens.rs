use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{parse_id, to_iso, ApiJson};
use crate::audit;
use crate::envelope::ApiResponse;
use crate::error::{AppError, AppResult};
use crate::models::{Citizen, CitizenChangeset, NewCitizen};
use crate::state::AppState;
use crate::utils::json::{classify_nullable, NullableValue};
use crate::utils::pagination::ListQuery;

#[derive(Deserialize)]
pub struct RegisterCitizenRequest {
    pub national_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct CitizenResponse {
    pub id: Uuid,
    pub national_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Citizen> for CitizenResponse {
    fn from(citizen: Citizen) -> Self {
        Self {
            id: citizen.id,
            national_id: citizen.national_id,
            first_name: citizen.first_name,
            last_name: citizen.last_name,
            phone: citizen.phone,
            email: citizen.email,
            created_at: to_iso(citizen.created_at),
            updated_at: to_iso(citizen.updated_at),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate_email(email: &str) -> AppResult<()> {
    email
        .parse::<lettre::Address>()
        .map(|_| ())
        .map_err(|_| AppError::validation("email must be a valid address"))
}

pub async fn register_citizen(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterCitizenRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CitizenResponse>>)> {
    if payload.national_id <= 0 {
        return Err(AppError::validation("national_id must be a positive number"));
    }
    let first_name = payload.first_name.trim().to_string();
    let last_name = payload.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::validation("first_name and last_name are required"));
    }
    let phone = non_blank(payload.phone);
    let email = non_blank(payload.email);
    if phone.is_none() && email.is_none() {
        return Err(AppError::validation("either email or phone is required"));
    }
    if let Some(email) = email.as_deref() {
        validate_email(email)?;
    }

    if state
        .store
        .find_citizen_by_national_id(payload.national_id)?
        .is_some()
    {
        return Err(AppError::conflict(
            "a citizen with this national ID already exists",
        ));
    }

    let citizen = state.store.insert_citizen(NewCitizen {
        id: Uuid::new_v4(),
        national_id: payload.national_id,
        first_name,
        last_name,
        phone,
        email,
    })?;

    info!(citizen_id = %citizen.id, "citizen registered");
    audit::record(
        state.store.as_ref(),
        audit::CITIZEN_REGISTERED,
        format!("Citizen registered: {}", citizen.full_name()),
        citizen.id.to_string(),
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "citizen registered successfully",
            citizen.into(),
        )),
    ))
}

pub async fn get_citizen(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<CitizenResponse>>> {
    let id = parse_id(&id, "citizen id")?;
    let citizen = state
        .store
        .find_citizen(id)?
        .ok_or_else(|| AppError::not_found("citizen not found"))?;
    Ok(Json(ApiResponse::success("citizen retrieved", citizen.into())))
}

pub async fn get_citizen_by_national_id(
    State(state): State<AppState>,
    Path(national_id): Path<String>,
) -> AppResult<Json<ApiResponse<CitizenResponse>>> {
    let national_id: i64 = national_id
        .trim()
        .parse()
        .map_err(|_| AppError::validation("national_id must be a number"))?;
    let citizen = state
        .store
        .find_citizen_by_national_id(national_id)?
        .ok_or_else(|| AppError::not_found("citizen not found"))?;
    Ok(Json(ApiResponse::success("citizen retrieved", citizen.into())))
}

pub async fn list_citizens(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<CitizenResponse>>>> {
    let page = query.page_request();
    let search = query.search_term();
    let (citizens, total) = state.store.list_citizens(search.as_deref(), page)?;
    Ok(Json(ApiResponse::paginated(
        "citizens retrieved",
        citizens.into_iter().map(CitizenResponse::from).collect(),
        page.pagination(total),
    )))
}

fn required_name(body: &Value, field: &str) -> AppResult<Option<String>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if !value.trim().is_empty() => {
            Ok(Some(value.trim().to_string()))
        }
        Some(_) => Err(AppError::validation(format!(
            "{field} must be a non-empty string"
        ))),
    }
}

fn nullable_contact(body: &Value, field: &str) -> AppResult<Option<Option<String>>> {
    classify_nullable(body.get(field))
        .map(NullableValue::into_patch)
        .map_err(|err| AppError::validation(format!("{field}: {err}")))
}

/// Applies only the fields present in the body. Clearing both contact
/// fields is rejected.
pub async fn update_citizen(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Json<ApiResponse<CitizenResponse>>> {
    let id = parse_id(&id, "citizen id")?;
    if !body.is_object() {
        return Err(AppError::validation("request body must be a JSON object"));
    }

    let existing = state
        .store
        .find_citizen(id)?
        .ok_or_else(|| AppError::not_found("citizen not found"))?;

    let changes = CitizenChangeset {
        first_name: required_name(&body, "first_name")?,
        last_name: required_name(&body, "last_name")?,
        phone: nullable_contact(&body, "phone")?,
        email: nullable_contact(&body, "email")?,
        updated_at: Utc::now().naive_utc(),
    };

    if let Some(Some(email)) = changes.email.as_ref() {
        validate_email(email)?;
    }
    let phone_after = changes.phone.clone().unwrap_or(existing.phone);
    let email_after = changes.email.clone().unwrap_or(existing.email);
    if phone_after.is_none() && email_after.is_none() {
        return Err(AppError::validation("either email or phone is required"));
    }

    let citizen = state
        .store
        .update_citizen(id, changes)?
        .ok_or_else(|| AppError::not_found("citizen not found"))?;
    info!(citizen_id = %citizen.id, "citizen updated");

    Ok(Json(ApiResponse::success(
        "citizen updated successfully",
        citizen.into(),
    )))
}

pub async fn delete_citizen(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id, "citizen id")?;
    if !state.store.delete_citizen(id)? {
        return Err(AppError::not_found("citizen not found"));
    }
    info!(citizen_id = %id, "citizen deleted");
    Ok(Json(ApiResponse::empty("citizen deleted successfully")))
}
