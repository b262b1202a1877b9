use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::envelope::ApiResponse;

pub async fn health_check() -> (StatusCode, Json<ApiResponse<Value>>) {
    (
        StatusCode::OK,
        Json(ApiResponse::success(
            "service is healthy",
            json!({ "service": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") }),
        )),
    )
}
