use serde::Serialize;

use crate::utils::pagination::Pagination;

/// Uniform response body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paginated(message: impl Into<String>, data: T, pagination: Pagination) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: Some(data),
            pagination: Some(pagination),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}
