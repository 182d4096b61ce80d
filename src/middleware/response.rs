use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Successful response wrapped in the `{status, data, message}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, StatusCode::OK, message)
    }

    pub fn with_status(data: T, status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            data,
            status_code,
            message: message.into(),
        }
    }

    /// 201 Created
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, StatusCode::CREATED, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return crate::error::ApiError::internal_server_error(
                    "Failed to serialize response data",
                )
                .into_response();
            }
        };

        let envelope = json!({
            "status": self.status_code.as_u16(),
            "data": data_value,
            "message": self.message,
        });

        (self.status_code, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
