use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Wrapper for API responses that adds the success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, StatusCode::OK, message)
    }

    /// 201 Created
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, StatusCode::CREATED, message)
    }

    pub fn with_status(data: T, status_code: StatusCode, message: impl Into<String>) -> Self {
        Self { data, status_code, message: message.into() }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "statusCode": 500,
                        "data": null,
                        "message": "Failed to serialize response data",
                        "success": false,
                        "errors": []
                    })),
                )
                    .into_response();
            }
        };

        let envelope = json!({
            "statusCode": self.status_code.as_u16(),
            "data": data,
            "message": self.message,
            "success": self.status_code.as_u16() < 400
        });

        (self.status_code, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_uses_200() {
        let response = ApiResponse::ok((), "done").into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn created_uses_201() {
        let response = ApiResponse::created(json!({"x": 1}), "made").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
