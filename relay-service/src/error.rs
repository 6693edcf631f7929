use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the relay's request handlers.
///
/// The display string is the fixed message sent to the caller; internal
/// failures keep their cause for logging only.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input")]
    InvalidInput,

    #[error("Invalid target code")]
    InvalidTarget,

    #[error("Title is required")]
    MissingTitle,

    #[error("Message body is required")]
    MissingBody,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Not found")]
    RouteNotFound,

    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn internal(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            message,
            source: source.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput => "INVALID_INPUT",
            ApiError::InvalidTarget => "INVALID_TARGET",
            ApiError::MissingTitle => "MISSING_TITLE",
            ApiError::MissingBody => "MISSING_BODY",
            ApiError::DeviceNotFound => "DEVICE_NOT_FOUND",
            ApiError::RouteNotFound => "NOT_FOUND",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput
            | ApiError::InvalidTarget
            | ApiError::MissingTitle
            | ApiError::MissingBody => StatusCode::BAD_REQUEST,
            ApiError::DeviceNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { message, source } = &self {
            tracing::error!(error = ?source, "{}", message);
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_are_client_errors() {
        for (err, code) in [
            (ApiError::InvalidInput, "INVALID_INPUT"),
            (ApiError::InvalidTarget, "INVALID_TARGET"),
            (ApiError::MissingTitle, "MISSING_TITLE"),
            (ApiError::MissingBody, "MISSING_BODY"),
        ] {
            let (status, body) = body_of(err).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.code, code);
        }
    }

    #[tokio::test]
    async fn device_not_found_is_404() {
        let (status, body) = body_of(ApiError::DeviceNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Device not found");
    }

    #[tokio::test]
    async fn internal_error_hides_source() {
        let err = ApiError::internal(
            "Failed to send notification",
            anyhow::anyhow!("FCM returned 401: token expired for project demo"),
        );

        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Failed to send notification");
        assert_eq!(body.code, "INTERNAL_ERROR");
    }
}
