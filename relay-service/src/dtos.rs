//! Request and response bodies for the relay API.

use crate::error::ApiError;
use crate::models::{is_valid_code, DeviceView};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sender reported to the device when the caller does not identify itself.
pub const UNKNOWN_SENDER: &str = "unknown";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    #[validate(required)]
    pub code: Option<String>,
    #[serde(alias = "pushToken")]
    #[validate(required, length(min = 1))]
    pub fcm_token: Option<String>,
}

impl RegisterDeviceRequest {
    /// Validates the request and returns `(code, push_token)`.
    pub fn into_parts(self) -> Result<(String, String), ApiError> {
        self.validate().map_err(|_| ApiError::InvalidInput)?;
        match (self.code, self.fcm_token) {
            (Some(code), Some(token)) if is_valid_code(&code) => Ok((code, token)),
            _ => Err(ApiError::InvalidInput),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    pub message: String,
    pub device: DeviceView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub target_code: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub sender_code: Option<String>,
}

/// A dispatch request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub target_code: String,
    pub title: String,
    pub body: String,
    pub sender_code: String,
}

impl SendNotificationRequest {
    /// Checks target, title and body in that order, stopping at the first
    /// failure.
    pub fn validate(self) -> Result<NotificationRequest, ApiError> {
        let target_code = self
            .target_code
            .filter(|code| is_valid_code(code))
            .ok_or(ApiError::InvalidTarget)?;
        let title = self
            .title
            .filter(|title| !title.trim().is_empty())
            .ok_or(ApiError::MissingTitle)?;
        let body = self
            .body
            .filter(|body| !body.trim().is_empty())
            .ok_or(ApiError::MissingBody)?;
        let sender_code = self
            .sender_code
            .filter(|sender| !sender.is_empty())
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

        Ok(NotificationRequest {
            target_code,
            title,
            body,
            sender_code,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
