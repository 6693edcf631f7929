use crate::dtos::{MessageResponse, SendNotificationRequest};
use crate::error::ApiError;
use crate::services::{record_notification, PushMessage};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{SecondsFormat, Utc};

/// Looks up the target code and forwards one push to its device.
#[tracing::instrument(skip(state, payload))]
pub async fn send_notification(
    State(state): State<AppState>,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected send-notification body");
        ApiError::InvalidTarget
    })?;
    let request = request.validate()?;

    let device = state
        .store
        .find_by_code(&request.target_code)
        .await
        .map_err(|e| {
            record_notification("failed");
            ApiError::internal("Failed to send notification", e)
        })?
        .ok_or_else(|| {
            record_notification("not_found");
            ApiError::DeviceNotFound
        })?;

    let push = PushMessage::new(device.push_token, request.title, request.body)
        .with_data("senderCode", request.sender_code)
        .with_data(
            "timestamp",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );

    let response = state.push_provider.send(&push).await.map_err(|e| {
        record_notification("failed");
        ApiError::internal("Failed to send notification", e)
    })?;

    record_notification("sent");
    tracing::info!(
        target_code = %request.target_code,
        provider_id = response.provider_id.as_deref().unwrap_or("-"),
        "Notification relayed"
    );

    Ok(Json(MessageResponse::new("Notification sent successfully")))
}
