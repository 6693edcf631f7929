use crate::dtos::{RegisterDeviceRequest, RegisterDeviceResponse};
use crate::error::ApiError;
use crate::services::record_registration;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

/// Binds a pairing code to a push token, replacing any earlier token.
#[tracing::instrument(skip(state, payload))]
pub async fn register_device(
    State(state): State<AppState>,
    payload: Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> Result<Json<RegisterDeviceResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected register-device body");
        ApiError::InvalidInput
    })?;
    let (code, push_token) = request.into_parts()?;

    let device = state
        .store
        .upsert(&code, &push_token)
        .await
        .map_err(|e| ApiError::internal("Failed to register device", e))?;

    record_registration();
    tracing::info!(code = %device.code, "Device registered");

    Ok(Json(RegisterDeviceResponse {
        message: "Device registered successfully".to_string(),
        device: device.into(),
    }))
}
