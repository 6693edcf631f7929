//! Device inspection routes, mounted only in development.

use crate::dtos::MessageResponse;
use crate::error::ApiError;
use crate::models::DeviceView;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

pub async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<DeviceView>>, ApiError> {
    let devices = state
        .store
        .list_all()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch devices", e))?;

    Ok(Json(devices.into_iter().map(DeviceView::from).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_device(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .delete_by_code(&code)
        .await
        .map_err(|e| ApiError::internal("Failed to delete device", e))?;

    tracing::info!(code = %code, "Device deleted");
    Ok(Json(MessageResponse::new("Device deleted successfully")))
}
