//! Manual alert handlers

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};
use crate::alerts::{self, AlertDispatcher, Channel};
use crate::models::{ComplianceAlert, ComplianceRecord};

#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub record_id: Uuid,
    pub message: Option<String>,
    #[serde(default = "default_channels")]
    pub channels: Vec<Channel>,
}

pub(crate) fn default_channels() -> Vec<Channel> {
    vec![Channel::Slack, Channel::Email]
}

/// Send manual alert for an existing record
pub async fn send(
    State(state): State<AppState>,
    Json(request): Json<AlertRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let record = ComplianceRecord::find_by_id(&state.pool, request.record_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;

    let results =
        send_manual_alert(&state, &record, request.message.as_deref(), &request.channels).await?;

    Ok(Json(json!({ "success": true, "results": results })))
}

/// Re-alert an existing record on the requested channels, with an optional
/// custom summary line. Shared with the webhook handler.
pub(crate) async fn send_manual_alert(
    state: &AppState,
    record: &ComplianceRecord,
    custom_message: Option<&str>,
    channels: &[Channel],
) -> AppResult<BTreeMap<Channel, bool>> {
    let mut message = alerts::render(record);
    if let Some(custom) = custom_message {
        message.summary = custom.to_string();
    }

    let outcomes = state
        .alerts
        .dispatch_message(&message, record.department.as_deref(), channels)
        .await;
    let delivered = AlertDispatcher::succeeded(&outcomes);

    ComplianceAlert::create(
        &state.pool,
        record.id,
        &record.worker_id,
        "manual",
        &message.summary,
        &delivered,
    )
    .await?;

    Ok(outcomes)
}
