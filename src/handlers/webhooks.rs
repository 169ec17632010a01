//! Webhook handler
//!
//! Thin adapter for external automation (n8n-style workflows). Events carry
//! their payload in `data`; an unrecognized event type gets a structured
//! "unknown event" response rather than an error.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};
use crate::alerts::Channel;
use crate::models::ComplianceRecord;
use super::alerts::{default_channels, send_manual_alert};
use super::compliance::{run_check, ComplianceCheckRequest};

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ManualAlertData {
    record_id: Uuid,
    message: Option<String>,
    #[serde(default = "default_channels")]
    channels: Vec<Channel>,
}

/// Webhook endpoint for the compliance workflow
pub async fn compliance(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<Json<serde_json::Value>> {
    tracing::info!(
        "Received webhook: {} (sent {:?})",
        payload.event_type,
        payload.timestamp
    );

    match payload.event_type.as_str() {
        "compliance_check" => {
            let request: ComplianceCheckRequest = serde_json::from_value(payload.data)
                .map_err(|e| AppError::ValidationError(format!("Invalid webhook data: {}", e)))?;

            let result = run_check(&state, request).await?;

            Ok(Json(json!({
                "success": result.success,
                "message": result.message,
                "data": result.data,
                "record_id": result.record_id,
                "alert_sent": result.alert_sent,
            })))
        }

        "manual_alert" => {
            let data: ManualAlertData = serde_json::from_value(payload.data)
                .map_err(|e| AppError::ValidationError(format!("Invalid webhook data: {}", e)))?;

            let Some(record) = ComplianceRecord::find_by_id(&state.pool, data.record_id).await?
            else {
                return Ok(Json(json!({
                    "success": false,
                    "message": "Record not found",
                })));
            };

            let results =
                send_manual_alert(&state, &record, data.message.as_deref(), &data.channels).await?;

            Ok(Json(json!({ "success": true, "alert_results": results })))
        }

        other => Ok(Json(json!({
            "success": false,
            "message": format!("Unknown event type: {}", other),
        }))),
    }
}
