//! Compliance check handlers
//!
//! The check pipeline: resolve the worker, run detection, normalize and
//! evaluate, persist the record, and fan out alerts when the worker is
//! non-compliant. Detection and messaging outages degrade individual steps;
//! they never fail the request.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};
use crate::alerts::{self, AlertDispatcher};
use crate::detection::{normalize, DetectionOutcome, DetectionResult, ImageSource};
use crate::models::{ComplianceAlert, ComplianceRecord, CreateRecord, RecordFilter, Worker};

#[derive(Debug, Deserialize)]
pub struct ComplianceCheckRequest {
    pub worker_id: String,
    pub worker_name: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub shift: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComplianceCheckResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<DetectionResult>,
    pub record_id: Option<Uuid>,
    pub alert_sent: bool,
}

/// Main endpoint for PPE compliance checking
pub async fn check(
    State(state): State<AppState>,
    Json(request): Json<ComplianceCheckRequest>,
) -> AppResult<Json<ComplianceCheckResponse>> {
    let response = run_check(&state, request).await?;
    Ok(Json(response))
}

/// Compliance check from an uploaded image file. The multipart form carries
/// the same context fields as the JSON endpoint plus a `file` part, which is
/// base64-encoded into the regular pipeline.
pub async fn check_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ComplianceCheckResponse>> {
    let request = parse_upload(multipart).await?;
    let response = run_check(&state, request).await?;
    Ok(Json(response))
}

pub(crate) async fn parse_upload(
    mut multipart: Multipart,
) -> AppResult<ComplianceCheckRequest> {
    let mut worker_id = None;
    let mut worker_name = None;
    let mut location = None;
    let mut department = None;
    let mut shift = None;
    let mut image_base64 = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::ValidationError(format!("Invalid file upload: {}", e)))?;
            image_base64 = Some(general_purpose::STANDARD.encode(&data));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::ValidationError(format!("Invalid multipart form: {}", e)))?;
        if value.is_empty() {
            continue;
        }

        match name.as_str() {
            "worker_id" => worker_id = Some(value),
            "worker_name" => worker_name = Some(value),
            "location" => location = Some(value),
            "department" => department = Some(value),
            "shift" => shift = Some(value),
            _ => {}
        }
    }

    Ok(ComplianceCheckRequest {
        worker_id: worker_id
            .ok_or_else(|| AppError::ValidationError("worker_id is required".to_string()))?,
        worker_name,
        location,
        department,
        shift,
        image_url: None,
        image_base64: Some(
            image_base64
                .ok_or_else(|| AppError::ValidationError("file is required".to_string()))?,
        ),
    })
}

/// Run the full compliance pipeline for one request. Shared with the
/// webhook handler.
pub(crate) async fn run_check(
    state: &AppState,
    request: ComplianceCheckRequest,
) -> AppResult<ComplianceCheckResponse> {
    if request.worker_id.trim().is_empty() {
        return Err(AppError::ValidationError("worker_id is required".to_string()));
    }

    let worker = Worker::get_or_create(
        &state.pool,
        &request.worker_id,
        request.worker_name.as_deref(),
        request.department.as_deref(),
        request.shift.as_deref(),
    )
    .await?;

    let outcome = detect_image(state, &request).await;
    let detection = normalize(&outcome);

    if !detection.is_compliant {
        let missing: Vec<&str> = detection.missing_items().iter().map(|i| i.label()).collect();
        tracing::info!(
            "Worker {} non-compliant (score {:.1}), missing: {:?}",
            request.worker_id,
            detection.compliance_score,
            missing
        );
    }

    let record = ComplianceRecord::create(
        &state.pool,
        CreateRecord {
            worker_id: &request.worker_id,
            worker_name: &worker.name,
            detection: &detection,
            location: request.location.clone(),
            department: request.department.clone().or_else(|| worker.department.clone()),
            shift: request.shift.clone().or_else(|| worker.shift.clone()),
            raw_detections: serde_json::to_value(&outcome.raw)
                .map_err(|e| AppError::InternalError(e.to_string()))?,
        },
    )
    .await?;

    let alert_sent = if detection.is_compliant {
        false
    } else {
        send_non_compliance_alert(state, &record).await?
    };

    Ok(ComplianceCheckResponse {
        success: true,
        message: "Compliance check completed successfully".to_string(),
        data: Some(detection),
        record_id: Some(record.id),
        alert_sent,
    })
}

async fn detect_image(state: &AppState, request: &ComplianceCheckRequest) -> DetectionOutcome {
    if let Some(url) = &request.image_url {
        state.detector.detect(ImageSource::Url(url)).await
    } else if let Some(data) = &request.image_base64 {
        state.detector.detect(ImageSource::Base64(data)).await
    } else {
        tracing::warn!("No image provided for PPE detection");
        DetectionOutcome::unavailable()
    }
}

/// Fan the alert out on the configured default channels and write the
/// outcome back to the record plus the alert audit trail
async fn send_non_compliance_alert(
    state: &AppState,
    record: &ComplianceRecord,
) -> AppResult<bool> {
    let message = alerts::render(record);
    let outcomes = state
        .alerts
        .dispatch_message(&message, record.department.as_deref(), &state.config.alert_channels)
        .await;
    let delivered = AlertDispatcher::succeeded(&outcomes);

    ComplianceAlert::create(
        &state.pool,
        record.id,
        &record.worker_id,
        "non_compliance",
        &message.summary,
        &delivered,
    )
    .await?;
    ComplianceRecord::mark_alerted(&state.pool, record.id, &delivered).await?;

    Ok(!delivered.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use base64::Engine as _;

    async fn multipart(body: Vec<u8>) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .header(
                "content-type",
                "multipart/form-data; boundary=BOUNDARY",
            )
            .body(Body::from(body))
            .unwrap();

        Multipart::from_request(request, &()).await.unwrap()
    }

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--BOUNDARY\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            name, value
        )
        .into_bytes()
    }

    fn file_part(bytes: &[u8]) -> Vec<u8> {
        let mut part = b"--BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; \
            filename=\"frame.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            .to_vec();
        part.extend_from_slice(bytes);
        part.extend_from_slice(b"\r\n");
        part
    }

    const CLOSE: &[u8] = b"--BOUNDARY--\r\n";

    #[tokio::test]
    async fn test_parse_upload_encodes_file_into_check_request() {
        let image = [0xFFu8, 0xD8, 0xFF, 0xE0];
        let mut body = text_part("worker_id", "W-042");
        body.extend(text_part("department", "Production"));
        body.extend(file_part(&image));
        body.extend_from_slice(CLOSE);

        let parsed = parse_upload(multipart(body).await).await.unwrap();

        assert_eq!(parsed.worker_id, "W-042");
        assert_eq!(parsed.department.as_deref(), Some("Production"));
        assert!(parsed.image_url.is_none());
        assert_eq!(
            parsed.image_base64.as_deref(),
            Some(general_purpose::STANDARD.encode(image).as_str())
        );
    }

    #[tokio::test]
    async fn test_parse_upload_requires_a_file() {
        let mut body = text_part("worker_id", "W-042");
        body.extend_from_slice(CLOSE);

        let result = parse_upload(multipart(body).await).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_parse_upload_requires_a_worker_id() {
        let mut body = file_part(&[1, 2, 3]);
        body.extend_from_slice(CLOSE);

        let result = parse_upload(multipart(body).await).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}

/// List compliance records with optional filters
pub async fn list_records(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> AppResult<Json<Vec<ComplianceRecord>>> {
    let records = ComplianceRecord::list(&state.pool, filter).await?;
    Ok(Json(records))
}

/// Get single compliance record
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ComplianceRecord>> {
    let record = ComplianceRecord::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;

    Ok(Json(record))
}
