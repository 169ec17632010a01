//! Compliance record model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::alerts::Channel;
use crate::detection::DetectionResult;

/// Persisted snapshot of one compliance check
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ComplianceRecord {
    pub id: Uuid,
    pub worker_id: String,
    pub worker_name: String,
    pub recorded_at: DateTime<Utc>,

    pub helmet_detected: bool,
    pub mask_detected: bool,
    pub gloves_detected: bool,
    pub jacket_detected: bool,

    pub helmet_confidence: f32,
    pub mask_confidence: f32,
    pub gloves_confidence: f32,
    pub jacket_confidence: f32,

    pub is_compliant: bool,
    pub compliance_score: f32,
    pub detector_degraded: bool,

    pub location: Option<String>,
    pub department: Option<String>,
    pub shift: Option<String>,

    pub alert_sent: bool,
    pub alert_channels: Option<serde_json::Value>,

    pub raw_detections: Option<serde_json::Value>,
}

pub struct CreateRecord<'a> {
    pub worker_id: &'a str,
    pub worker_name: &'a str,
    pub detection: &'a DetectionResult,
    pub location: Option<String>,
    pub department: Option<String>,
    pub shift: Option<String>,
    pub raw_detections: serde_json::Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct RecordFilter {
    pub worker_id: Option<String>,
    pub department: Option<String>,
    pub is_compliant: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ComplianceRecord {
    pub async fn create(pool: &PgPool, data: CreateRecord<'_>) -> Result<Self, sqlx::Error> {
        let d = data.detection;

        sqlx::query_as::<_, ComplianceRecord>(
            r#"
            INSERT INTO compliance_records (
                worker_id, worker_name,
                helmet_detected, mask_detected, gloves_detected, jacket_detected,
                helmet_confidence, mask_confidence, gloves_confidence, jacket_confidence,
                is_compliant, compliance_score, detector_degraded,
                location, department, shift, raw_detections
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#
        )
        .bind(data.worker_id)
        .bind(data.worker_name)
        .bind(d.helmet_detected)
        .bind(d.mask_detected)
        .bind(d.gloves_detected)
        .bind(d.jacket_detected)
        .bind(d.helmet_confidence)
        .bind(d.mask_confidence)
        .bind(d.gloves_confidence)
        .bind(d.jacket_confidence)
        .bind(d.is_compliant)
        .bind(d.compliance_score)
        .bind(d.detector_degraded)
        .bind(&data.location)
        .bind(&data.department)
        .bind(&data.shift)
        .bind(&data.raw_detections)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ComplianceRecord>("SELECT * FROM compliance_records WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: RecordFilter) -> Result<Vec<Self>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(100);
        let offset = filter.offset.unwrap_or(0);

        sqlx::query_as::<_, ComplianceRecord>(
            r#"
            SELECT * FROM compliance_records
            WHERE ($1::text IS NULL OR worker_id = $1)
              AND ($2::text IS NULL OR department = $2)
              AND ($3::bool IS NULL OR is_compliant = $3)
            ORDER BY recorded_at DESC
            LIMIT $4 OFFSET $5
            "#
        )
        .bind(&filter.worker_id)
        .bind(&filter.department)
        .bind(filter.is_compliant)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Write the alert outcome back onto the record. Only the succeeded
    /// channel names are persisted.
    pub async fn mark_alerted(
        pool: &PgPool,
        id: Uuid,
        channels: &[Channel],
    ) -> Result<(), sqlx::Error> {
        let names: Vec<&str> = channels.iter().map(|c| c.as_str()).collect();

        sqlx::query(
            "UPDATE compliance_records SET alert_sent = true, alert_channels = $2 WHERE id = $1"
        )
        .bind(id)
        .bind(serde_json::json!(names))
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn recent_violations(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ComplianceRecord>(
            r#"
            SELECT * FROM compliance_records
            WHERE is_compliant = false
            ORDER BY recorded_at DESC
            LIMIT $1
            "#
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Total and compliant counts since a cutoff, optionally for one department
    pub async fn counts_since(
        pool: &PgPool,
        since: DateTime<Utc>,
        department: Option<&str>,
    ) -> Result<(i64, i64), sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE is_compliant) as compliant
            FROM compliance_records
            WHERE recorded_at >= $1
              AND ($2::text IS NULL OR department = $2)
            "#
        )
        .bind(since)
        .bind(department)
        .fetch_one(pool)
        .await?;

        Ok((row.get("total"), row.get("compliant")))
    }

    /// Per-department totals and compliant counts since a cutoff
    pub async fn department_breakdown(
        pool: &PgPool,
        since: DateTime<Utc>,
        department: Option<&str>,
    ) -> Result<Vec<(String, i64, i64)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                COALESCE(department, 'Unknown') as department,
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE is_compliant) as compliant
            FROM compliance_records
            WHERE recorded_at >= $1
              AND ($2::text IS NULL OR department = $2)
            GROUP BY COALESCE(department, 'Unknown')
            "#
        )
        .bind(since)
        .bind(department)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.get::<String, _>("department"),
                    r.get::<i64, _>("total"),
                    r.get::<i64, _>("compliant"),
                )
            })
            .collect())
    }

    /// Total/compliant counts plus per-category detection counts since a
    /// cutoff, optionally for one department
    pub async fn detection_counts(
        pool: &PgPool,
        since: DateTime<Utc>,
        department: Option<&str>,
    ) -> Result<DetectionCounts, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE is_compliant) as compliant,
                COUNT(*) FILTER (WHERE helmet_detected) as helmet,
                COUNT(*) FILTER (WHERE mask_detected) as mask,
                COUNT(*) FILTER (WHERE gloves_detected) as gloves,
                COUNT(*) FILTER (WHERE jacket_detected) as jacket
            FROM compliance_records
            WHERE recorded_at >= $1
              AND ($2::text IS NULL OR department = $2)
            "#
        )
        .bind(since)
        .bind(department)
        .fetch_one(pool)
        .await?;

        Ok(DetectionCounts {
            total: row.get("total"),
            compliant: row.get("compliant"),
            helmet: row.get("helmet"),
            mask: row.get("mask"),
            gloves: row.get("gloves"),
            jacket: row.get("jacket"),
        })
    }

    /// Totals and compliant counts per hour of day since a cutoff
    pub async fn hourly_breakdown(
        pool: &PgPool,
        since: DateTime<Utc>,
        department: Option<&str>,
    ) -> Result<Vec<(i32, i64, i64)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                EXTRACT(HOUR FROM recorded_at)::int as hour,
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE is_compliant) as compliant
            FROM compliance_records
            WHERE recorded_at >= $1
              AND ($2::text IS NULL OR department = $2)
            GROUP BY EXTRACT(HOUR FROM recorded_at)::int
            ORDER BY hour
            "#
        )
        .bind(since)
        .bind(department)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.get::<i32, _>("hour"),
                    r.get::<i64, _>("total"),
                    r.get::<i64, _>("compliant"),
                )
            })
            .collect())
    }
}

/// Aggregate counts backing the analytics report
#[derive(Debug, Clone, Copy)]
pub struct DetectionCounts {
    pub total: i64,
    pub compliant: i64,
    pub helmet: i64,
    pub mask: i64,
    pub gloves: i64,
    pub jacket: i64,
}
