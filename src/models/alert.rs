//! Alert audit model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::alerts::Channel;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ComplianceAlert {
    pub id: Uuid,
    pub record_id: Option<Uuid>,
    pub worker_id: String,
    pub alert_type: String,
    pub message: String,
    pub channels_sent: Option<serde_json::Value>,
    pub sent_at: DateTime<Utc>,
}

impl ComplianceAlert {
    pub async fn create(
        pool: &PgPool,
        record_id: Uuid,
        worker_id: &str,
        alert_type: &str,
        message: &str,
        channels_sent: &[Channel],
    ) -> Result<Self, sqlx::Error> {
        let names: Vec<&str> = channels_sent.iter().map(|c| c.as_str()).collect();

        sqlx::query_as::<_, ComplianceAlert>(
            r#"
            INSERT INTO compliance_alerts (record_id, worker_id, alert_type, message, channels_sent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#
        )
        .bind(record_id)
        .bind(worker_id)
        .bind(alert_type)
        .bind(message)
        .bind(serde_json::json!(names))
        .fetch_one(pool)
        .await
    }
}
