//! Worker model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Worker {
    pub id: Uuid,
    pub worker_id: String,
    pub name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shift: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWorker {
    pub worker_id: String,
    pub name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shift: Option<String>,
}

impl Worker {
    pub async fn create(pool: &PgPool, data: CreateWorker) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Worker>(
            r#"
            INSERT INTO workers (worker_id, name, department, position, email, phone, shift)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#
        )
        .bind(&data.worker_id)
        .bind(&data.name)
        .bind(&data.department)
        .bind(&data.position)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.shift)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_worker_id(pool: &PgPool, worker_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE worker_id = $1")
            .bind(worker_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Worker>(
            "SELECT * FROM workers ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Fetch the worker for a compliance check, registering them on first
    /// sight. Absent context fields fall back to "Unknown" so downstream
    /// rendering never deals with an anonymous worker.
    pub async fn get_or_create(
        pool: &PgPool,
        worker_id: &str,
        name: Option<&str>,
        department: Option<&str>,
        shift: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        if let Some(worker) = Self::find_by_worker_id(pool, worker_id).await? {
            return Ok(worker);
        }

        Self::create(
            pool,
            CreateWorker {
                worker_id: worker_id.to_string(),
                name: name.unwrap_or("Unknown").to_string(),
                department: Some(department.unwrap_or("Unknown").to_string()),
                position: None,
                email: None,
                phone: None,
                shift: shift.map(str::to_string),
            },
        )
        .await
    }
}
