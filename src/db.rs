//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create tables if not exist. The schema is a multi-statement script, so
    // it must go over the simple query protocol; Postgres rejects
    // multi-command prepared statements.
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Workers
CREATE TABLE IF NOT EXISTS workers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    worker_id VARCHAR(64) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    department VARCHAR(100),
    position VARCHAR(100),
    email VARCHAR(255),
    phone VARCHAR(50),
    shift VARCHAR(50),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Compliance records (one per detection call)
CREATE TABLE IF NOT EXISTS compliance_records (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    worker_id VARCHAR(64) NOT NULL,
    worker_name VARCHAR(255) NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    helmet_detected BOOLEAN NOT NULL DEFAULT false,
    mask_detected BOOLEAN NOT NULL DEFAULT false,
    gloves_detected BOOLEAN NOT NULL DEFAULT false,
    jacket_detected BOOLEAN NOT NULL DEFAULT false,

    helmet_confidence REAL NOT NULL DEFAULT 0,
    mask_confidence REAL NOT NULL DEFAULT 0,
    gloves_confidence REAL NOT NULL DEFAULT 0,
    jacket_confidence REAL NOT NULL DEFAULT 0,

    is_compliant BOOLEAN NOT NULL DEFAULT false,
    compliance_score REAL NOT NULL DEFAULT 0,
    detector_degraded BOOLEAN NOT NULL DEFAULT false,

    location VARCHAR(255),
    department VARCHAR(100),
    shift VARCHAR(50),

    alert_sent BOOLEAN NOT NULL DEFAULT false,
    alert_channels JSONB,

    raw_detections JSONB
);

-- Alert audit trail
CREATE TABLE IF NOT EXISTS compliance_alerts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    record_id UUID REFERENCES compliance_records(id) ON DELETE CASCADE,
    worker_id VARCHAR(64) NOT NULL,
    alert_type VARCHAR(50) NOT NULL,
    message TEXT NOT NULL,
    channels_sent JSONB,
    sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_workers_worker_id ON workers(worker_id);
CREATE INDEX IF NOT EXISTS idx_records_worker ON compliance_records(worker_id);
CREATE INDEX IF NOT EXISTS idx_records_recorded ON compliance_records(recorded_at);
CREATE INDEX IF NOT EXISTS idx_records_department ON compliance_records(department);
CREATE INDEX IF NOT EXISTS idx_records_compliant ON compliance_records(is_compliant);
CREATE INDEX IF NOT EXISTS idx_alerts_record ON compliance_alerts(record_id);
CREATE INDEX IF NOT EXISTS idx_alerts_worker ON compliance_alerts(worker_id);
"#;
