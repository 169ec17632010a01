//! Dashboard handlers

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppResult, AppState};
use crate::models::ComplianceRecord;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
    pub department: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentStats {
    pub total: i64,
    pub compliant: i64,
    pub rate: f32,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_checks: i64,
    pub compliant_checks: i64,
    pub non_compliant_checks: i64,
    pub compliance_rate: f32,
    pub today_checks: i64,
    pub today_compliant: i64,
    pub today_non_compliant: i64,
    pub today_compliance_rate: f32,
    pub department_stats: BTreeMap<String, DepartmentStats>,
    pub recent_violations: Vec<ComplianceRecord>,
    pub period_days: i64,
}

/// Get dashboard statistics
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<DashboardStats>> {
    let days = query.days.unwrap_or(7).max(1);
    let since = Utc::now() - Duration::days(days);
    let today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

    let (total, compliant) =
        ComplianceRecord::counts_since(&state.pool, since, query.department.as_deref()).await?;
    let (today_total, today_compliant) =
        ComplianceRecord::counts_since(&state.pool, today, query.department.as_deref()).await?;

    let department_stats = ComplianceRecord::department_breakdown(
        &state.pool,
        since,
        query.department.as_deref(),
    )
    .await?
        .into_iter()
        .map(|(department, dept_total, dept_compliant)| {
            (
                department,
                DepartmentStats {
                    total: dept_total,
                    compliant: dept_compliant,
                    rate: rate(dept_total, dept_compliant),
                },
            )
        })
        .collect();

    let recent_violations = ComplianceRecord::recent_violations(&state.pool, 10).await?;

    Ok(Json(DashboardStats {
        total_checks: total,
        compliant_checks: compliant,
        non_compliant_checks: total - compliant,
        compliance_rate: rate(total, compliant),
        today_checks: today_total,
        today_compliant,
        today_non_compliant: today_total - today_compliant,
        today_compliance_rate: rate(today_total, today_compliant),
        department_stats,
        recent_violations,
        period_days: days,
    }))
}

pub(crate) fn rate(total: i64, compliant: i64) -> f32 {
    if total > 0 {
        compliant as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(4, 3), 75.0);
        assert_eq!(rate(10, 10), 100.0);
    }
}
