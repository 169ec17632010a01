//! Compliance analytics handler
//!
//! Record-based aggregates over a trailing window: overall summary,
//! per-category detection rates, and department and hour-of-day breakdowns.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppResult, AppState};
use crate::detection::PpeItem;
use crate::models::{ComplianceRecord, DetectionCounts};
use super::dashboard::{rate, DepartmentStats};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
    pub department: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub total_records: i64,
    pub compliant_records: i64,
    pub non_compliant_records: i64,
    pub compliance_rate: f32,
}

#[derive(Debug, Serialize)]
pub struct ItemStats {
    pub detected: i64,
    pub rate: f32,
}

#[derive(Debug, Serialize)]
pub struct HourStats {
    pub total: i64,
    pub compliant: i64,
    pub rate: f32,
}

#[derive(Debug, Serialize)]
pub struct ComplianceAnalytics {
    pub summary: AnalyticsSummary,
    pub ppe_statistics: BTreeMap<&'static str, ItemStats>,
    pub department_statistics: BTreeMap<String, DepartmentStats>,
    pub hourly_statistics: BTreeMap<i32, HourStats>,
    pub period_days: i64,
    pub generated_at: DateTime<Utc>,
}

/// Get detailed compliance analytics
pub async fn compliance(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ComplianceAnalytics>> {
    let days = query.days.unwrap_or(30).max(1);
    let since = Utc::now() - Duration::days(days);
    let department = query.department.as_deref();

    let counts = ComplianceRecord::detection_counts(&state.pool, since, department).await?;

    let department_statistics =
        ComplianceRecord::department_breakdown(&state.pool, since, department)
            .await?
            .into_iter()
            .map(|(dept, total, compliant)| {
                (
                    dept,
                    DepartmentStats {
                        total,
                        compliant,
                        rate: rate(total, compliant),
                    },
                )
            })
            .collect();

    let hourly_statistics = ComplianceRecord::hourly_breakdown(&state.pool, since, department)
        .await?
        .into_iter()
        .map(|(hour, total, compliant)| {
            (
                hour,
                HourStats {
                    total,
                    compliant,
                    rate: rate(total, compliant),
                },
            )
        })
        .collect();

    Ok(Json(ComplianceAnalytics {
        summary: summary(&counts),
        ppe_statistics: item_statistics(&counts),
        department_statistics,
        hourly_statistics,
        period_days: days,
        generated_at: Utc::now(),
    }))
}

fn summary(counts: &DetectionCounts) -> AnalyticsSummary {
    AnalyticsSummary {
        total_records: counts.total,
        compliant_records: counts.compliant,
        non_compliant_records: counts.total - counts.compliant,
        compliance_rate: rate(counts.total, counts.compliant),
    }
}

fn item_statistics(counts: &DetectionCounts) -> BTreeMap<&'static str, ItemStats> {
    PpeItem::ALL
        .into_iter()
        .map(|item| {
            let detected = match item {
                PpeItem::Helmet => counts.helmet,
                PpeItem::Mask => counts.mask,
                PpeItem::Gloves => counts.gloves,
                PpeItem::Jacket => counts.jacket,
            };
            (
                item.label(),
                ItemStats {
                    detected,
                    rate: rate(counts.total, detected),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> DetectionCounts {
        DetectionCounts {
            total: 8,
            compliant: 6,
            helmet: 8,
            mask: 2,
            gloves: 6,
            jacket: 4,
        }
    }

    #[test]
    fn test_summary_rates() {
        let summary = summary(&counts());
        assert_eq!(summary.total_records, 8);
        assert_eq!(summary.non_compliant_records, 2);
        assert_eq!(summary.compliance_rate, 75.0);
    }

    #[test]
    fn test_item_statistics_cover_every_category() {
        let stats = item_statistics(&counts());
        assert_eq!(stats.len(), 4);
        assert_eq!(stats["helmet"].rate, 100.0);
        assert_eq!(stats["mask"].rate, 25.0);
        assert_eq!(stats["gloves"].detected, 6);
        assert_eq!(stats["jacket"].rate, 50.0);
    }

    #[test]
    fn test_empty_window_yields_zero_rates() {
        let empty = DetectionCounts {
            total: 0,
            compliant: 0,
            helmet: 0,
            mask: 0,
            gloves: 0,
            jacket: 0,
        };
        assert_eq!(summary(&empty).compliance_rate, 0.0);
        assert_eq!(item_statistics(&empty)["helmet"].rate, 0.0);
    }
}
