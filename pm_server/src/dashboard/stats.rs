//! Dashboard statistics, recomputed from stored documents on every call.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::TrackerResult;
use crate::models::program::full_health;
use crate::store::{Database, Filter};

#[derive(Debug, Serialize)]
pub struct Counts {
    pub programs: u64,
    pub projects: u64,
    pub tasks: u64,
    pub resources: u64,
    pub pending_approvals: u64,
}

#[derive(Debug, Serialize)]
pub struct ProjectTotals {
    pub status_breakdown: BTreeMap<String, u64>,
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_forecast: f64,
    pub budget_utilization: f64,
    pub avg_health_score: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub counts: Counts,
    pub projects: ProjectTotals,
    pub risks: BTreeMap<String, u64>,
    pub tasks: BTreeMap<String, u64>,
}

fn number(doc: &Value, field: &str) -> f64 {
    doc.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Count documents by a string field, bucketing missing values under
/// `default`.
fn histogram(docs: &[Value], field: &str, default: &str) -> BTreeMap<String, u64> {
    let mut buckets = BTreeMap::new();
    for doc in docs {
        let key = doc.get(field).and_then(Value::as_str).unwrap_or(default);
        *buckets.entry(key.to_string()).or_default() += 1;
    }
    buckets
}

fn project_totals(projects: &[Value]) -> ProjectTotals {
    let total_budget: f64 = projects.iter().map(|p| number(p, "budget_allocated")).sum();
    let total_spent: f64 = projects.iter().map(|p| number(p, "budget_spent")).sum();
    let total_forecast: f64 = projects.iter().map(|p| number(p, "budget_forecast")).sum();

    let budget_utilization = if total_budget > 0.0 {
        (total_spent / total_budget * 1_000.0).round() / 10.0
    } else {
        0.0
    };

    let avg_health_score = if projects.is_empty() {
        0
    } else {
        let health: i64 = projects
            .iter()
            .map(|p| {
                p.get("health_score")
                    .and_then(Value::as_i64)
                    .unwrap_or_else(full_health)
            })
            .sum();
        health.div_euclid(projects.len() as i64)
    };

    ProjectTotals {
        status_breakdown: histogram(projects, "status", "planning"),
        total_budget,
        total_spent,
        total_forecast,
        budget_utilization,
        avg_health_score,
    }
}

pub async fn dashboard_stats(db: &Database) -> TrackerResult<DashboardStats> {
    let all = Filter::new();
    let projects = db.projects.documents(&all).await?;
    let tasks = db.tasks.documents(&all).await?;
    let risks = db.risks.documents(&all).await?;

    Ok(DashboardStats {
        counts: Counts {
            programs: db.programs.count(&all).await?,
            projects: projects.len() as u64,
            tasks: tasks.len() as u64,
            resources: db.resources.count(&all).await?,
            pending_approvals: db
                .approvals
                .count(&Filter::new().eq("status", "pending"))
                .await?,
        },
        projects: project_totals(&projects),
        risks: histogram(&risks, "level", "low"),
        tasks: histogram(&tasks, "status", "todo"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn totals_round_utilization_and_floor_health() {
        let projects = vec![
            json!({"status": "in_progress", "budget_allocated": 300.0, "budget_spent": 100.0, "health_score": 90}),
            json!({"budget_allocated": 0.0, "budget_spent": 0.0, "budget_forecast": 50.0, "health_score": 75}),
            json!({"status": "in_progress", "budget_allocated": 0.0}),
        ];
        let totals = project_totals(&projects);

        assert_eq!(totals.total_budget, 300.0);
        assert_eq!(totals.budget_utilization, 33.3);
        assert_eq!(totals.total_forecast, 50.0);
        assert_eq!(totals.avg_health_score, 88);
        assert_eq!(totals.status_breakdown["in_progress"], 2);
        assert_eq!(totals.status_breakdown["planning"], 1);
    }

    #[test]
    fn empty_portfolio_reports_zeroes() {
        let totals = project_totals(&[]);
        assert_eq!(totals.budget_utilization, 0.0);
        assert_eq!(totals.avg_health_score, 0);
        assert!(totals.status_breakdown.is_empty());
    }

    #[tokio::test]
    async fn stats_on_an_empty_store() {
        let db = Database::in_memory();
        let stats = dashboard_stats(&db).await.unwrap();
        assert_eq!(stats.counts.projects, 0);
        assert!(stats.risks.is_empty());
    }
}
