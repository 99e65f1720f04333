//! Budget lines and fund releases.

use chrono::Utc;

use crate::error::TrackerResult;
use crate::models::budget::{BudgetEntry, FundRelease, NewBudgetEntry};
use crate::store::{Database, Filter};

pub async fn list_entries(
    db: &Database,
    project_id: Option<&str>,
    fiscal_year: Option<&str>,
) -> TrackerResult<Vec<BudgetEntry>> {
    let filter = Filter::new()
        .eq_opt("project_id", project_id)
        .eq_opt("fiscal_year", fiscal_year);
    db.budget.list(&filter).await
}

pub async fn create_entry(db: &Database, request: NewBudgetEntry) -> TrackerResult<BudgetEntry> {
    let entry = db.budget.insert(BudgetEntry::new(request, Utc::now())).await?;
    tracing::info!(
        entry_id = %entry.id,
        project_id = %entry.project_id,
        planned = entry.amount_planned,
        "Budget entry created"
    );
    Ok(entry)
}

pub async fn release_funds(
    db: &Database,
    entry_id: &str,
    release: FundRelease,
    actor: &str,
) -> TrackerResult<BudgetEntry> {
    let entry = db
        .budget
        .modify(entry_id, |e| {
            e.release(&release, actor, Utc::now());
            Ok(())
        })
        .await?;
    tracing::info!(
        entry_id,
        amount = entry.amount_released,
        stage = entry.release_stage.as_deref().unwrap_or_default(),
        "Funds released"
    );
    Ok(entry)
}
