//! Collection exports as CSV or JSON.

use std::str::FromStr;

use serde_json::Value;

use crate::error::{TrackerError, TrackerResult};
use crate::store::{Database, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Projects,
    Tasks,
    Budget,
    Risks,
    Resources,
    Vendors,
    Contracts,
    Issues,
    Programs,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Projects => "projects",
            ExportKind::Tasks => "tasks",
            ExportKind::Budget => "budget",
            ExportKind::Risks => "risks",
            ExportKind::Resources => "resources",
            ExportKind::Vendors => "vendors",
            ExportKind::Contracts => "contracts",
            ExportKind::Issues => "issues",
            ExportKind::Programs => "programs",
        }
    }

    /// Whether the exported records carry a `project_id`.
    fn scoped_by_project(&self) -> bool {
        matches!(
            self,
            ExportKind::Tasks
                | ExportKind::Budget
                | ExportKind::Risks
                | ExportKind::Contracts
                | ExportKind::Issues
        )
    }
}

impl FromStr for ExportKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" => Ok(ExportKind::Projects),
            "tasks" => Ok(ExportKind::Tasks),
            "budget" => Ok(ExportKind::Budget),
            "risks" => Ok(ExportKind::Risks),
            "resources" => Ok(ExportKind::Resources),
            "vendors" => Ok(ExportKind::Vendors),
            "contracts" => Ok(ExportKind::Contracts),
            "issues" => Ok(ExportKind::Issues),
            "programs" => Ok(ExportKind::Programs),
            other => Err(TrackerError::NotFound(format!(
                "Unknown export type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(TrackerError::Validation(format!(
                "Unsupported export format: {other}"
            ))),
        }
    }
}

pub async fn documents(
    db: &Database,
    kind: ExportKind,
    project_id: Option<&str>,
) -> TrackerResult<Vec<Value>> {
    let filter = if kind.scoped_by_project() {
        Filter::new().eq_opt("project_id", project_id)
    } else {
        Filter::new()
    };

    let rows = match kind {
        ExportKind::Projects => db.projects.documents(&filter).await?,
        ExportKind::Tasks => db.tasks.documents(&filter).await?,
        ExportKind::Budget => db.budget.documents(&filter).await?,
        ExportKind::Risks => db.risks.documents(&filter).await?,
        ExportKind::Resources => db.resources.documents(&filter).await?,
        ExportKind::Vendors => db.vendors.documents(&filter).await?,
        ExportKind::Contracts => db.contracts.documents(&filter).await?,
        ExportKind::Issues => db.issues.documents(&filter).await?,
        ExportKind::Programs => db.programs.documents(&filter).await?,
    };
    Ok(rows)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render documents as CSV. Columns are the first document's fields in
/// sorted order, with fields first seen in later documents appended.
pub fn to_csv(rows: &[Value]) -> TrackerResult<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Some(object) = row.as_object() {
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let failed = |e: csv::Error| TrackerError::Internal(format!("CSV export failed: {e}"));
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !columns.is_empty() {
        writer.write_record(&columns).map_err(failed)?;
    }
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| cell(row.get(c))))
            .map_err(failed)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TrackerError::Internal(format!("CSV export failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| TrackerError::Internal(format!("CSV export failed: {e}")))
}
