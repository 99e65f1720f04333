//! Issue log.

use chrono::Utc;

use crate::error::TrackerResult;
use crate::models::issue::{Issue, NewIssue};
use crate::models::Escalation;
use crate::store::{Database, Filter};

pub async fn list_issues(
    db: &Database,
    project_id: Option<&str>,
    status: Option<&str>,
) -> TrackerResult<Vec<Issue>> {
    let filter = Filter::new()
        .eq_opt("project_id", project_id)
        .eq_opt("status", status);
    db.issues.list(&filter).await
}

pub async fn create_issue(db: &Database, request: NewIssue, reporter: &str) -> TrackerResult<Issue> {
    let issue = db.issues.insert(Issue::new(request, reporter, Utc::now())).await?;
    tracing::info!(
        issue_id = %issue.id,
        project_id = %issue.project_id,
        severity = issue.severity.as_str(),
        "Issue reported"
    );
    Ok(issue)
}

pub async fn escalate_issue(
    db: &Database,
    issue_id: &str,
    escalation: Escalation,
) -> TrackerResult<Issue> {
    let issue = db
        .issues
        .modify(issue_id, |i| {
            i.escalate(&escalation);
            Ok(())
        })
        .await?;
    tracing::info!(issue_id, escalation_level = issue.escalation_level, "Issue escalated");
    Ok(issue)
}
