//! Tasks and acceptance reviews.

use chrono::Utc;

use crate::error::TrackerResult;
use crate::models::task::{AcceptanceReview, NewTask, Task};
use crate::store::{Database, Filter};

pub async fn list_tasks(
    db: &Database,
    project_id: Option<&str>,
    status: Option<&str>,
) -> TrackerResult<Vec<Task>> {
    let filter = Filter::new()
        .eq_opt("project_id", project_id)
        .eq_opt("status", status);
    db.tasks.list(&filter).await
}

pub async fn create_task(db: &Database, request: NewTask) -> TrackerResult<Task> {
    let task = db.tasks.insert(Task::new(request, Utc::now())).await?;
    tracing::info!(
        task_id = %task.id,
        project_id = %task.project_id,
        wbs_code = %task.wbs_code,
        "Task created"
    );
    Ok(task)
}

pub async fn accept_task(
    db: &Database,
    task_id: &str,
    review: AcceptanceReview,
    actor: &str,
) -> TrackerResult<Task> {
    let task = db
        .tasks
        .modify(task_id, |t| {
            t.accept(&review, actor, Utc::now());
            Ok(())
        })
        .await?;
    tracing::info!(task_id, outcome = review.status(), "Task acceptance recorded");
    Ok(task)
}
