//! Multi-level approval workflow.
//!
//! Every action runs inside a version-checked write, so two approvers
//! acting on the same level cannot both advance it.

use chrono::Utc;
use serde::Deserialize;

use crate::auth::signature::sign_approval;
use crate::error::{TrackerError, TrackerResult};
use crate::events::approval::ApprovalEvent;
use crate::models::approval::{Approval, NewApproval};
use crate::models::user::User;
use crate::store::{Database, Filter};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateRequest {
    pub delegate_to: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideRequest {
    #[serde(default)]
    pub reason: String,
}

pub async fn list_approvals(
    db: &Database,
    status: Option<&str>,
    entity_type: Option<&str>,
) -> TrackerResult<Vec<Approval>> {
    let filter = Filter::new()
        .eq_opt("status", status)
        .eq_opt("entity_type", entity_type);
    db.approvals.list(&filter).await
}

pub async fn create_approval(
    db: &Database,
    request: NewApproval,
    requester: &User,
) -> TrackerResult<Approval> {
    let approval = Approval::new(request, &requester.id, &requester.name, Utc::now())?;
    let approval = db.approvals.insert(approval).await?;
    tracing::info!(
        approval_id = %approval.id,
        entity_type = %approval.subject.kind,
        entity_id = %approval.subject.id,
        total_levels = approval.total_levels,
        "Approval requested"
    );
    Ok(approval)
}

/// Apply one event built from the record as read on each write attempt.
async fn transition<F>(db: &Database, approval_id: &str, mut event: F) -> TrackerResult<Approval>
where
    F: FnMut(&Approval, chrono::DateTime<Utc>) -> TrackerResult<ApprovalEvent> + Send,
{
    let mut action = "";
    let approval = db
        .approvals
        .modify(approval_id, |approval| {
            let now = Utc::now();
            let next = event(approval, now)?;
            action = next.name();
            approval.apply(&next, now)
        })
        .await?;

    crate::metrics::approval_action(action);
    tracing::info!(
        approval_id,
        action,
        status = approval.status.as_str(),
        level = approval.current_level,
        "Approval updated"
    );
    Ok(approval)
}

pub async fn approve(
    db: &Database,
    secret: &str,
    approval_id: &str,
    actor: &User,
    request: ApproveRequest,
) -> TrackerResult<Approval> {
    transition(db, approval_id, |approval, now| {
        Ok(ApprovalEvent::Approved {
            actor: actor.id.clone(),
            actor_name: actor.name.clone(),
            comments: request.comments.clone(),
            signature: sign_approval(secret, &approval.id, approval.current_level, &actor.id, now)?,
        })
    })
    .await
}

pub async fn reject(
    db: &Database,
    secret: &str,
    approval_id: &str,
    actor: &User,
    request: RejectRequest,
) -> TrackerResult<Approval> {
    transition(db, approval_id, |approval, now| {
        Ok(ApprovalEvent::Rejected {
            actor: actor.id.clone(),
            actor_name: actor.name.clone(),
            reason: request.reason.clone(),
            signature: sign_approval(secret, &approval.id, approval.current_level, &actor.id, now)?,
        })
    })
    .await
}

/// Record a hand-off of the current level. The delegate must exist.
pub async fn delegate(
    db: &Database,
    approval_id: &str,
    actor: &User,
    request: DelegateRequest,
) -> TrackerResult<Approval> {
    if db.users.find_one(&request.delegate_to).await?.is_none() {
        return Err(TrackerError::NotFound("Delegate user not found".into()));
    }
    transition(db, approval_id, |_, _| {
        Ok(ApprovalEvent::Delegated {
            from: actor.id.clone(),
            to: request.delegate_to.clone(),
            reason: request.reason.clone(),
        })
    })
    .await
}

/// Approve outright, skipping the remaining levels. Callers check the admin
/// role before this runs.
pub async fn emergency_override(
    db: &Database,
    approval_id: &str,
    actor: &User,
    request: OverrideRequest,
) -> TrackerResult<Approval> {
    let approval = transition(db, approval_id, |_, _| {
        Ok(ApprovalEvent::EmergencyOverride {
            actor: actor.id.clone(),
            reason: request.reason.clone(),
        })
    })
    .await?;
    tracing::warn!(approval_id, actor = %actor.id, "Emergency override applied");
    Ok(approval)
}

/// Pending approvals past their SLA deadline.
pub async fn overdue(db: &Database) -> TrackerResult<Vec<Approval>> {
    let now = Utc::now();
    Ok(db
        .approvals
        .list(&Filter::new().eq("status", "pending"))
        .await?
        .into_iter()
        .filter(|a| a.is_overdue(now))
        .collect())
}
