//! Risk register.

use chrono::Utc;

use crate::error::TrackerResult;
use crate::models::risk::{NewRisk, Risk};
use crate::models::Escalation;
use crate::store::{Database, Filter};

pub async fn list_risks(
    db: &Database,
    project_id: Option<&str>,
    level: Option<&str>,
) -> TrackerResult<Vec<Risk>> {
    let filter = Filter::new()
        .eq_opt("project_id", project_id)
        .eq_opt("level", level);
    db.risks.list(&filter).await
}

pub async fn create_risk(db: &Database, request: NewRisk, owner_id: &str) -> TrackerResult<Risk> {
    let risk = db.risks.insert(Risk::new(request, owner_id, Utc::now())).await?;
    tracing::info!(
        risk_id = %risk.id,
        score = risk.risk_score,
        level = risk.level.as_str(),
        "Risk registered"
    );
    Ok(risk)
}

pub async fn escalate_risk(
    db: &Database,
    risk_id: &str,
    escalation: Escalation,
) -> TrackerResult<Risk> {
    let risk = db
        .risks
        .modify(risk_id, |r| {
            r.escalate(&escalation);
            Ok(())
        })
        .await?;
    tracing::info!(
        risk_id,
        escalation_level = risk.escalation_level,
        escalated_to = risk.escalated_to.as_deref().unwrap_or_default(),
        "Risk escalated"
    );
    Ok(risk)
}
