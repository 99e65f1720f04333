//! Approval workflow events and the state machine that applies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::models::approval::{Approval, ApprovalStatus, ChainEntry};

/// Actions taken on an approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ApprovalEvent {
    /// Sign off the current level.
    Approved {
        actor: String,
        actor_name: String,
        comments: String,
        signature: String,
    },
    /// Reject the whole request.
    Rejected {
        actor: String,
        actor_name: String,
        reason: String,
        signature: String,
    },
    /// Hand the current level to another user.
    Delegated {
        from: String,
        to: String,
        reason: String,
    },
    /// Admin bypass of the remaining levels.
    EmergencyOverride { actor: String, reason: String },
}

impl ApprovalEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ApprovalEvent::Approved { .. } => "approve",
            ApprovalEvent::Rejected { .. } => "reject",
            ApprovalEvent::Delegated { .. } => "delegate",
            ApprovalEvent::EmergencyOverride { .. } => "emergency_override",
        }
    }
}

impl Approval {
    /// Apply one workflow event. Approved and rejected requests refuse every
    /// event and are left untouched.
    pub fn apply(&mut self, event: &ApprovalEvent, now: DateTime<Utc>) -> TrackerResult<()> {
        if self.status.is_terminal() {
            return Err(TrackerError::Conflict(format!(
                "Approval is already {}",
                self.status.as_str()
            )));
        }

        let level = self.current_level;
        match event {
            ApprovalEvent::Approved {
                actor,
                actor_name,
                comments,
                signature,
            } => {
                self.approval_chain.push(ChainEntry::Approve {
                    level,
                    actor: actor.clone(),
                    actor_name: actor_name.clone(),
                    timestamp: now,
                    comments: comments.clone(),
                    signature: signature.clone(),
                });
                if self.current_level >= self.total_levels {
                    self.status = ApprovalStatus::Approved;
                } else {
                    self.current_level += 1;
                }
            }
            ApprovalEvent::Rejected {
                actor,
                actor_name,
                reason,
                signature,
            } => {
                self.approval_chain.push(ChainEntry::Reject {
                    level,
                    actor: actor.clone(),
                    actor_name: actor_name.clone(),
                    timestamp: now,
                    reason: reason.clone(),
                    signature: signature.clone(),
                });
                self.status = ApprovalStatus::Rejected;
            }
            ApprovalEvent::Delegated { from, to, reason } => {
                self.approval_chain.push(ChainEntry::Delegate {
                    level,
                    from: from.clone(),
                    to: to.clone(),
                    timestamp: now,
                    reason: reason.clone(),
                });
            }
            ApprovalEvent::EmergencyOverride { actor, reason } => {
                self.approval_chain.push(ChainEntry::EmergencyOverride {
                    level,
                    actor: actor.clone(),
                    timestamp: now,
                    reason: reason.clone(),
                });
                self.status = ApprovalStatus::Approved;
                self.is_emergency = true;
                self.emergency_override_by = Some(actor.clone());
                self.emergency_reason = Some(reason.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::approval::NewApproval;

    fn approval(levels: i64) -> Approval {
        Approval::new(
            NewApproval {
                entity_type: "project".into(),
                entity_id: "proj-1".into(),
                title: "Phase gate".into(),
                description: None,
                amount: None,
                total_levels: levels,
                sla_hours: 48,
            },
            "requester",
            "Requester",
            Utc::now(),
        )
        .unwrap()
    }

    fn approve(actor: &str) -> ApprovalEvent {
        ApprovalEvent::Approved {
            actor: actor.into(),
            actor_name: actor.into(),
            comments: String::new(),
            signature: "SIG-0000000000000000".into(),
        }
    }

    #[test]
    fn three_level_request_needs_three_approvals() {
        let mut a = approval(3);
        let now = Utc::now();

        a.apply(&approve("u1"), now).unwrap();
        assert_eq!((a.current_level, a.status), (2, ApprovalStatus::Pending));
        a.apply(&approve("u2"), now).unwrap();
        assert_eq!((a.current_level, a.status), (3, ApprovalStatus::Pending));
        a.apply(&approve("u3"), now).unwrap();
        assert_eq!((a.current_level, a.status), (3, ApprovalStatus::Approved));

        let levels: Vec<i64> = a
            .approval_chain
            .iter()
            .map(|e| match e {
                ChainEntry::Approve { level, .. } => *level,
                other => panic!("unexpected entry {other:?}"),
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 3]);
    }

    #[test]
    fn terminal_requests_refuse_further_events() {
        let mut a = approval(1);
        let now = Utc::now();
        a.apply(&approve("u1"), now).unwrap();
        assert_eq!(a.status, ApprovalStatus::Approved);

        let before = a.approval_chain.len();
        let err = a
            .apply(
                &ApprovalEvent::Rejected {
                    actor: "u2".into(),
                    actor_name: "u2".into(),
                    reason: "late".into(),
                    signature: String::new(),
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(_)));
        assert_eq!(a.status, ApprovalStatus::Approved);
        assert_eq!(a.approval_chain.len(), before);
    }

    #[test]
    fn delegation_only_appends_to_the_chain() {
        let mut a = approval(2);
        a.apply(
            &ApprovalEvent::Delegated {
                from: "u1".into(),
                to: "u2".into(),
                reason: "on leave".into(),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(a.current_level, 1);
        assert_eq!(a.status, ApprovalStatus::Pending);
        assert_eq!(a.approval_chain.len(), 1);
    }

    #[test]
    fn emergency_override_approves_and_audits() {
        let mut a = approval(3);
        a.apply(
            &ApprovalEvent::EmergencyOverride {
                actor: "admin".into(),
                reason: "operational necessity".into(),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(a.status, ApprovalStatus::Approved);
        assert!(a.is_emergency);
        assert_eq!(a.emergency_override_by.as_deref(), Some("admin"));
        assert!(matches!(
            a.approval_chain.last(),
            Some(ChainEntry::EmergencyOverride { .. })
        ));
    }
}
