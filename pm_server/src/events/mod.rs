//! Workflow events.
//!
//! Approval requests change state only by applying an [`approval::ApprovalEvent`].

pub mod approval;
