//! Tracker services. Business logic over the typed collections.

pub mod approval_service;
pub mod budget_service;
pub mod export_service;
pub mod issue_service;
pub mod program_service;
pub mod project_service;
pub mod resource_service;
pub mod risk_service;
pub mod task_service;
pub mod user_service;
pub mod vendor_service;
