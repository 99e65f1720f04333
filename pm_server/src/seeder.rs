//! Demo data seeder. Wipes every collection and loads a small defense
//! portfolio.
//!
//! Fixtures are decoded into their record types and inserted through the
//! collections, so derived fields are recomputed rather than trusted.

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth;
use crate::error::{TrackerError, TrackerResult};
use crate::models::clearance::Clearance;
use crate::models::user::{Role, User};
use crate::store::{Collection, Database, Filter, Record};

const ADMIN_EMAIL: &str = "admin@defense.gov";
const ADMIN_PASSWORD: &str = "admin123";
const STAFF_PASSWORD: &str = "password123";

/// Records loaded per collection.
#[derive(Debug, Default, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub programs: usize,
    pub projects: usize,
    pub tasks: usize,
    pub resources: usize,
    pub risks: usize,
    pub vendors: usize,
    pub budget_entries: usize,
    pub approvals: usize,
    pub issues: usize,
}

fn decode<T: Record>(fixtures: Value) -> TrackerResult<Vec<T>> {
    serde_json::from_value(fixtures)
        .map_err(|e| TrackerError::Internal(format!("{} fixtures are malformed: {e}", T::LABEL)))
}

async fn load<T: Record>(
    collection: &Collection<T>,
    fixtures: Value,
) -> TrackerResult<usize> {
    collection.insert_many(decode::<T>(fixtures)?).await
}

/// Reset the store to the demo portfolio.
pub async fn seed(db: &Database, bcrypt_cost: u32) -> TrackerResult<SeedSummary> {
    tracing::info!("Seeding demo data...");

    db.programs.delete_all().await?;
    db.projects.delete_all().await?;
    db.tasks.delete_all().await?;
    db.resources.delete_all().await?;
    db.risks.delete_all().await?;
    db.vendors.delete_all().await?;
    db.budget.delete_all().await?;
    db.approvals.delete_all().await?;
    db.contracts.delete_all().await?;
    db.issues.delete_all().await?;

    let users = seed_users(db, bcrypt_cost).await?;
    let now = Utc::now().to_rfc3339();

    let summary = SeedSummary {
        users,
        programs: load(&db.programs, programs(&now)).await?,
        projects: load(&db.projects, projects(&now)).await?,
        tasks: load(&db.tasks, tasks(&now)).await?,
        resources: load(&db.resources, resources(&now)).await?,
        risks: load(&db.risks, risks(&now)).await?,
        vendors: load(&db.vendors, vendors(&now)).await?,
        budget_entries: load(&db.budget, budget(&now)).await?,
        approvals: load(&db.approvals, approvals()).await?,
        issues: load(&db.issues, issues(&now)).await?,
    };

    tracing::info!(
        programs = summary.programs,
        projects = summary.projects,
        resources = summary.resources,
        "Demo data seeded"
    );
    Ok(summary)
}

/// Replace the three demo accounts, leaving other users alone.
async fn seed_users(db: &Database, bcrypt_cost: u32) -> TrackerResult<usize> {
    let accounts = [
        (
            "user-admin-001",
            ADMIN_EMAIL,
            "Col. Rajesh Kumar",
            Role::Admin,
            Clearance::TopSecret,
            "Command Operations",
            "Colonel",
        ),
        (
            "user-mgr-001",
            "manager@defense.gov",
            "Maj. Priya Singh",
            Role::Manager,
            Clearance::Secret,
            "Engineering",
            "Major",
        ),
        (
            "user-usr-001",
            "user@defense.gov",
            "Capt. Amit Sharma",
            Role::User,
            Clearance::Confidential,
            "Operations",
            "Captain",
        ),
    ];

    for (id, email, ..) in &accounts {
        for existing in db.users.list(&Filter::new().eq("email", *email)).await? {
            db.users.delete(&existing.id).await?;
        }
        if db.users.find_one(id).await?.is_some() {
            db.users.delete(id).await?;
        }
    }

    let admin_hash = auth::hash_password(ADMIN_PASSWORD.to_string(), bcrypt_cost).await?;
    let staff_hash = auth::hash_password(STAFF_PASSWORD.to_string(), bcrypt_cost).await?;
    let now = Utc::now();

    let users: Vec<User> = accounts
        .into_iter()
        .map(|(id, email, name, role, clearance, department, rank)| User {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            clearance_level: clearance,
            department: Some(department.to_string()),
            rank: Some(rank.to_string()),
            can_delegate: role == Role::Admin,
            delegated_to: None,
            password_hash: if role == Role::Admin {
                admin_hash.clone()
            } else {
                staff_hash.clone()
            },
            created_at: now,
        })
        .collect();

    db.users.insert_many(users).await
}

fn programs(now: &str) -> Value {
    json!([
        {
            "id": "prog-001",
            "name": "AEGIS Defence Shield",
            "code": "ADS-2024",
            "description": "Multi-layered air defence system integration programme",
            "objectives": ["Unified command structure", "Real-time threat detection", "Automated response protocols"],
            "charter": "To establish comprehensive air defence coverage across strategic sectors",
            "mandate": "Ministry of Defence Directive 2024/DEF/001",
            "start_date": "2024-01-01",
            "end_date": "2028-12-31",
            "budget_total": 45000000000.0,
            "budget_allocated": 12500000000.0,
            "status": "in_progress",
            "health_score": 87,
            "owner_id": "user-admin-001",
            "success_kpis": [
                {"name": "Coverage Area", "target": 95, "current": 78, "unit": "%"},
                {"name": "Response Time", "target": 2, "current": 2.3, "unit": "sec"}
            ],
            "created_at": now,
            "updated_at": now
        },
        {
            "id": "prog-002",
            "name": "TITAN Infrastructure Modernisation",
            "code": "TIM-2024",
            "description": "Critical infrastructure upgrade across all military bases",
            "objectives": ["Power grid modernisation", "Communication network upgrade", "Facility hardening"],
            "start_date": "2024-03-01",
            "end_date": "2027-06-30",
            "budget_total": 28000000000.0,
            "budget_allocated": 8500000000.0,
            "status": "in_progress",
            "health_score": 72,
            "owner_id": "user-admin-001",
            "created_at": now,
            "updated_at": now
        },
        {
            "id": "prog-003",
            "name": "PHANTOM Cyber Operations",
            "code": "PCO-2024",
            "description": "Advanced cyber warfare and defence capabilities",
            "objectives": ["Offensive capabilities", "Network defence", "AI-driven threat detection"],
            "start_date": "2024-06-01",
            "end_date": "2026-12-31",
            "budget_total": 18000000000.0,
            "budget_allocated": 6000000000.0,
            "status": "planning",
            "health_score": 95,
            "owner_id": "user-admin-001",
            "created_at": now,
            "updated_at": now
        }
    ])
}

fn projects(now: &str) -> Value {
    json!([
        {
            "id": "proj-001",
            "program_id": "prog-001",
            "name": "Radar Integration Phase 1",
            "code": "ADS-RAD-001",
            "description": "Integration of coastal radar systems into unified network",
            "template": "Weapon Systems",
            "start_date": "2024-01-15",
            "end_date": "2025-06-30",
            "budget_allocated": 4500000000.0,
            "budget_spent": 1850000000.0,
            "budget_forecast": 4200000000.0,
            "status": "in_progress",
            "progress": 41,
            "phase": "Phase 2",
            "phase_gate_status": "approved",
            "buffer_days": 30,
            "contingency_budget": 450000000.0,
            "schedule_variance": -5.2,
            "milestones": [
                {"name": "Requirements Complete", "date": "2024-03-01", "status": "completed"},
                {"name": "System Design", "date": "2024-06-01", "status": "completed"},
                {"name": "Integration Testing", "date": "2024-12-01", "status": "in_progress"},
                {"name": "Deployment", "date": "2025-06-30", "status": "pending"}
            ],
            "dependencies": [
                {"type": "vendor", "id": "vendor-001", "description": "Radar unit delivery"},
                {"type": "approval", "id": "approval-001", "description": "Security clearance"}
            ],
            "kpis": [
                {"name": "Detection Range", "target": 500, "current": 420, "unit": "km"},
                {"name": "Response Time", "target": 2, "current": 2.5, "unit": "sec"}
            ],
            "scenarios": [
                {"name": "Best Case", "end_date": "2025-04-30", "budget": 4000000000.0},
                {"name": "Worst Case", "end_date": "2025-09-30", "budget": 5200000000.0},
                {"name": "Most Likely", "end_date": "2025-06-30", "budget": 4500000000.0}
            ],
            "clearance_level": "secret",
            "manager_id": "user-mgr-001",
            "created_at": now,
            "updated_at": now
        },
        {
            "id": "proj-002",
            "program_id": "prog-001",
            "name": "Command Centre Upgrade",
            "code": "ADS-CMD-002",
            "description": "Central command centre modernisation with AI integration",
            "template": "IT",
            "start_date": "2024-04-01",
            "end_date": "2025-12-31",
            "budget_allocated": 3500000000.0,
            "budget_spent": 820000000.0,
            "status": "in_progress",
            "progress": 23,
            "milestones": [
                {"name": "Architecture Design", "date": "2024-06-01", "status": "completed"},
                {"name": "Hardware Procurement", "date": "2024-09-01", "status": "in_progress"},
                {"name": "Software Development", "date": "2025-06-01", "status": "pending"},
                {"name": "Go Live", "date": "2025-12-31", "status": "pending"}
            ],
            "clearance_level": "top_secret",
            "manager_id": "user-admin-001",
            "created_at": now,
            "updated_at": now
        },
        {
            "id": "proj-003",
            "program_id": "prog-002",
            "name": "Power Grid Hardening",
            "code": "TIM-PWR-001",
            "description": "EMP-resistant power infrastructure deployment",
            "template": "Infrastructure",
            "start_date": "2024-03-15",
            "end_date": "2026-03-15",
            "budget_allocated": 5200000000.0,
            "budget_spent": 1280000000.0,
            "status": "in_progress",
            "progress": 25,
            "clearance_level": "confidential",
            "created_at": now,
            "updated_at": now
        },
        {
            "id": "proj-004",
            "program_id": "prog-003",
            "name": "AI Threat Detection System",
            "code": "PCO-AI-001",
            "description": "Machine learning based cyber threat detection",
            "template": "R&D",
            "start_date": "2024-06-15",
            "end_date": "2025-12-31",
            "budget_allocated": 2800000000.0,
            "budget_spent": 450000000.0,
            "status": "planning",
            "progress": 16,
            "phase": "Research",
            "clearance_level": "top_secret",
            "created_at": now,
            "updated_at": now
        },
        {
            "id": "proj-005",
            "program_id": "prog-002",
            "name": "Secure Communications Network",
            "code": "TIM-COM-002",
            "description": "Encrypted communication infrastructure upgrade",
            "template": "IT",
            "start_date": "2024-05-01",
            "end_date": "2025-08-31",
            "budget_allocated": 1800000000.0,
            "budget_spent": 720000000.0,
            "status": "in_progress",
            "progress": 40,
            "phase": "Phase 2",
            "clearance_level": "secret",
            "created_at": now,
            "updated_at": now
        }
    ])
}

fn tasks(now: &str) -> Value {
    json!([
        {
            "id": "task-001", "project_id": "proj-001", "wbs_code": "1.1.1",
            "name": "Site Survey - Northern Sector",
            "description": "Complete radar site survey for northern coastal installations",
            "status": "completed", "priority": "high",
            "start_date": "2024-01-15", "end_date": "2024-02-28",
            "estimated_hours": 480.0, "actual_hours": 520.0, "progress": 100,
            "assigned_to": ["user-admin-001"], "assigned_unit": "Survey Division",
            "clearance_level": "secret", "acceptance_status": "accepted",
            "is_critical_path": true, "float_days": 0.0,
            "created_at": now, "updated_at": now
        },
        {
            "id": "task-002", "project_id": "proj-001", "wbs_code": "1.1.2",
            "name": "Equipment Procurement",
            "description": "Procure radar units and support equipment",
            "status": "in_progress", "priority": "critical",
            "start_date": "2024-03-01", "end_date": "2024-08-31",
            "estimated_hours": 200.0, "actual_hours": 85.0, "progress": 42,
            "assigned_to": ["user-mgr-001"], "assigned_vendor": "vendor-001",
            "clearance_level": "confidential", "is_critical_path": true,
            "dependencies": [{"task_id": "task-001", "type": "finish_to_start"}],
            "created_at": now, "updated_at": now
        },
        {
            "id": "task-003", "project_id": "proj-001", "wbs_code": "1.2.1",
            "name": "Network Infrastructure",
            "description": "Deploy secure network backbone for radar integration",
            "status": "in_progress", "priority": "high",
            "start_date": "2024-04-01", "end_date": "2024-10-31",
            "estimated_hours": 640.0, "actual_hours": 280.0, "progress": 44,
            "clearance_level": "secret", "float_days": 15.0,
            "created_at": now, "updated_at": now
        },
        {
            "id": "task-004", "project_id": "proj-002", "wbs_code": "2.1.1",
            "name": "Server Room Preparation",
            "description": "Prepare secure server room with required cooling and power",
            "status": "completed", "priority": "high",
            "start_date": "2024-04-01", "end_date": "2024-06-30",
            "estimated_hours": 320.0, "actual_hours": 340.0, "progress": 100,
            "clearance_level": "top_secret", "acceptance_status": "accepted",
            "float_days": 5.0,
            "created_at": now, "updated_at": now
        },
        {
            "id": "task-005", "project_id": "proj-002", "wbs_code": "2.1.2",
            "name": "Hardware Installation",
            "description": "Install servers and networking equipment",
            "status": "in_progress", "priority": "critical",
            "start_date": "2024-07-01", "end_date": "2024-10-31",
            "estimated_hours": 480.0, "actual_hours": 120.0, "progress": 25,
            "clearance_level": "top_secret",
            "dependencies": [{"task_id": "task-004", "type": "finish_to_start"}],
            "created_at": now, "updated_at": now
        },
        {
            "id": "task-006", "project_id": "proj-003", "wbs_code": "3.1.1",
            "name": "Assessment Phase",
            "description": "Assess current power infrastructure vulnerabilities",
            "status": "completed", "priority": "medium",
            "start_date": "2024-03-15", "end_date": "2024-05-31",
            "estimated_hours": 240.0, "actual_hours": 260.0, "progress": 100,
            "float_days": 10.0,
            "created_at": now, "updated_at": now
        },
        {
            "id": "task-007", "project_id": "proj-003", "wbs_code": "3.1.2",
            "name": "Equipment Design",
            "description": "Design EMP-resistant power systems",
            "status": "in_progress", "priority": "high",
            "start_date": "2024-06-01", "end_date": "2024-12-31",
            "estimated_hours": 800.0, "actual_hours": 350.0, "progress": 44,
            "created_at": now, "updated_at": now
        },
        {
            "id": "task-008", "project_id": "proj-004", "wbs_code": "4.1.1",
            "name": "ML Model Research",
            "description": "Research and select ML models for threat detection",
            "status": "in_progress", "priority": "medium",
            "start_date": "2024-06-15", "end_date": "2024-09-30",
            "estimated_hours": 400.0, "actual_hours": 180.0, "progress": 45,
            "clearance_level": "top_secret",
            "created_at": now, "updated_at": now
        }
    ])
}

fn resources(now: &str) -> Value {
    json!([
        {
            "id": "res-001",
            "name": "Lt. Col. Sarah Khan",
            "type": "human",
            "department": "Engineering",
            "unit": "Technical Division",
            "skills": ["Systems Integration", "Network Security", "Project Management"],
            "certifications": ["PMP", "CISSP", "TS/SCI"],
            "clearance_level": "top_secret",
            "capacity_hours": 160.0,
            "allocated_hours": 136.0,
            "hourly_rate": 12500.0,
            "allocated_projects": ["proj-001", "proj-002"],
            "project_hours": {"proj-001": 96.0, "proj-002": 40.0},
            "created_at": now
        },
        {
            "id": "res-002",
            "name": "Dr. Vikram Patel",
            "type": "human",
            "department": "R&D",
            "unit": "AI Research Lab",
            "skills": ["Machine Learning", "Cyber Security", "Data Science"],
            "certifications": ["PhD CS", "CISM"],
            "clearance_level": "top_secret",
            "capacity_hours": 160.0,
            "allocated_hours": 112.0,
            "hourly_rate": 15000.0,
            "allocated_projects": ["proj-004"],
            "project_hours": {"proj-004": 112.0},
            "created_at": now
        },
        {
            "id": "res-003",
            "name": "Mobile Radar Unit Alpha",
            "type": "equipment",
            "department": "Operations",
            "clearance_level": "secret",
            "capacity_hours": 720.0,
            "allocated_hours": 432.0,
            "hourly_rate": 50000.0,
            "allocated_projects": ["proj-001"],
            "project_hours": {"proj-001": 432.0},
            "created_at": now
        },
        {
            "id": "res-004",
            "name": "Secure Data Centre - Building 7",
            "type": "facility",
            "department": "IT",
            "clearance_level": "top_secret",
            "capacity_hours": 720.0,
            "allocated_hours": 324.0,
            "hourly_rate": 100000.0,
            "allocated_projects": ["proj-002", "proj-004"],
            "project_hours": {"proj-002": 200.0, "proj-004": 124.0},
            "created_at": now
        }
    ])
}

fn risks(now: &str) -> Value {
    json!([
        {
            "id": "risk-001", "project_id": "proj-001",
            "title": "Vendor Delivery Delays",
            "description": "Critical radar components may face supply chain delays",
            "category": "Supply Chain", "probability": 4, "impact": 4,
            "mitigation_plan": "Identify alternative vendors and maintain 3-month buffer stock",
            "mitigation_status": "in_progress", "mitigation_progress": 45,
            "contingency_plan": "Fast-track procurement from secondary vendor",
            "status": "open", "owner_id": "user-admin-001",
            "related_dependencies": ["vendor-001"],
            "created_at": now, "updated_at": now
        },
        {
            "id": "risk-002", "project_id": "proj-001",
            "title": "Integration Compatibility Issues",
            "description": "Legacy systems may not integrate seamlessly",
            "category": "Technical", "probability": 3, "impact": 4,
            "mitigation_plan": "Conduct thorough compatibility testing in staging environment",
            "mitigation_status": "in_progress", "mitigation_progress": 60,
            "status": "mitigating",
            "created_at": now, "updated_at": now
        },
        {
            "id": "risk-003", "project_id": "proj-002",
            "title": "Budget Overrun",
            "description": "Hardware costs increasing due to market conditions",
            "category": "Financial", "probability": 3, "impact": 3,
            "mitigation_plan": "Lock in prices with long-term contracts",
            "status": "open",
            "created_at": now, "updated_at": now
        },
        {
            "id": "risk-004", "project_id": "proj-003",
            "title": "Weather Delays",
            "description": "Outdoor installation work may be delayed due to monsoon",
            "category": "Environmental", "probability": 2, "impact": 2,
            "mitigation_plan": "Build weather contingency into schedule",
            "status": "open",
            "created_at": now, "updated_at": now
        },
        {
            "id": "risk-005", "project_id": "proj-004",
            "title": "Security Clearance Delays",
            "description": "New personnel clearances taking longer than expected",
            "category": "Administrative", "probability": 4, "impact": 3,
            "mitigation_plan": "Start clearance process early, use existing cleared personnel",
            "status": "open",
            "created_at": now, "updated_at": now
        }
    ])
}

fn vendors(now: &str) -> Value {
    json!([
        {
            "id": "vendor-001", "name": "Bharat Defence Systems", "code": "BDS-001",
            "contact_email": "contracts@bharatdefence.in", "contact_phone": "+91-11-23456789",
            "category": "Weapon Systems", "rating": 92, "contracts_active": 3,
            "total_value": 8500000000.0, "status": "active",
            "due_diligence_status": "completed", "sla_compliance": 95.0,
            "created_at": now
        },
        {
            "id": "vendor-002", "name": "SecureNet Communications", "code": "SNC-002",
            "contact_email": "sales@securenetcomm.in", "contact_phone": "+91-80-98765432",
            "category": "IT", "rating": 88, "contracts_active": 2,
            "total_value": 1200000000.0, "status": "active",
            "due_diligence_status": "completed", "sla_compliance": 92.0,
            "created_at": now
        },
        {
            "id": "vendor-003", "name": "PowerGrid Solutions", "code": "PGS-003",
            "contact_email": "projects@powergrid.in", "contact_phone": "+91-22-11223344",
            "category": "Infrastructure", "rating": 75, "contracts_active": 1,
            "total_value": 2800000000.0, "status": "active",
            "risk_flags": ["Delivery delays reported"],
            "due_diligence_status": "completed", "sla_compliance": 78.0,
            "created_at": now
        },
        {
            "id": "vendor-004", "name": "AI Defence Labs", "code": "AIDL-004",
            "contact_email": "research@aidefencelabs.in",
            "category": "R&D", "rating": 95, "contracts_active": 1,
            "total_value": 1500000000.0, "status": "active",
            "due_diligence_status": "completed", "sla_compliance": 98.0,
            "created_at": now
        }
    ])
}

fn budget(now: &str) -> Value {
    json!([
        {
            "id": "budget-001", "project_id": "proj-001",
            "category": "CAPEX", "sub_category": "Equipment",
            "description": "Radar unit procurement",
            "amount_planned": 2500000000.0, "amount_actual": 1200000000.0,
            "amount_forecast": 2400000000.0, "amount_released": 1500000000.0,
            "fiscal_year": "2024", "quarter": "Q2",
            "status": "released", "release_stage": "Phase 1",
            "created_at": now
        },
        {
            "id": "budget-002", "project_id": "proj-001",
            "category": "OPEX", "sub_category": "Services",
            "description": "Installation and integration services",
            "amount_planned": 800000000.0, "amount_actual": 350000000.0,
            "amount_forecast": 780000000.0,
            "fiscal_year": "2024", "quarter": "Q3", "status": "approved",
            "created_at": now
        },
        {
            "id": "budget-003", "project_id": "proj-002",
            "category": "CAPEX", "sub_category": "Hardware",
            "description": "Server and networking equipment",
            "amount_planned": 1500000000.0, "amount_actual": 600000000.0,
            "fiscal_year": "2024", "quarter": "Q3", "status": "approved",
            "created_at": now
        }
    ])
}

fn approvals() -> Value {
    let now = Utc::now();
    let deadline = |hours: i64| (now + Duration::hours(hours)).to_rfc3339();
    let now = now.to_rfc3339();

    json!([
        {
            "id": "approval-001",
            "entity_type": "budget",
            "entity_id": "budget-002",
            "title": "Budget Release - Phase 2 Installation Services",
            "description": "Request for fund release for installation services",
            "amount": 450000000.0,
            "requested_by": "user-mgr-001",
            "requested_by_name": "Maj. Priya Singh",
            "current_level": 2,
            "total_levels": 3,
            "status": "pending",
            "sla_hours": 48,
            "sla_deadline": deadline(48),
            "approval_chain": [
                {
                    "action": "approve",
                    "level": 1,
                    "actor": "user-mgr-001",
                    "actor_name": "Maj. Priya Singh",
                    "timestamp": now,
                    "comments": "Scope verified",
                    "signature": "SIG-MGR001-20241215"
                }
            ],
            "created_at": now,
            "updated_at": now
        },
        {
            "id": "approval-002",
            "entity_type": "project",
            "entity_id": "proj-001",
            "title": "Phase Gate Approval - Move to Phase 3",
            "description": "Go/No-Go decision for moving to Phase 3 of radar integration",
            "requested_by": "user-admin-001",
            "requested_by_name": "Col. Rajesh Kumar",
            "current_level": 1,
            "total_levels": 2,
            "status": "pending",
            "sla_hours": 72,
            "sla_deadline": deadline(72),
            "created_at": now,
            "updated_at": now
        }
    ])
}

fn issues(now: &str) -> Value {
    json!([
        {
            "id": "issue-001", "project_id": "proj-001",
            "title": "Network latency in northern sector",
            "description": "High latency observed in communication between radar units",
            "category": "Technical", "severity": "high", "status": "open",
            "reported_by": "user-usr-001", "assigned_to": "user-mgr-001",
            "escalation_level": 0, "due_date": "2024-12-30",
            "created_at": now, "updated_at": now
        },
        {
            "id": "issue-002", "project_id": "proj-003",
            "title": "Permit delays for site access",
            "description": "Environmental clearance pending for 3 installation sites",
            "category": "Administrative", "severity": "medium", "status": "in_progress",
            "reported_by": "user-mgr-001",
            "escalation_level": 1, "escalated_to": "user-admin-001",
            "created_at": now, "updated_at": now
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Level;

    #[tokio::test]
    async fn seeding_twice_yields_the_same_portfolio() {
        let db = Database::in_memory();
        seed(&db, 4).await.unwrap();
        let summary = seed(&db, 4).await.unwrap();

        assert_eq!(summary.users, 3);
        assert_eq!(summary.projects, 5);
        assert_eq!(db.users.count(&Filter::new()).await.unwrap(), 3);
        assert_eq!(db.projects.count(&Filter::new()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn derived_fields_are_recomputed_on_load() {
        let db = Database::in_memory();
        seed(&db, 4).await.unwrap();

        let analyst = db.resources.get("res-001").await.unwrap();
        assert_eq!(analyst.utilization, 85);
        assert_eq!(analyst.burnout_risk, Level::Medium);

        let risk = db.risks.get("risk-002").await.unwrap();
        assert_eq!(risk.risk_score, 12);
        assert_eq!(risk.level, Level::High);

        let admin = crate::services::user_service::find_by_email(&db, ADMIN_EMAIL)
            .await
            .unwrap()
            .unwrap();
        assert!(auth::verify_password(ADMIN_PASSWORD.into(), admin.password_hash)
            .await
            .unwrap());
    }
}
