//! Resource allocation, capability search and capacity planning.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::models::clearance::Clearance;
use crate::models::resource::{NewResource, Resource};
use crate::models::Level;
use crate::store::{Database, Filter};

/// Utilization below which a resource counts as available.
const AVAILABLE_BELOW: i64 = 70;
/// Utilization above which a resource is over-allocated.
const OVER_ALLOCATED_ABOVE: i64 = 100;
const AVAILABLE_LISTED: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Allocation {
    pub project_id: String,
    #[serde(default)]
    pub hours: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkAllocation {
    pub resource_id: String,
    pub project_id: String,
    #[serde(default)]
    pub hours: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub async fn list_resources(
    db: &Database,
    resource_type: Option<&str>,
    clearance: Option<&str>,
) -> TrackerResult<Vec<Resource>> {
    let filter = Filter::new()
        .eq_opt("type", resource_type)
        .eq_opt("clearance_level", clearance);
    db.resources.list(&filter).await
}

pub async fn create_resource(db: &Database, request: NewResource) -> TrackerResult<Resource> {
    let resource = db.resources.insert(Resource::new(request, Utc::now())).await?;
    tracing::info!(resource_id = %resource.id, kind = %resource.resource_type, "Resource created");
    Ok(resource)
}

/// Book hours of a resource against a project.
///
/// The clearance check runs against the freshly read resource on every
/// write attempt, so a rejected allocation leaves the record untouched.
pub async fn allocate(
    db: &Database,
    resource_id: &str,
    allocation: &Allocation,
) -> TrackerResult<Resource> {
    db.resources.get(resource_id).await?;
    let project = db.projects.get(&allocation.project_id).await?;

    let result = db
        .resources
        .modify(resource_id, |resource| {
            if !resource.clearance_level.permits(project.clearance_level) {
                return Err(TrackerError::ClearanceViolation {
                    resource: resource.clearance_level,
                    project: project.clearance_level,
                });
            }
            resource.assign(&allocation.project_id, allocation.hours)
        })
        .await;

    match &result {
        Ok(resource) => {
            crate::metrics::allocation("allocate", "success");
            tracing::info!(
                resource_id,
                project_id = %allocation.project_id,
                hours = allocation.hours,
                utilization = resource.utilization,
                "Resource allocated"
            );
        }
        Err(e) => {
            crate::metrics::allocation("allocate", "rejected");
            tracing::warn!(resource_id, project_id = %allocation.project_id, error = %e, "Allocation rejected");
        }
    }
    result
}

pub async fn deallocate(
    db: &Database,
    resource_id: &str,
    allocation: &Allocation,
) -> TrackerResult<Resource> {
    let resource = db
        .resources
        .modify(resource_id, |resource| {
            resource.release(&allocation.project_id, allocation.hours)
        })
        .await?;
    crate::metrics::allocation("deallocate", "success");
    tracing::info!(
        resource_id,
        project_id = %allocation.project_id,
        hours = allocation.hours,
        utilization = resource.utilization,
        "Resource deallocated"
    );
    Ok(resource)
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkOutcome {
    Success { resource_id: String, utilization: i64 },
    Error { resource_id: String, message: String },
}

#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub results: Vec<BulkOutcome>,
}

/// Allocate each entry on its own. A failing entry is reported and the
/// rest still run.
pub async fn bulk_allocate(db: &Database, entries: Vec<BulkAllocation>) -> BulkResult {
    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        let allocation = Allocation {
            project_id: entry.project_id,
            hours: entry.hours,
        };
        let outcome = match allocate(db, &entry.resource_id, &allocation).await {
            Ok(resource) => BulkOutcome::Success {
                resource_id: entry.resource_id,
                utilization: resource.utilization,
            },
            Err(e) => BulkOutcome::Error {
                resource_id: entry.resource_id,
                message: e.to_string(),
            },
        };
        results.push(outcome);
    }
    BulkResult { results }
}

#[derive(Debug, Serialize)]
pub struct ResourceMatch {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_certifications: Option<Vec<String>>,
    pub match_score: f64,
}

fn tokens(query: &str) -> TrackerResult<Vec<String>> {
    let tokens: Vec<String> = query
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(TrackerError::Validation(
            "At least one search term is required".into(),
        ));
    }
    Ok(tokens)
}

/// Requested tokens the held values contain, compared case-insensitively.
fn matching(requested: &[String], held: &[String]) -> Vec<String> {
    let held: Vec<String> = held.iter().map(|h| h.to_lowercase()).collect();
    requested
        .iter()
        .filter(|r| held.contains(r))
        .cloned()
        .collect()
}

fn rank(mut matches: Vec<ResourceMatch>) -> Vec<ResourceMatch> {
    matches.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    matches
}

pub async fn search_by_skills(db: &Database, query: &str) -> TrackerResult<Vec<ResourceMatch>> {
    let requested = tokens(query)?;
    let matches = db
        .resources
        .list(&Filter::new())
        .await?
        .into_iter()
        .filter_map(|resource| {
            let found = matching(&requested, &resource.skills);
            (!found.is_empty()).then(|| ResourceMatch {
                match_score: found.len() as f64 / requested.len() as f64 * 100.0,
                matching_skills: Some(found),
                matching_certifications: None,
                resource,
            })
        })
        .collect();
    Ok(rank(matches))
}

pub async fn search_by_certifications(
    db: &Database,
    query: &str,
) -> TrackerResult<Vec<ResourceMatch>> {
    let requested = tokens(query)?;
    let matches = db
        .resources
        .list(&Filter::new())
        .await?
        .into_iter()
        .filter_map(|resource| {
            let found = matching(&requested, &resource.certifications);
            (!found.is_empty()).then(|| ResourceMatch {
                match_score: found.len() as f64 / requested.len() as f64 * 100.0,
                matching_skills: None,
                matching_certifications: Some(found),
                resource,
            })
        })
        .collect();
    Ok(rank(matches))
}

#[derive(Debug, Serialize)]
pub struct AllocationConflict {
    pub resource_id: String,
    pub resource_name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub utilization: i64,
    pub allocated_projects: Vec<String>,
}

pub async fn conflicts(db: &Database) -> TrackerResult<Vec<AllocationConflict>> {
    Ok(db
        .resources
        .list(&Filter::new())
        .await?
        .into_iter()
        .filter(|r| r.utilization > OVER_ALLOCATED_ABOVE)
        .map(|r| AllocationConflict {
            resource_id: r.id,
            resource_name: r.name,
            kind: "over_allocation",
            utilization: r.utilization,
            allocated_projects: r.allocated_projects,
        })
        .collect())
}

/// Resources cleared at `level` or higher.
pub async fn by_clearance(db: &Database, level: &str) -> TrackerResult<Vec<Resource>> {
    let minimum = Clearance::from_str(level)?;
    Ok(db
        .resources
        .list(&Filter::new())
        .await?
        .into_iter()
        .filter(|r| r.clearance_level.permits(minimum))
        .collect())
}

#[derive(Debug, Default, Serialize)]
pub struct TypeCapacity {
    pub count: usize,
    pub capacity: f64,
    pub allocated: f64,
    pub avg_utilization: f64,
}

#[derive(Debug, Serialize)]
pub struct ResourceLoad {
    pub id: String,
    pub name: String,
    pub utilization: i64,
}

impl From<&Resource> for ResourceLoad {
    fn from(r: &Resource) -> Self {
        ResourceLoad {
            id: r.id.clone(),
            name: r.name.clone(),
            utilization: r.utilization,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CapacityOverview {
    pub total_resources: usize,
    pub total_capacity_hours: f64,
    pub total_allocated_hours: f64,
    pub overall_utilization: f64,
    pub available_capacity_hours: f64,
    pub by_type: BTreeMap<String, TypeCapacity>,
    pub burnout_distribution: BTreeMap<&'static str, usize>,
    pub available_count: usize,
    pub over_allocated_count: usize,
    pub available_resources: Vec<ResourceLoad>,
    pub over_allocated_resources: Vec<ResourceLoad>,
}

pub async fn capacity_overview(db: &Database) -> TrackerResult<CapacityOverview> {
    let resources = db.resources.list(&Filter::new()).await?;

    let total_capacity: f64 = resources.iter().map(|r| r.capacity_hours).sum();
    let total_allocated: f64 = resources.iter().map(|r| r.allocated_hours).sum();
    let overall_utilization = if resources.is_empty() {
        0.0
    } else {
        resources.iter().map(|r| r.utilization as f64).sum::<f64>() / resources.len() as f64
    };

    let mut by_type: BTreeMap<String, TypeCapacity> = BTreeMap::new();
    for r in &resources {
        let entry = by_type.entry(r.resource_type.clone()).or_default();
        entry.count += 1;
        entry.capacity += r.capacity_hours;
        entry.allocated += r.allocated_hours;
        entry.avg_utilization += r.utilization as f64;
    }
    for entry in by_type.values_mut() {
        entry.avg_utilization = round1(entry.avg_utilization / entry.count as f64);
    }

    let mut burnout_distribution: BTreeMap<&'static str, usize> =
        Level::ALL.iter().map(|l| (l.as_str(), 0)).collect();
    for r in &resources {
        *burnout_distribution.entry(r.burnout_risk.as_str()).or_default() += 1;
    }

    let available: Vec<&Resource> = resources
        .iter()
        .filter(|r| r.utilization < AVAILABLE_BELOW)
        .collect();
    let over_allocated: Vec<&Resource> = resources
        .iter()
        .filter(|r| r.utilization > OVER_ALLOCATED_ABOVE)
        .collect();

    Ok(CapacityOverview {
        total_resources: resources.len(),
        total_capacity_hours: total_capacity,
        total_allocated_hours: total_allocated,
        overall_utilization: round1(overall_utilization),
        available_capacity_hours: total_capacity - total_allocated,
        by_type,
        burnout_distribution,
        available_count: available.len(),
        over_allocated_count: over_allocated.len(),
        available_resources: available
            .iter()
            .take(AVAILABLE_LISTED)
            .map(|r| ResourceLoad::from(*r))
            .collect(),
        over_allocated_resources: over_allocated.iter().map(|r| ResourceLoad::from(*r)).collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SkillsSummary {
    pub total_unique_skills: usize,
    pub skills: Vec<SkillCount>,
}

#[derive(Debug, Serialize)]
pub struct CertificationCount {
    pub certification: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CertificationsSummary {
    pub total_unique_certifications: usize,
    pub certifications: Vec<CertificationCount>,
}

/// Occurrence counts, most common first and ties by name.
fn tally<'a>(values: impl Iterator<Item = &'a String>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

pub async fn skills_summary(db: &Database) -> TrackerResult<SkillsSummary> {
    let resources = db.resources.list(&Filter::new()).await?;
    let skills: Vec<SkillCount> = tally(resources.iter().flat_map(|r| r.skills.iter()))
        .into_iter()
        .map(|(skill, count)| SkillCount { skill, count })
        .collect();
    Ok(SkillsSummary {
        total_unique_skills: skills.len(),
        skills,
    })
}

pub async fn certifications_summary(db: &Database) -> TrackerResult<CertificationsSummary> {
    let resources = db.resources.list(&Filter::new()).await?;
    let certifications: Vec<CertificationCount> =
        tally(resources.iter().flat_map(|r| r.certifications.iter()))
            .into_iter()
            .map(|(certification, count)| CertificationCount {
                certification,
                count,
            })
            .collect();
    Ok(CertificationsSummary {
        total_unique_certifications: certifications.len(),
        certifications,
    })
}

#[derive(Debug, Serialize)]
pub struct ProjectAllocation {
    pub project_id: String,
    pub project_name: String,
    pub allocated_resources: usize,
    pub resources: Vec<Resource>,
    pub total_hours: f64,
    pub clearance_breakdown: BTreeMap<&'static str, usize>,
}

/// Resources booked on a project. `total_hours` counts only the hours
/// each resource holds for this project.
pub async fn project_allocation(
    db: &Database,
    project_id: &str,
) -> TrackerResult<ProjectAllocation> {
    let resources = db
        .resources
        .list(&Filter::new().contains("allocated_projects", project_id))
        .await?;
    let project_name = db
        .projects
        .find_one(project_id)
        .await?
        .map(|p| p.name)
        .unwrap_or_else(|| "Unknown".to_string());

    let total_hours = resources
        .iter()
        .filter_map(|r| r.project_hours.get(project_id))
        .sum();
    let clearance_breakdown = Clearance::ALL
        .iter()
        .map(|level| {
            let count = resources
                .iter()
                .filter(|r| r.clearance_level == *level)
                .count();
            (level.as_str(), count)
        })
        .collect();

    Ok(ProjectAllocation {
        project_id: project_id.to_string(),
        project_name,
        allocated_resources: resources.len(),
        resources,
        total_hours,
        clearance_breakdown,
    })
}
