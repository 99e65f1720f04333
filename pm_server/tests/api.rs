//! End-to-end tests against the full router over the in-memory store.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pm_server::{build_app, Database, TrackerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config() -> TrackerConfig {
    TrackerConfig {
        jwt_secret: "integration-secret".into(),
        bcrypt_cost: 4,
        ..TrackerConfig::default()
    }
}

fn app() -> Router {
    build_app(Database::in_memory(), test_config())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn seeded() -> Router {
    let app = app();
    let (status, body) = send(&app, "POST", "/api/seed", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"]["projects"], 5);
    app
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn writes_require_a_bearer_token() {
    let app = app();
    let risk = json!({"project_id": "p1", "title": "t", "category": "Technical"});

    let (status, body) = send(&app, "POST", "/api/risks", None, Some(risk.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, _) = send(&app, "POST", "/api/risks", Some("garbage"), Some(risk)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "analyst@defense.gov",
            "password": "secret12",
            "name": "Lt. Analyst",
            "clearance_level": "secret"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "analyst@defense.gov", "password": "secret12", "name": "Dup"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "analyst@defense.gov", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "analyst@defense.gov", "secret12").await;
    let (status, me) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "analyst@defense.gov");
    assert_eq!(me["clearance_level"], "secret");
}

#[tokio::test]
async fn risk_score_follows_probability_and_impact() {
    let app = seeded().await;
    let token = login(&app, "manager@defense.gov", "password123").await;

    let (status, risk) = send(
        &app,
        "POST",
        "/api/risks",
        Some(&token),
        Some(json!({
            "project_id": "proj-001",
            "title": "Spectrum interference",
            "category": "Technical",
            "probability": 3,
            "impact": 4
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(risk["risk_score"], 12);
    assert_eq!(risk["level"], "high");

    let uri = format!("/api/risks/{}", risk["id"].as_str().unwrap());
    let (status, risk) = send(&app, "PUT", &uri, Some(&token), Some(json!({"probability": 5}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(risk["risk_score"], 20);
    assert_eq!(risk["level"], "critical");

    let (status, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({"impact": 9}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn risk_factors_beyond_the_scale_are_rejected() {
    let app = seeded().await;
    let token = login(&app, "manager@defense.gov", "password123").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/risks",
        Some(&token),
        Some(json!({
            "project_id": "proj-001",
            "title": "Runaway estimate",
            "category": "Technical",
            "probability": i64::MAX,
            "impact": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (_, risks) = send(&app, "GET", "/api/risks?project_id=proj-001", None, None).await;
    assert_eq!(risks.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn seeded_utilization_is_derived() {
    let app = seeded().await;
    let (status, resource) = send(&app, "GET", "/api/resources/res-001", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resource["utilization"], 85);
    assert_eq!(resource["burnout_risk"], "medium");
}

#[tokio::test]
async fn allocate_then_deallocate_restores_the_resource() {
    let app = seeded().await;
    let token = login(&app, "manager@defense.gov", "password123").await;

    let (status, resource) = send(
        &app,
        "POST",
        "/api/resources/res-001/allocate",
        Some(&token),
        Some(json!({"project_id": "proj-003", "hours": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resource["allocated_hours"], 144.0);
    assert_eq!(resource["utilization"], 90);
    assert_eq!(resource["burnout_risk"], "high");
    assert!(resource["allocated_projects"]
        .as_array()
        .unwrap()
        .contains(&json!("proj-003")));

    let (status, resource) = send(
        &app,
        "POST",
        "/api/resources/res-001/deallocate",
        Some(&token),
        Some(json!({"project_id": "proj-003", "hours": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resource["allocated_hours"], 136.0);
    assert_eq!(resource["utilization"], 85);
    assert!(!resource["allocated_projects"]
        .as_array()
        .unwrap()
        .contains(&json!("proj-003")));
}

#[tokio::test]
async fn under_cleared_allocation_is_forbidden_and_changes_nothing() {
    let app = seeded().await;
    let token = login(&app, "manager@defense.gov", "password123").await;

    // res-003 is cleared to secret, proj-002 is top secret.
    let (status, body) = send(
        &app,
        "POST",
        "/api/resources/res-003/allocate",
        Some(&token),
        Some(json!({"project_id": "proj-002", "hours": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        "Resource clearance level (secret) insufficient for project (top_secret)"
    );

    let (_, resource) = send(&app, "GET", "/api/resources/res-003", None, None).await;
    assert_eq!(resource["allocated_hours"], 432.0);
    assert_eq!(resource["allocated_projects"], json!(["proj-001"]));
}

#[tokio::test]
async fn bulk_allocation_reports_each_entry() {
    let app = seeded().await;
    let token = login(&app, "manager@defense.gov", "password123").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/resources/bulk/allocate",
        Some(&token),
        Some(json!([
            {"resource_id": "res-002", "project_id": "proj-004", "hours": 8},
            {"resource_id": "res-003", "project_id": "proj-002", "hours": 8},
            {"resource_id": "res-missing", "project_id": "proj-001", "hours": 8}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[0]["utilization"], 75);
    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[2]["status"], "error");
    assert_eq!(results[2]["resource_id"], "res-missing");
}

#[tokio::test]
async fn multi_level_approval_runs_to_completion() {
    let app = seeded().await;
    let manager = login(&app, "manager@defense.gov", "password123").await;
    let admin = login(&app, "admin@defense.gov", "admin123").await;

    let (status, approval) = send(
        &app,
        "POST",
        "/api/approvals",
        Some(&manager),
        Some(json!({
            "entity_type": "budget",
            "entity_id": "budget-003",
            "title": "Release hardware funds",
            "amount": 250000000.0,
            "total_levels": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["status"], "pending");
    assert_eq!(approval["current_level"], 1);
    let uri = format!("/api/approvals/{}", approval["id"].as_str().unwrap());

    for level in 1..=3 {
        let (status, body) = send(
            &app,
            "POST",
            &format!("{uri}/approve"),
            Some(&admin),
            Some(json!({"comments": format!("level {level} ok")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["approval_chain"].as_array().unwrap().len(), level);
    }

    let (_, approval) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(approval["status"], "approved");
    assert_eq!(approval["current_level"], 3);
    let chain = approval["approval_chain"].as_array().unwrap();
    assert!(chain.iter().all(|entry| entry["action"] == "approve"));
    assert!(chain
        .iter()
        .all(|entry| entry["signature"].as_str().is_some_and(|s| !s.is_empty())));

    let (status, _) = send(&app, "POST", &format!("{uri}/approve"), Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "POST", &format!("{uri}/reject"), Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unrepresentable_sla_is_rejected() {
    let app = seeded().await;
    let token = login(&app, "manager@defense.gov", "password123").await;

    for sla_hours in [i64::MAX, -1] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/approvals",
            Some(&token),
            Some(json!({
                "entity_type": "project",
                "entity_id": "proj-001",
                "title": "Phase gate",
                "sla_hours": sla_hours
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "sla_hours {sla_hours}");
        assert!(body["detail"].as_str().unwrap().contains("sla_hours"));
    }

    let (_, approvals) = send(&app, "GET", "/api/approvals", None, None).await;
    assert_eq!(approvals.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn free_form_wbs_codes_are_accepted() {
    let app = seeded().await;
    let token = login(&app, "manager@defense.gov", "password123").await;

    let task = |wbs: &str| {
        json!({
            "project_id": "proj-001",
            "wbs_code": wbs,
            "name": "Work package",
            "start_date": "2024-06-01",
            "end_date": "2024-07-01"
        })
    };
    let (status, created) = send(&app, "POST", "/api/tasks", Some(&token), Some(task("WP-1.2"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["wbs_level"], 2);

    let (status, _) = send(&app, "POST", "/api/tasks", Some(&token), Some(task("1..2"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn emergency_override_is_admin_only() {
    let app = seeded().await;
    let user = login(&app, "user@defense.gov", "password123").await;
    let admin = login(&app, "admin@defense.gov", "admin123").await;
    let uri = "/api/approvals/approval-002/emergency-override";

    let (status, _) = send(&app, "POST", uri, Some(&user), Some(json!({"reason": "urgent"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, approval) = send(&app, "GET", "/api/approvals/approval-002", None, None).await;
    assert_eq!(approval["status"], "pending");

    let (status, approval) = send(&app, "POST", uri, Some(&admin), Some(json!({"reason": "urgent"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["status"], "approved");
    assert_eq!(approval["is_emergency"], true);
    assert_eq!(approval["emergency_override_by"], "user-admin-001");
}

#[tokio::test]
async fn csv_export_has_headers_and_rows() {
    let app = seeded().await;
    let request = Request::builder()
        .uri("/api/export/risks?project_id=proj-001")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=risks.csv"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = text.lines();
    let header_row = lines.next().unwrap();
    assert!(header_row.split(',').any(|column| column == "risk_score"));
    assert_eq!(lines.count(), 2);

    let (status, _) = send(&app, "GET", "/api/export/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, rows) = send(&app, "GET", "/api/export/vendors?format=json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn dashboard_reflects_the_seeded_portfolio() {
    let app = seeded().await;
    let (status, stats) = send(&app, "GET", "/api/dashboard/stats", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["counts"]["programs"], 3);
    assert_eq!(stats["counts"]["projects"], 5);
    assert_eq!(stats["counts"]["tasks"], 8);
    assert_eq!(stats["counts"]["resources"], 4);
    assert_eq!(stats["counts"]["pending_approvals"], 2);
    assert_eq!(stats["projects"]["status_breakdown"]["in_progress"], 4);
}

#[tokio::test]
async fn reseeding_keeps_registered_users() {
    let app = seeded().await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "keep@defense.gov", "password": "secret12", "name": "Keeper"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/api/seed", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, users) = send(&app, "GET", "/api/users", None, None).await;
    assert_eq!(users.as_array().unwrap().len(), 4);
}
