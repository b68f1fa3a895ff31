//! Dashboard API tests.

mod common;

use pretty_assertions::assert_eq;
use serde_json::Value;
use uuid::Uuid;

use common::fixtures;
use common::TestContext;

/// Test an empty dashboard for a new user.
#[tokio::test]
async fn test_dashboard_new_user() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let user_id = ctx.create_user(&server).await;

    let response = server.get(&format!("/api/users/{}/dashboard", user_id)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["overall_stats"]["total_cases"], 0);
    assert_eq!(body["overall_stats"]["level"], 1);
    assert!(body["specialty_performance"].as_array().unwrap().is_empty());
    assert!(body["weak_areas"].as_array().unwrap().is_empty());
    assert_eq!(body["badges_progress"]["total_earned"], 0);

    // One entry per day, today last
    let activity = body["recent_activity"].as_array().unwrap();
    assert_eq!(activity.len(), 7);
    assert!(activity.iter().all(|d| d["cases_completed"] == 0));
}

/// Test the dashboard after a mixed session.
#[tokio::test]
async fn test_dashboard_after_answers() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let user_id = ctx.create_user(&server).await;

    let answers = [
        ("card-1", "A"),
        ("card-2", "A"),
        ("neuro-1", "B"),
        ("neuro-2", "C"),
        ("neuro-1", "B"),
    ];
    for (case_id, answer) in answers {
        server
            .post(&format!("/api/users/{}/answers", user_id))
            .json(&fixtures::answer_request(case_id, answer, 45))
            .await
            .assert_status_ok();
    }

    let response = server.get(&format!("/api/users/{}/dashboard", user_id)).await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["overall_stats"]["total_cases"], 5);
    assert_eq!(body["overall_stats"]["success_rate"], 0.4);
    assert_eq!(body["overall_stats"]["avg_time_per_case"], 45.0);

    // Most practised specialty first
    let performance = body["specialty_performance"].as_array().unwrap();
    assert_eq!(performance.len(), 2);
    assert_eq!(performance[0]["specialty"], "neurology");
    assert_eq!(performance[0]["attempts"], 3);
    assert_eq!(performance[1]["specialty"], "cardiology");

    let weak = body["weak_areas"].as_array().unwrap();
    assert_eq!(weak.len(), 1);
    assert_eq!(weak[0]["clinical_algorithm"], "neurology-core");
    assert_eq!(weak[0]["success_rate"], 0.0);

    let today = body["recent_activity"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(today["cases_completed"], 5);

    assert!(body["badges_progress"]["total_earned"].as_u64().unwrap() >= 1);
    assert_eq!(
        body["badges_progress"]["total_available"].as_u64().unwrap() as usize,
        medcards_backend::services::badges::default_catalog().len()
    );
}

/// Test the dashboard for an unknown user.
#[tokio::test]
async fn test_dashboard_unknown_user() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .get(&format!("/api/users/{}/dashboard", Uuid::new_v4()))
        .await;

    response.assert_status_not_found();
}
