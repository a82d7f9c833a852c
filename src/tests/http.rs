use std::net::SocketAddr;

use actix_web::web::{self, Data};
use actix_web::{App, test};
use serde_json::{Value, json};

use super::{HarnessBuilder, date};
use crate::api::{approval, chat};
use crate::model::{EmployeeIdentity, LeaveRequestDraft, LeaveType, PendingConfirmation};
use crate::config::Config;
use crate::routes::{RateLimiters, configure, json_config};

macro_rules! app {
    ($harness:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::from($harness.engine.clone()))
                .app_data(Data::from($harness.approvals.clone()))
                .app_data(json_config())
                .route("/api/chat", web::post().to(chat::chat))
                .route("/api/approvals/{id}", web::get().to(approval::decide_approval)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_non_string_message_is_bad_request() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let app = app!(harness);

    for body in [json!({ "message": 42 }), json!({})] {
        let req = test::TestRequest::post()
            .uri("/api/chat")
            .insert_header(("X-Session-Id", "http-1"))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Message is required");
    }
}

#[actix_web::test]
async fn test_broken_json_uses_error_shape() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"message\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[actix_web::test]
async fn test_sso_header_names_the_employee() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .insert_header(("X-Session-Id", "http-2"))
        .insert_header(("X-User-Name", "Ravi Kumar"))
        .set_json(json!({ "message": "hello", "employeeName": "Someone Else" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["intent"], "greeting");
    assert!(body["reply"].as_str().unwrap().contains("Ravi Kumar"));
    assert!(body["timestamp"].as_str().is_some());
}

#[actix_web::test]
async fn test_button_action_without_text() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).holidays(vec![]).build();
    let app = app!(harness);

    let pending = serde_json::to_value(PendingConfirmation::Leave(LeaveRequestDraft {
        start_date: Some(date(2026, 3, 3)),
        end_date: Some(date(2026, 3, 3)),
        leave_type: Some(LeaveType::Casual),
        reason: Some("doctor visit".into()),
        duration_days: Some(1.0),
        ..Default::default()
    }))
    .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({
            "sessionId": "http-3",
            "confirmationAction": "yes",
            "pendingRequest": pending,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["intent"], "leave_created");
}

#[actix_web::test]
async fn test_approval_endpoint_status_codes() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let app = app!(harness);

    let record = harness
        .approvals
        .submit(
            &EmployeeIdentity::new("Asha Rao"),
            PendingConfirmation::Leave(LeaveRequestDraft {
                start_date: Some(date(2026, 3, 10)),
                end_date: Some(date(2026, 3, 10)),
                leave_type: Some(LeaveType::Sick),
                reason: Some("surgery".into()),
                duration_days: Some(1.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    let links = harness.approvals.links_for(&record).unwrap();
    let approve_path = links.approve_url.trim_start_matches("http://localhost:8080");

    let bad_action = format!("/api/approvals/{}?action=maybe&token=x", record.id);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&bad_action).to_request()).await;
    assert_eq!(resp.status(), 400);

    let forged = format!("/api/approvals/{}?action=approve&token=forged", record.id);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&forged).to_request()).await;
    assert_eq!(resp.status(), 403);

    let resp = test::call_service(&app, test::TestRequest::get().uri(approve_path).to_request()).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, test::TestRequest::get().uri(approve_path).to_request()).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_mounted_routes_share_one_chat_quota() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let mut config = Config::from_env().unwrap();
    config.api_prefix = "/api".to_string();
    config.rate_chat_per_min = 1;
    config.rate_approval_per_min = 1;
    let limiters = RateLimiters::from_config(&config).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(Data::from(harness.engine.clone()))
            .app_data(Data::from(harness.approvals.clone()))
            .configure(|cfg| configure(cfg, &config, &limiters)),
    )
    .await;

    let peer: SocketAddr = "10.0.0.7:40000".parse().unwrap();
    let hello = || {
        test::TestRequest::post()
            .uri("/api/chat")
            .peer_addr(peer)
            .insert_header(("X-Session-Id", "http-4"))
            .set_json(json!({ "message": "hello" }))
            .to_request()
    };

    let resp = test::call_service(&app, hello()).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, hello()).await;
    assert_eq!(resp.status(), 429);
}
