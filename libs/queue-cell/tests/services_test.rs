use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use queue_cell::models::*;
use queue_cell::services::QueueService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

#[tokio::test]
async fn check_in_assigns_next_ticket_number() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");
    let clinic_id = test_user.clinic_id;
    let patient_id = Uuid::new_v4();

    // Highest ticket today is 4.
    Mock::given(method("GET"))
        .and(path("/rest/v1/queue_entries"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "ticket_number": 4 }])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/queue_entries"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::queue_entry_response(
                &Uuid::new_v4().to_string(),
                &clinic_id.to_string(),
                &patient_id.to_string(),
                5,
                "waiting"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = QueueService::new(&config);

    let entry = service
        .check_in(
            clinic_id,
            CheckInRequest {
                patient_id,
                appointment_id: None,
                notes: None,
            },
            "test-token",
        )
        .await
        .expect("check-in should succeed");

    assert_eq!(entry.ticket_number, 5);
    assert_eq!(entry.status, QueueStatus::Waiting);
}

#[tokio::test]
async fn call_next_on_empty_queue_reports_empty() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/queue_entries"))
        .and(query_param("status", "eq.waiting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = QueueService::new(&config);

    let result = service.call_next(clinic_id, "test-token").await;

    let err = result.expect_err("empty queue should error");
    assert!(err.to_string().contains("empty"));
}

#[tokio::test]
async fn call_next_promotes_lowest_waiting_ticket() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let entry_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/queue_entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::queue_entry_response(
                &entry_id,
                &clinic_id.to_string(),
                &patient_id,
                2,
                "waiting"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/queue_entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": entry_id,
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "appointment_id": null,
            "ticket_number": 2,
            "status": "called",
            "queued_at": "2024-01-01T08:00:00Z",
            "called_at": "2024-01-01T08:30:00Z",
            "completed_at": null,
            "notes": null
        }])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = QueueService::new(&config);

    let called = service
        .call_next(clinic_id, "test-token")
        .await
        .expect("call-next should succeed");

    assert_eq!(called.status, QueueStatus::Called);
    assert!(called.called_at.is_some());
}
