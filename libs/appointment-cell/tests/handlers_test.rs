use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

fn user_extension(test_user: &TestUser) -> Extension<User> {
    Extension(test_user.to_user())
}

fn auth_header() -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer("test-token").unwrap())
}

#[tokio::test]
async fn booking_over_an_existing_slot_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");
    let patient_id = Uuid::new_v4();

    // The conflict scan finds a 15-minute booking at 10:00.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &test_user.clinic_id.to_string(),
                &patient_id.to_string(),
                "confirmed"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let request = BookAppointmentRequest {
        patient_id,
        practitioner_name: "Dr. Test".to_string(),
        scheduled_start: "2030-06-02T10:05:00Z".parse().unwrap(),
        duration_minutes: 15,
        reason: None,
        notes: None,
    };

    let result = book_appointment(
        State(config),
        auth_header(),
        user_extension(&test_user),
        Json(request),
    )
    .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn booking_a_free_slot_succeeds() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");
    let patient_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id,
                &test_user.clinic_id.to_string(),
                &patient_id.to_string(),
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let request = BookAppointmentRequest {
        patient_id,
        practitioner_name: "Dr. Test".to_string(),
        scheduled_start: "2030-06-02T10:00:00Z".parse().unwrap(),
        duration_minutes: 15,
        reason: Some("checkup".to_string()),
        notes: None,
    };

    let result = book_appointment(
        State(config),
        auth_header(),
        user_extension(&test_user),
        Json(request),
    )
    .await;

    let Json(body) = result.expect("booking should succeed");
    assert_eq!(body["id"], json!(appointment_id));
    assert_eq!(body["status"], json!("scheduled"));
}

#[tokio::test]
async fn status_update_off_the_table_is_rejected() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id,
                &test_user.clinic_id.to_string(),
                &Uuid::new_v4().to_string(),
                "completed"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let request = UpdateStatusRequest {
        status: AppointmentStatus::InProgress,
        notes: None,
    };

    let result = update_appointment_status(
        State(config),
        auth_header(),
        user_extension(&test_user),
        Path(appointment_id),
        Json(request),
    )
    .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}
