use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::handlers::*;
use patient_cell::models::*;
use shared_models::auth::User;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

fn user_extension(test_user: &TestUser) -> Extension<User> {
    Extension(test_user.to_user())
}

fn auth_header() -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer("test-token").unwrap())
}

#[tokio::test]
async fn get_patient_returns_clinic_scoped_record() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");
    let patient_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .and(query_param("clinic_id", format!("eq.{}", test_user.clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(
                &patient_id,
                &test_user.clinic_id.to_string(),
                "Aisha"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let result = get_patient(
        State(config),
        auth_header(),
        user_extension(&test_user),
        Path(patient_id.clone()),
    )
    .await;

    let Json(body) = result.expect("handler should succeed");
    assert_eq!(body["id"], json!(patient_id));
    assert_eq!(body["first_name"], json!("Aisha"));
}

#[tokio::test]
async fn get_patient_not_found_maps_to_404() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let result = get_patient(
        State(config),
        auth_header(),
        user_extension(&test_user),
        Path(uuid::Uuid::new_v4().to_string()),
    )
    .await;

    assert!(matches!(
        result,
        Err(shared_models::error::AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn create_patient_rejects_duplicate_national_id() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");
    let existing_id = uuid::Uuid::new_v4().to_string();

    // Duplicate check finds an existing row.
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": existing_id }])),
        )
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let request = CreatePatientRequest {
        first_name: "Aisha".to_string(),
        last_name: "Binti Ahmad".to_string(),
        email: None,
        phone: "0123456789".to_string(),
        address: None,
        postal_code: None,
        national_id: Some("900101-10-1234".to_string()),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        gender: "female".to_string(),
        allergies: None,
        medical_notes: None,
        panel_id: None,
    };

    let result = create_patient(
        State(config),
        auth_header(),
        user_extension(&test_user),
        Json(request),
    )
    .await;

    assert!(matches!(
        result,
        Err(shared_models::error::AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn search_patients_filters_by_clinic() {
    let mock_server = MockServer::start().await;
    let test_user = TestUser::staff("staff@example.com");
    let patient_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("clinic_id", format!("eq.{}", test_user.clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(
                &patient_id,
                &test_user.clinic_id.to_string(),
                "Aisha"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_arc();

    let query = PatientSearchQuery {
        name: None,
        phone: None,
        national_id: None,
        limit: None,
        offset: None,
    };

    let result = search_patients(
        State(config),
        auth_header(),
        user_extension(&test_user),
        Query(query),
    )
    .await;

    let Json(body) = result.expect("handler should succeed");
    assert_eq!(body["total"], json!(1));
}
