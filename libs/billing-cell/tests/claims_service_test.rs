use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use billing_cell::models::*;
use billing_cell::services::ClaimService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn claim_row(claim_id: &str, clinic_id: &str, status: &str) -> serde_json::Value {
    MockSupabaseResponses::claim_response(claim_id, clinic_id, &Uuid::new_v4().to_string(), status)
}

#[tokio::test]
async fn submitting_a_draft_claim_stamps_submitted_at() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let claim_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/panel_claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            claim_row(&claim_id, &clinic_id.to_string(), "draft")
        ])))
        .mount(&mock_server)
        .await;

    let mut submitted = claim_row(&claim_id, &clinic_id.to_string(), "submitted");
    submitted["submitted_at"] = json!("2024-03-01T09:00:00Z");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/panel_claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([submitted])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ClaimService::new(&config);

    let claim = service
        .transition_claim(
            clinic_id,
            &claim_id,
            TransitionClaimRequest {
                status: ClaimStatus::Submitted,
                amount_paid: None,
                rejection_reason: None,
                notes: None,
            },
            "test-token",
        )
        .await
        .expect("draft -> submitted is legal");

    assert_eq!(claim.status, ClaimStatus::Submitted);
    assert!(claim.submitted_at.is_some());
}

#[tokio::test]
async fn paid_claims_accept_no_further_transitions() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let claim_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/panel_claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            claim_row(&claim_id, &clinic_id.to_string(), "paid")
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ClaimService::new(&config);

    let result = service
        .transition_claim(
            clinic_id,
            &claim_id,
            TransitionClaimRequest {
                status: ClaimStatus::Submitted,
                amount_paid: None,
                rejection_reason: None,
                notes: None,
            },
            "test-token",
        )
        .await;

    let err = result.expect_err("paid is terminal");
    assert!(err.to_string().contains("not permitted"));
}

#[tokio::test]
async fn short_payment_must_be_below_the_claimed_amount() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let claim_id = Uuid::new_v4().to_string();

    // Canned claim carries amount_claimed = 120.0.
    Mock::given(method("GET"))
        .and(path("/rest/v1/panel_claims"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            claim_row(&claim_id, &clinic_id.to_string(), "submitted")
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ClaimService::new(&config);

    let result = service
        .transition_claim(
            clinic_id,
            &claim_id,
            TransitionClaimRequest {
                status: ClaimStatus::ShortPaid,
                amount_paid: Some(120.0),
                rejection_reason: None,
                notes: None,
            },
            "test-token",
        )
        .await;

    let err = result.expect_err("full amount is not a short payment");
    assert!(err.to_string().contains("below the claimed amount"));
}

#[tokio::test]
async fn claims_cannot_be_drafted_from_non_panel_invoices() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let invoice_id = Uuid::new_v4();

    // Invoice with no panel_id.
    Mock::given(method("GET"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": invoice_id,
            "clinic_id": clinic_id,
            "patient_id": Uuid::new_v4(),
            "consultation_id": null,
            "invoice_number": "INV-2024-0001",
            "items": [],
            "subtotal": 50.0,
            "discount": 0.0,
            "total": 50.0,
            "status": "unpaid",
            "panel_id": null,
            "payment_method": null,
            "paid_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ClaimService::new(&config);

    let result = service
        .create_claim(
            clinic_id,
            CreateClaimRequest {
                invoice_id,
                amount_claimed: None,
                notes: None,
            },
            "test-token",
        )
        .await;

    let err = result.expect_err("non-panel invoice cannot be claimed");
    assert!(err.to_string().contains("panel"));
}
