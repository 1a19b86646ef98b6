use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inventory_cell::models::*;
use inventory_cell::services::MedicationService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

#[tokio::test]
async fn receiving_stock_advances_the_moving_average() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let medication_id = Uuid::new_v4().to_string();

    // 100 on hand at 0.20 average.
    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medication_response(
                &medication_id,
                &clinic_id.to_string(),
                100.0,
                0.20
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/stock_receipts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "medication_id": medication_id,
            "quantity": 100.0,
            "unit_cost": 0.40,
            "supplier": null,
            "reference": null,
            "received_at": "2024-02-01T09:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    // Receiving 100 @ 0.40 over 100 @ 0.20 lands at 0.30.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medication_response(
                &medication_id,
                &clinic_id.to_string(),
                200.0,
                0.30
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = MedicationService::new(&config);

    let medication = service
        .receive_stock(
            clinic_id,
            &medication_id,
            ReceiveStockRequest {
                quantity: 100.0,
                unit_cost: 0.40,
                supplier: None,
                reference: None,
            },
            "test-token",
        )
        .await
        .expect("receipt should succeed");

    assert_eq!(medication.stock_on_hand, 200.0);
    assert!((medication.average_cost - 0.30).abs() < 1e-9);
}

#[tokio::test]
async fn zero_quantity_receipts_are_rejected_before_any_write() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = MedicationService::new(&config);

    let result = service
        .receive_stock(
            clinic_id,
            &Uuid::new_v4().to_string(),
            ReceiveStockRequest {
                quantity: 0.0,
                unit_cost: 1.0,
                supplier: None,
                reference: None,
            },
            "test-token",
        )
        .await;

    let err = result.expect_err("zero quantity is invalid");
    assert!(err.to_string().contains("positive"));
}

#[tokio::test]
async fn dispensing_below_zero_is_refused() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let medication_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medication_response(
                &medication_id,
                &clinic_id.to_string(),
                5.0,
                0.20
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = MedicationService::new(&config);

    let result = service
        .adjust_stock(
            clinic_id,
            &medication_id,
            AdjustStockRequest {
                quantity_delta: -10.0,
                reason: Some("dispense".to_string()),
            },
            "test-token",
        )
        .await;

    let err = result.expect_err("stock cannot go negative");
    assert!(err.to_string().contains("below zero"));
}

#[tokio::test]
async fn recalculation_replays_the_receipt_history_in_order() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();
    let medication_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medication_response(
                &medication_id,
                &clinic_id.to_string(),
                999.0, // Stale values that the recalculation corrects.
                9.99
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/stock_receipts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": Uuid::new_v4(),
                "medication_id": medication_id,
                "quantity": 50.0,
                "unit_cost": 1.00,
                "supplier": null,
                "reference": null,
                "received_at": "2024-01-01T09:00:00Z"
            },
            {
                "id": Uuid::new_v4(),
                "medication_id": medication_id,
                "quantity": 150.0,
                "unit_cost": 1.40,
                "supplier": null,
                "reference": null,
                "received_at": "2024-01-15T09:00:00Z"
            }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medication_response(
                &medication_id,
                &clinic_id.to_string(),
                200.0,
                1.30
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = MedicationService::new(&config);

    let recalculation = service
        .recalculate_costs(clinic_id, &medication_id, "test-token")
        .await
        .expect("recalculation should succeed");

    // (50*1.00 + 150*1.40) / 200 = 1.30
    assert_eq!(recalculation.stock_on_hand, 200.0);
    assert!((recalculation.average_cost - 1.30).abs() < 1e-9);
    assert_eq!(recalculation.history.len(), 2);
}
