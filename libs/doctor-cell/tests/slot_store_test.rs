use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{DoctorError, SlotDate, SlotTime};
use doctor_cell::services::doctor::DoctorService;
use shared_utils::test_utils::{MockStoreResponses, TestConfig};

fn slot_date() -> SlotDate {
    "5_3_2025".parse().unwrap()
}

fn slot_time() -> SlotTime {
    "10:00 AM".parse().unwrap()
}

#[tokio::test]
async fn reserve_slot_lands_with_a_conditional_write() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_response(
                &doctor_id.to_string(),
                "doctor@example.com",
                "Dr. Test",
                "General Practice"
            )
        ])))
        .mount(&mock_server)
        .await;

    let mut updated = MockStoreResponses::doctor_response(
        &doctor_id.to_string(),
        "doctor@example.com",
        "Dr. Test",
        "General Practice",
    );
    updated["slots_booked"] = json!({ "5_3_2025": ["10:00 AM"] });
    updated["slots_version"] = json!(1);

    // The write carries the version the read observed; anything newer on the
    // row and the filter matches nothing.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .and(query_param("slots_version", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();
    let service = DoctorService::new(&config);

    let doctor = service
        .reserve_slot(doctor_id, &slot_date(), &slot_time(), "test-token")
        .await
        .expect("reservation should land");

    assert!(doctor.slots_booked.is_booked(&slot_date(), &slot_time()));
    assert_eq!(doctor.slots_version, 1);
}

#[tokio::test]
async fn reserve_slot_refuses_an_already_booked_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let mut doctor = MockStoreResponses::doctor_response(
        &doctor_id.to_string(),
        "doctor@example.com",
        "Dr. Test",
        "General Practice",
    );
    doctor["slots_booked"] = json!({ "5_3_2025": ["10:00 AM"] });

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();
    let service = DoctorService::new(&config);

    let outcome = service
        .reserve_slot(doctor_id, &slot_date(), &slot_time(), "test-token")
        .await;

    assert_matches!(outcome, Err(DoctorError::SlotTaken));
}

#[tokio::test]
async fn lost_write_race_rereads_and_reports_slot_taken() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    // First read sees version 0 with the slot free...
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_response(
                &doctor_id.to_string(),
                "doctor@example.com",
                "Dr. Test",
                "General Practice"
            )
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    // ...but the conditional write misses: a concurrent booking bumped the
    // version in between.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("slots_version", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // The re-read then finds the competitor holding the slot.
    let mut raced = MockStoreResponses::doctor_response(
        &doctor_id.to_string(),
        "doctor@example.com",
        "Dr. Test",
        "General Practice",
    );
    raced["slots_booked"] = json!({ "5_3_2025": ["10:00 AM"] });
    raced["slots_version"] = json!(1);

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([raced])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();
    let service = DoctorService::new(&config);

    let outcome = service
        .reserve_slot(doctor_id, &slot_date(), &slot_time(), "test-token")
        .await;

    assert_matches!(outcome, Err(DoctorError::SlotTaken));
}

#[tokio::test]
async fn releasing_an_unheld_slot_writes_nothing() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    // Only a GET is mounted; a stray PATCH would fail the request and the
    // test with it.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_response(
                &doctor_id.to_string(),
                "doctor@example.com",
                "Dr. Test",
                "General Practice"
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();
    let service = DoctorService::new(&config);

    service
        .release_slot(doctor_id, &slot_date(), &slot_time(), "test-token")
        .await
        .expect("release of an unheld slot is a no-op");
}
