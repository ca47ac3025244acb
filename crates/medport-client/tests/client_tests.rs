//! Integration tests for medport-client.
//!
//! Uses wiremock to stand in for the MedPort server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use medport_client::{ClientOptions, Error, MSG_FAILED, MedportClient, Notification};
use medport_core::{MedicationForm, TimeInterval};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// A form with every required field filled in.
fn filled_form() -> MedicationForm {
    let mut form = MedicationForm::new();
    form.set_name("Lisinopril");
    form.set_frequency(2);
    form.set_frequency_interval(TimeInterval::Days);
    form.color_mut().set_name("Peach");
    form.color_mut().set_hex("#ffcc99");
    let index = form.add_reminder();
    form.reminder_mut(index).unwrap().time = "21:15".to_string();
    form
}

// =============================================================================
// SUBMISSION TESTS
// =============================================================================

#[tokio::test]
async fn test_submit_sends_exactly_one_post_with_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/medications"))
        .and(body_partial_json(json!({
            "name": "Lisinopril",
            "color": {"name": "Peach", "hex": "#ffcc99", "red": 255, "green": 204, "blue": 153},
            "frequency": 2,
            "frequencyInterval": "days",
            "reminders": [
                {"time": "09:00", "repeatInterval": "days", "repeatDays": [], "active": true, "snoozeDuration": 5},
                {"time": "21:15", "repeatInterval": "days", "repeatDays": [], "active": true, "snoozeDuration": 5}
            ]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let mut form = filled_form();
    let notification = client.submit_form(&mut form).await;

    assert_eq!(notification, Notification::Success);
    assert_eq!(form, MedicationForm::new(), "form is reset after success");
    mock_server.verify().await;
}

#[tokio::test]
async fn test_any_2xx_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/medications"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let mut form = filled_form();
    assert!(client.submit_form(&mut form).await.is_success());
}

#[tokio::test]
async fn test_server_error_leaves_form_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/medications"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let mut form = filled_form();
    let before = form.clone();

    let notification = client.submit_form(&mut form).await;

    assert_eq!(notification, Notification::Failure);
    assert_eq!(notification.message(), MSG_FAILED);
    assert_eq!(form, before);
}

#[tokio::test]
async fn test_bad_request_is_the_same_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/medications"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"errors": {"name": ["x"]}})))
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let mut form = filled_form();
    assert_eq!(client.submit_form(&mut form).await, Notification::Failure);
}

#[tokio::test]
async fn test_unreachable_server_is_a_failure() {
    // Port 9 (discard) is closed on test machines; the connect fails fast.
    let client = MedportClient::new("http://127.0.0.1:9");
    let mut form = filled_form();
    let before = form.clone();

    assert_eq!(client.submit_form(&mut form).await, Notification::Failure);
    assert_eq!(form, before);
}

#[tokio::test]
async fn test_invalid_form_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let mut form = MedicationForm::new();

    match client.submit_form(&mut form).await {
        Notification::Invalid(errors) => {
            let map = errors.to_map();
            assert!(map.contains_key("name"));
            assert!(map.contains_key("color.name"));
        }
        other => panic!("expected Invalid, got {:?}", other),
    }
    mock_server.verify().await;
}

#[tokio::test]
async fn test_post_medication_reports_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/medications"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let result = client.post_medication(filled_form().values()).await;

    match result {
        Err(Error::Rejected { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "down");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

// =============================================================================
// READ TESTS
// =============================================================================

#[tokio::test]
async fn test_client_health() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "version": "0.1.0"
        })))
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let health = client.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.version, "0.1.0");
}

#[tokio::test]
async fn test_demo_reads_return_raw_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "medications": "http://testserver/medications/"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/medications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 3, "name": "A"}])))
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(format!("{}/", mock_server.uri()));
    let root = client.root().await.unwrap();
    assert_eq!(root["medications"], "http://testserver/medications/");

    let list = client.medications_raw().await.unwrap();
    assert_eq!(list[0]["id"], 3);
}

#[tokio::test]
async fn test_typed_medication_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/medications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "name": "Aspirin",
            "color": {"id": 1, "name": "White", "hex": "#ffffff", "red": 255, "green": 255, "blue": 255},
            "dosage": 1,
            "unit": "_",
            "frequency": 1,
            "frequency_interval": "days",
            "reminders": [{
                "id": 1,
                "medication_id": 1,
                "time": "08:00",
                "repeat_interval": "days",
                "repeat_days": ["1", "5"],
                "specific_date": null,
                "active": true,
                "snooze_duration": 10,
                "ends_on": null
            }]
        }])))
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    let medications = client.medications().await.unwrap();

    assert_eq!(medications.len(), 1);
    assert_eq!(medications[0].name, "Aspirin");
    assert_eq!(medications[0].reminders[0].repeat_days.len(), 2);
}

#[tokio::test]
async fn test_api_key_and_timeout_options() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "version": "0.1.0"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = ClientOptions {
        api_key: Some("secret".to_string()),
        timeout: Some(Duration::from_secs(5)),
    };
    let client = MedportClient::with_options(mock_server.uri(), &options).unwrap();
    assert_eq!(client.health().await.unwrap().status, "ok");
}

#[tokio::test]
async fn test_non_json_body_is_a_json_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let client = MedportClient::new(mock_server.uri());
    assert!(matches!(client.root().await, Err(Error::Json(_))));
}
