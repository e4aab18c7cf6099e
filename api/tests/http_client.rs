//! HTTP client tests against a mock server

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use serde_json::json;
use turnstile_api::client::DEFAULT_TIMEOUT;
use turnstile_api::types::{CheckinRequest, TransactionQuery, UserQuery};
use turnstile_api::{ApiError, Health, HostApi, HttpApiClient, Role};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpApiClient {
    HttpApiClient::new(server.uri(), Some("host-token".to_string()), DEFAULT_TIMEOUT).unwrap()
}

fn jane_doe() -> serde_json::Value {
    json!({
        "success": true,
        "attendee": {
            "id": "att-1",
            "name": "Jane Doe",
            "email": "jane@example.com",
            "event": "Launch Party",
            "ticketType": "General",
            "qrCode": "ABC123",
            "status": "checked_in"
        },
        "message": "Check-in successful",
        "timestamp": "2025-01-01T18:30:00Z"
    })
}

// ===== Host endpoints =====

#[tokio::test]
async fn test_checkin_posts_camel_case_body_with_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hosts/me/attendees/checkin"))
        .and(header("authorization", "Bearer host-token"))
        .and(body_json(json!({ "qrCode": "ABC123", "eventId": "E1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(jane_doe()))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .checkin("ABC123".to_string(), "E1".to_string())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.attendee.unwrap().name, "Jane Doe");
}

#[tokio::test]
async fn test_checkin_rejection_body_on_error_status_is_a_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hosts/me/attendees/checkin"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "message": "Ticket already used",
            "timestamp": "2025-01-01T18:31:00Z"
        })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .post_checkin(CheckinRequest {
            qr_code: "USED".to_string(),
            event_id: "E1".to_string(),
        })
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "Ticket already used");
    assert!(result.attendee.is_none());
}

#[tokio::test]
async fn test_checkin_rejection_without_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hosts/me/attendees/checkin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Ticket already used"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .checkin("USED".to_string(), "E1".to_string())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "Ticket already used");
    assert_eq!(result.timestamp, None);
}

#[tokio::test]
async fn test_checkin_rejection_on_error_status_without_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hosts/me/attendees/checkin"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "Ticket is for another event"
        })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .checkin("OTHER".to_string(), "E1".to_string())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "Ticket is for another event");
    assert_eq!(result.timestamp, None);
}

#[tokio::test]
async fn test_checkin_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hosts/me/attendees/checkin"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Ticket not found" })),
        )
        .mount(&server)
        .await;

    let error = client_for(&server)
        .checkin("NOPE".to_string(), "E1".to_string())
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(404));
    assert_eq!(error.user_message(), "Ticket not found");
}

#[tokio::test]
async fn test_unauthorized_maps_to_variant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hosts/me/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let error = client_for(&server).list_events().await.unwrap_err();
    assert!(matches!(error, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_list_events_and_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hosts/me/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "E1", "title": "Launch Party", "start_date": "2025-01-01", "location": "Lagos" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hosts/me/events/E1/attendees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stats": { "total": 10, "checked_in": 4, "active": 5, "cancelled": 1 },
            "attendees": []
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let events = client.list_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Launch Party");

    let stats = client.event_stats("E1".to_string()).await.unwrap();
    assert_eq!(stats.checked_in, 4);
    assert_eq!(stats.check_in_rate(), 40);
}

#[tokio::test]
async fn test_malformed_success_body_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hosts/me/events/E1/attendees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Stats": {} })))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .fetch_event_stats("E1")
        .await
        .unwrap_err();
    assert!(matches!(error, ApiError::ResponseParseFailed(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_request_failure() {
    let client = HttpApiClient::new("http://127.0.0.1:9", None, DEFAULT_TIMEOUT).unwrap();
    let error = client.fetch_events().await.unwrap_err();
    assert!(matches!(error, ApiError::RequestFailed(_)));
}

// ===== Admin endpoints =====

#[tokio::test]
async fn test_list_users_sends_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .and(query_param("role", "host"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "u-1",
                "name": "Ada",
                "username": "ada",
                "email": "ada@example.com",
                "role": "host",
                "newsletter_subscribed": true,
                "created_at": "2024-06-01T00:00:00Z"
            }],
            "total": 21,
            "hasMore": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .list_users(&UserQuery {
            page: 2,
            role: Some("host".to_string()),
            ..UserQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 21);
    assert!(!page.has_more);
    assert_eq!(page.data[0].role, Role::Host);
}

#[tokio::test]
async fn test_user_details_defaults_missing_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/users/u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {
                "id": "u-1",
                "name": "Ada",
                "username": "ada",
                "email": "ada@example.com",
                "role": "guest",
                "created_at": "2024-06-01T00:00:00Z"
            },
            "tickets": [{ "id": "t-1" }]
        })))
        .mount(&server)
        .await;

    let details = client_for(&server).user_details("u-1").await.unwrap();
    assert_eq!(details.tickets.len(), 1);
    assert!(details.events.is_empty());
    assert!(!details.user.newsletter_subscribed);
}

#[tokio::test]
async fn test_set_user_role_puts_role() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/admin/users/u-1/role"))
        .and(body_json(json!({ "role": "superhost" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .set_user_role("u-1", Role::Superhost)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transactions_all_status_is_unfiltered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "tx-1", "reference": "R1", "amount": 5000.0, "currency": "NGN",
                    "status": "completed", "method": "card", "created_at": "2025-01-01"
                },
                {
                    "id": "tx-2", "reference": "R2", "amount": 1200.0, "currency": "NGN",
                    "status": "failed", "method": "transfer", "created_at": "2025-01-02",
                    "failure_reason": "Insufficient funds"
                }
            ],
            "total": 2,
            "hasMore": false
        })))
        .mount(&server)
        .await;

    let page = client_for(&server)
        .list_transactions(&TransactionQuery {
            status: Some("all".to_string()),
            ..TransactionQuery::default()
        })
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query_pairs().all(|(key, _)| key != "status"));
    assert!((page.completed_amount() - 5000.0).abs() < f64::EPSILON);
}

// ===== Account and health =====

#[tokio::test]
async fn test_forgot_password_surfaces_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(body_json(json!({ "email": "nobody@example.com" })))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "No account with that email" })))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .forgot_password("nobody@example.com")
        .await
        .unwrap_err();
    assert_eq!(error.user_message(), "No account with that email");
}

#[tokio::test]
async fn test_forgot_password_default_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let message = client_for(&server)
        .forgot_password("ada@example.com")
        .await
        .unwrap();
    assert_eq!(message, "Password reset link sent to your email");

    let failing = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing)
        .await;

    let error = client_for(&failing)
        .forgot_password("ada@example.com")
        .await
        .unwrap_err();
    assert_eq!(error.user_message(), "Failed to send reset email");
}

#[tokio::test]
async fn test_health_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.health().await.unwrap(), Health::Reachable);
    assert_eq!(client.health().await.unwrap(), Health::Unhealthy(503));
}
