//! Session client tests against a local stand-in for the invoicing service.
//!
//! Run with: `cargo test -p invoice-tickets-invoicing --test session_integration`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use invoice_tickets_invoicing::directory::index_by_purchase_request;
use invoice_tickets_invoicing::{
    Credentials, Endpoints, InvoiceClient, InvoiceConnector, InvoiceService, InvoiceState,
    InvoicingError, Session, SessionConnector,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_PATH: &str = "/services/squareup.invoice.service.InvoiceService/List";
const CANCEL_PATH: &str = "/services/squareup.invoice.service.InvoiceService/Cancel";

fn credentials() -> Credentials {
    Credentials::new("ops@example.com".into(), "hunter2".into())
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "_js_csrf=csrf-abc; Path=/")
                .set_body_string("<html>login</html>"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mp/login"))
        .and(header("X-CSRF-Token", "csrf-abc"))
        .and(body_json(json!({"email": "ops@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_bootstrap(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/dashboard/navigation"))
        .and(header("X-CSRF-Token", "csrf-abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"merchant": "Gala Society", "token": "merchant-1"})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/multiunit/subunits"))
        .and(header("X-Merchant-Token", "merchant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [
                {"email": "a@example.com", "nickname": "Main", "token": "unit-1", "unit_active": true},
                {"email": "b@example.com", "nickname": "Other", "token": "unit-2", "unit_active": true}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_connect_and_list_invoices() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_bootstrap(&server).await;

    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(header("X-CSRF-Token", "csrf-abc"))
        .and(header("X-Merchant-Token", "merchant-1"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"count": 10_000_000, "unit_token": "unit-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next_cursor": "",
            "invoice": [
                {"token": "inv_42", "merchant_invoice_number": "PurchaseRequest 42", "state": "PAID", "delivery_status": "SENT"},
                {"token": "inv_x", "merchant_invoice_number": "Random Thing", "state": "UNPAID", "delivery_status": "SENT"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = SessionConnector::new(credentials(), Duration::from_secs(5))
        .with_endpoints(Endpoints::with_base(&server.uri()));
    let client = connector.connect().await.expect("connect");
    assert_eq!(client.identity().merchant_token, "merchant-1");
    assert_eq!(client.identity().unit_token, "unit-1");

    let invoices = InvoiceService::list_invoices(&client).await.expect("list");
    assert_eq!(invoices.len(), 2);

    let index = index_by_purchase_request(invoices);
    assert_eq!(index.len(), 1);
    assert_eq!(index[&42].state, InvoiceState::Paid);
}

#[tokio::test]
async fn test_login_rejected_by_error_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "_js_csrf=csrf-abc; Path=/"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mp/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error_title": "Login failed",
            "error_message": "Email or password is incorrect"
        })))
        .mount(&server)
        .await;

    let result = Session::authenticate(
        &credentials(),
        Endpoints::with_base(&server.uri()),
        Duration::from_secs(5),
    )
    .await;

    match result {
        Err(InvoicingError::Auth(reason)) => assert!(reason.contains("incorrect")),
        other => panic!("expected auth error, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_login_rejected_by_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mp/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let result = Session::authenticate(
        &credentials(),
        Endpoints::with_base(&server.uri()),
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(InvoicingError::Auth(_))));
}

#[tokio::test]
async fn test_bootstrap_navigation_failure() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/dashboard/navigation"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = InvoiceClient::connect(
        &credentials(),
        Endpoints::with_base(&server.uri()),
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(
        result,
        Err(InvoicingError::Bootstrap {
            stage: "navigation",
            ..
        })
    ));
}

#[tokio::test]
async fn test_bootstrap_without_units() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/dashboard/navigation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"merchant": "m", "token": "merchant-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/multiunit/subunits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entities": []})))
        .mount(&server)
        .await;

    let client = InvoiceClient::connect(
        &credentials(),
        Endpoints::with_base(&server.uri()),
        Duration::from_secs(5),
    )
    .await
    .expect("connect");

    assert_eq!(client.identity().merchant_token, "merchant-1");
    assert!(client.identity().unit_token.is_empty());
}

#[tokio::test]
async fn test_cancel_surfaces_remote_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_bootstrap(&server).await;
    Mock::given(method("POST"))
        .and(path(CANCEL_PATH))
        .and(body_json(json!({"token": "inv_7", "send_email_to_recipients": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error_title": "Cannot cancel",
            "error_message": "Invoice already paid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = InvoiceClient::connect(
        &credentials(),
        Endpoints::with_base(&server.uri()),
        Duration::from_secs(5),
    )
    .await
    .expect("connect");

    let result = client.cancel_invoice("inv_7").await;
    assert_eq!(
        result.err(),
        Some(InvoicingError::Remote {
            title: "Cannot cancel".into(),
            message: "Invoice already paid".into(),
        })
    );
}

#[tokio::test]
async fn test_slow_list_times_out() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_bootstrap(&server).await;
    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"invoice": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = InvoiceClient::connect(
        &credentials(),
        Endpoints::with_base(&server.uri()),
        Duration::from_millis(500),
    )
    .await
    .expect("connect");

    let error = client.list_invoices().await.expect_err("timeout");
    assert!(error.is_transport());
    assert!(matches!(error, InvoicingError::Timeout(_)));
}

#[tokio::test]
async fn test_list_unexpected_status() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_bootstrap(&server).await;
    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = InvoiceClient::connect(
        &credentials(),
        Endpoints::with_base(&server.uri()),
        Duration::from_secs(5),
    )
    .await
    .expect("connect");

    assert!(matches!(
        client.list_invoices().await,
        Err(InvoicingError::UnexpectedStatus { status: 502, .. })
    ));
}
