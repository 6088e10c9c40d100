use super::*;
use crate::test_support::serve_once;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FixedToken(Option<&'static str>);

impl CredentialSource for FixedToken {
    fn credential(&self) -> Credential {
        Credential { token: self.0.map(ToOwned::to_owned), generation: 3 }
    }
}

#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
    rejected: std::sync::Mutex<Vec<Credential>>,
}

impl UnauthorizedHandler for CountingHandler {
    fn on_unauthorized(&self, rejected: &Credential) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rejected.lock().unwrap().push(rejected.clone());
    }
}

fn client(base_url: String, token: Option<&'static str>) -> ApiClient {
    ApiClient::with_client(reqwest::Client::new(), base_url, Arc::new(FixedToken(token)))
}

// =============================================================================
// classify_response
// =============================================================================

#[test]
fn classify_unwraps_success_envelope() {
    let body = json!({ "success": true, "message": "ok", "data": [{ "id": 1 }] }).to_string();
    assert_eq!(classify_response(200, &body).unwrap(), json!([{ "id": 1 }]));
}

#[test]
fn classify_empty_success_body_is_null() {
    assert_eq!(classify_response(204, "").unwrap(), Value::Null);
}

#[test]
fn classify_401_is_unauthorized() {
    assert!(matches!(classify_response(401, ""), Err(ApiError::Unauthorized)));
}

#[test]
fn classify_403_is_forbidden_with_message() {
    let body = json!({ "message": "Access denied" }).to_string();
    let err = classify_response(403, &body).unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { message: Some(ref m) } if m == "Access denied"));
    assert_eq!(err.to_string(), "forbidden: Access denied");
}

#[test]
fn classify_other_status_keeps_message() {
    let body = json!({ "success": false, "message": "Lab not found" }).to_string();
    let err = classify_response(404, &body).unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, message: Some(ref m) } if m == "Lab not found"));
}

#[test]
fn classify_failure_envelope_with_ok_status_is_error() {
    let body = json!({ "success": false, "message": "Booking conflicts with an existing booking" }).to_string();
    let err = classify_response(200, &body).unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 200, .. }));
}

#[test]
fn classify_non_json_body_becomes_string() {
    assert_eq!(classify_response(200, "pong").unwrap(), json!("pong"));
    let err = classify_response(500, "boom").unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, message: None }));
}

// =============================================================================
// ApiClient over a canned server
// =============================================================================

#[tokio::test]
async fn request_attaches_bearer_token() {
    let (base_url, server) = serve_once("200 OK", r#"{"success":true,"data":{"id":9}}"#).await;
    let api = client(base_url, Some("tok-9"));

    let value = api.request(Method::GET, "/labs/9", None).await.unwrap();
    assert_eq!(value, json!({ "id": 9 }));

    let head = server.await.unwrap().to_ascii_lowercase();
    assert!(head.starts_with("get /api/labs/9 "));
    assert!(head.contains("authorization: bearer tok-9"));
}

#[tokio::test]
async fn request_without_session_sends_no_authorization() {
    let (base_url, server) = serve_once("200 OK", "[]").await;
    let api = client(base_url, None);

    let labs: Vec<Value> = api.get_json("/labs/active").await.unwrap();
    assert!(labs.is_empty());

    let head = server.await.unwrap().to_ascii_lowercase();
    assert!(!head.contains("authorization:"));
}

#[tokio::test]
async fn unauthorized_response_notifies_every_subscriber() {
    let (base_url, _server) = serve_once("401 Unauthorized", "").await;
    let api = client(base_url, Some("expired"));
    let first = Arc::new(CountingHandler::default());
    let second = Arc::new(CountingHandler::default());
    api.on_unauthorized(first.clone());
    api.on_unauthorized(second.clone());

    let err = api.request(Method::GET, "/bookings/my-bookings", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthorized_handlers_receive_the_rejected_credential() {
    let (base_url, _server) = serve_once("401 Unauthorized", "").await;
    let api = client(base_url, Some("expired"));
    let handler = Arc::new(CountingHandler::default());
    api.on_unauthorized(handler.clone());

    api.request(Method::GET, "/labs", None).await.unwrap_err();
    let rejected = handler.rejected.lock().unwrap();
    assert_eq!(*rejected, vec![Credential { token: Some("expired".to_owned()), generation: 3 }]);
}

#[tokio::test]
async fn forbidden_response_does_not_notify() {
    let (base_url, _server) = serve_once("403 Forbidden", r#"{"message":"Access denied"}"#).await;
    let api = client(base_url, Some("valid"));
    let handler = Arc::new(CountingHandler::default());
    api.on_unauthorized(handler.clone());

    let err = api.request(Method::DELETE, "/admin/users/4", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn get_json_reports_decode_mismatch() {
    let (base_url, _server) = serve_once("200 OK", r#"{"data":"not-a-list"}"#).await;
    let api = client(base_url, Some("t"));

    let err = api.get_json::<Vec<i64>>("/equipment").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn connection_failure_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api = client(format!("http://{addr}/api"), None);

    let err = api.request(Method::GET, "/labs", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
