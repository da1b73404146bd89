//! Integration tests for the request dispatcher
//!
//! Tests cover:
//! - Header merge precedence (caller headers win)
//! - Method routing (GET debounced, other verbs immediate)
//! - Debounce key isolation per endpoint
//! - Trailing-window timing
//! - Payload passthrough for POST/PUT/PATCH
//! - Error transparency
//! - Response unwrapping
//!
//! Timing tests run on paused tokio time, so windows elapse instantly.

mod helpers;

use futures::future::join_all;
use helpers::MockTransport;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;
use vtel_client::{ApiDispatcher, HttpRequest, RequestOptions, TransportResponse};
use vtel_common::api::{ApiError, HttpMethod};
use vtel_common::config::TokenSource;
use vtel_common::endpoints;

const BASE_URL: &str = "http://backend.test/api";

fn dispatcher(transport: MockTransport) -> ApiDispatcher<MockTransport> {
    ApiDispatcher::new(transport, BASE_URL, TokenSource::fixed("tok-123"))
}

// =============================================================================
// Request construction
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_default_headers() {
    let api = dispatcher(MockTransport::returning(json!([])));

    api.get(endpoints::CONTACTS).await.unwrap();

    let request = api.transport().last_request();
    assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    assert_eq!(request.headers[AUTHORIZATION], "Bearer tok-123");
    assert_eq!(request.url, "http://backend.test/api/contacts");
}

#[tokio::test(start_paused = true)]
async fn test_caller_header_overrides_default() {
    let api = dispatcher(MockTransport::echo());
    let options = RequestOptions::new()
        .try_header("content-type", "multipart/form-data")
        .unwrap();

    api.call("/campaigns/upload", HttpMethod::Post, Some(json!({})), options)
        .await
        .unwrap();

    let request = api.transport().last_request();
    let values: Vec<_> = request.headers.get_all(CONTENT_TYPE).iter().collect();
    assert_eq!(values, vec![&HeaderValue::from_static("multipart/form-data")]);
    assert_eq!(request.headers[AUTHORIZATION], "Bearer tok-123");
}

#[tokio::test(start_paused = true)]
async fn test_caller_can_override_authorization() {
    let api = dispatcher(MockTransport::echo());
    let options = RequestOptions::new()
        .try_header("Authorization", "Bearer other")
        .unwrap();

    api.call(endpoints::PLANS, HttpMethod::Delete, None, options)
        .await
        .unwrap();

    assert_eq!(api.transport().last_request().headers[AUTHORIZATION], "Bearer other");
}

#[tokio::test(start_paused = true)]
async fn test_no_authorization_without_token() {
    let api = ApiDispatcher::new(
        MockTransport::returning(Value::Null),
        BASE_URL,
        TokenSource::none(),
    );

    api.get(endpoints::DASHBOARD).await.unwrap();

    assert!(api.transport().last_request().headers.get(AUTHORIZATION).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_session_token_read_per_call() {
    let temp = TempDir::new().unwrap();
    let session_file = temp.path().join("session_token");
    let token = TokenSource::new(Some(session_file.clone()), Some("static".to_string()));
    let api = ApiDispatcher::new(MockTransport::echo(), BASE_URL, token);

    api.post(endpoints::CONTACTS, json!({})).await.unwrap();
    assert_eq!(api.transport().last_request().headers[AUTHORIZATION], "Bearer static");

    fs::write(&session_file, "logged-in").unwrap();
    api.post(endpoints::CONTACTS, json!({})).await.unwrap();
    assert_eq!(api.transport().last_request().headers[AUTHORIZATION], "Bearer logged-in");
}

#[tokio::test(start_paused = true)]
async fn test_absolute_endpoint_bypasses_base_url() {
    let api = dispatcher(MockTransport::returning(json!({})));

    api.get("https://files.example/recordings/1").await.unwrap();

    assert_eq!(api.transport().last_request().url, "https://files.example/recordings/1");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_passed_through() {
    let api = dispatcher(MockTransport::echo());
    let options = RequestOptions::new().timeout(Duration::from_secs(5));

    api.call(endpoints::REPORTS, HttpMethod::Put, Some(json!({})), options)
        .await
        .unwrap();

    assert_eq!(api.transport().last_request().timeout, Some(Duration::from_secs(5)));
}

// =============================================================================
// Payload passthrough
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_payload_passthrough_for_body_methods() {
    let api = dispatcher(MockTransport::echo());
    let data = json!({
        "name": "Support line",
        "nodes": [{"key": "1", "action": "queue", "target": null}],
        "options": {"record": true, "retries": 3}
    });

    for method in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch] {
        let returned = api
            .call(endpoints::IVR_FLOWS, method, Some(data.clone()), RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(api.transport().last_request().body, Some(data.clone()));
        assert_eq!(returned, data);
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_body_for_get_and_delete() {
    let api = dispatcher(MockTransport::echo());

    api.call(endpoints::CONTACTS, HttpMethod::Get, Some(json!({"q": 1})), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(api.transport().last_request().body, None);

    api.call(
        &endpoints::contact_by_id(4),
        HttpMethod::Delete,
        Some(json!({"q": 1})),
        RequestOptions::new(),
    )
    .await
    .unwrap();
    assert_eq!(api.transport().last_request().body, None);
}

// =============================================================================
// Method routing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_rapid_gets_collapse_to_one_call() {
    let api = dispatcher(MockTransport::returning(json!([{"id": 1}])));

    let results = join_all((0..5).map(|_| api.get(endpoints::CALL_LOGS))).await;

    assert_eq!(api.transport().call_count(), 1);
    for result in results {
        assert_eq!(result.unwrap(), json!([{"id": 1}]));
    }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_posts_are_not_debounced() {
    let api = dispatcher(MockTransport::echo());

    let results = join_all((0..5).map(|i| api.post(endpoints::CONTACTS, json!({"n": i})))).await;

    assert_eq!(api.transport().call_count(), 5);
    assert!(results.iter().all(Result::is_ok));
}

#[tokio::test(start_paused = true)]
async fn test_post_is_sent_immediately() {
    let api = dispatcher(MockTransport::echo());
    let start = Instant::now();

    api.post(endpoints::CREDITS, json!({"amount": 10})).await.unwrap();

    assert!(api.transport().calls()[0].at.duration_since(start) < Duration::from_millis(1));
    assert_eq!(api.pending_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_post_is_not_retried() {
    let api = dispatcher(MockTransport::failing(ApiError::Network("reset".to_string())));

    let result = api.post(endpoints::CONTACTS, json!({})).await;

    assert!(matches!(result, Err(ApiError::Network(_))));
    assert_eq!(api.transport().call_count(), 1);
}

// =============================================================================
// Debounce key isolation and timing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_different_endpoints_debounce_independently() {
    let api = dispatcher(MockTransport::new(|request| {
        Ok(TransportResponse::ok(json!(request.url.clone())))
    }));

    let (contacts, branches) =
        tokio::join!(api.get(endpoints::CONTACTS), api.get(endpoints::BRANCHES));

    assert_eq!(api.transport().call_count(), 2);
    assert_eq!(contacts.unwrap(), json!("http://backend.test/api/contacts"));
    assert_eq!(branches.unwrap(), json!("http://backend.test/api/branches"));
}

#[tokio::test(start_paused = true)]
async fn test_trailing_window_uses_latest_call() {
    let api = dispatcher(MockTransport::new(|request| {
        let marker = request.headers.get("x-call").and_then(|v| v.to_str().ok()).unwrap_or("");
        Ok(TransportResponse::ok(json!(marker)))
    }));
    let start = Instant::now();

    let first = async {
        let options = RequestOptions::new().try_header("x-call", "t0").unwrap();
        api.call(endpoints::REPORTS, HttpMethod::Get, None, options).await
    };
    let second = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let options = RequestOptions::new().try_header("x-call", "t100").unwrap();
        api.call(endpoints::REPORTS, HttpMethod::Get, None, options).await
    };

    let (first, second) = tokio::join!(first, second);

    let calls = api.transport().calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].at.duration_since(start) >= Duration::from_millis(400));
    assert_eq!(calls[0].request.headers["x-call"], "t100");
    assert_eq!(first.unwrap(), json!("t100"));
    assert_eq!(second.unwrap(), json!("t100"));
}

#[tokio::test(start_paused = true)]
async fn test_get_after_window_issues_new_call() {
    let api = dispatcher(MockTransport::returning(json!({})));

    api.get(endpoints::SETTINGS).await.unwrap();
    api.get(endpoints::SETTINGS).await.unwrap();

    assert_eq!(api.transport().call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_custom_debounce_delay() {
    let base = dispatcher(MockTransport::returning(json!({})));
    let fast = base.with_debounce_delay(Duration::from_millis(50));
    let start = Instant::now();

    fast.get(endpoints::USER_STATUS).await.unwrap();

    assert_eq!(fast.debounce_delay(), Duration::from_millis(50));
    assert_eq!(base.debounce_delay(), Duration::from_millis(300));
    let at = fast.transport().calls()[0].at.duration_since(start);
    assert!(at >= Duration::from_millis(50) && at < Duration::from_millis(300));
    // Shared transport
    assert_eq!(base.transport().call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_awaited_mutation_then_read_is_ordered() {
    let api = dispatcher(MockTransport::echo().with_latency(Duration::from_millis(200)));
    let start = Instant::now();

    api.post(endpoints::CONTACT_LISTS, json!({"name": "VIP"})).await.unwrap();
    api.get(endpoints::CONTACT_LISTS).await.unwrap();

    let calls = api.transport().calls();
    assert_eq!(calls[0].request.method, HttpMethod::Post);
    assert_eq!(calls[1].request.method, HttpMethod::Get);
    // Read window starts only after the mutation's round-trip completed
    assert!(calls[1].at.duration_since(start) >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_clones_share_debounce_registry() {
    let api = dispatcher(MockTransport::returning(json!(1)));
    let clone = api.clone();

    let (a, b) = tokio::join!(api.get(endpoints::PLANS), clone.get(endpoints::PLANS));

    assert_eq!(api.transport().call_count(), 1);
    assert_eq!((a.unwrap(), b.unwrap()), (json!(1), json!(1)));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_get_never_reaches_transport() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let api = dispatcher(MockTransport::new(move |_: &HttpRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(TransportResponse::ok(Value::Null))
    }));

    join_all((0..10).map(|_| api.get(endpoints::VIRTUAL_NUMBERS))).await;

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Errors and unwrapping
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_error_transparency() {
    let error = ApiError::Status {
        status: 404,
        body: json!({"message": "not found"}),
    };
    let api = dispatcher(MockTransport::failing(error.clone()));

    let get_err = api.get(&endpoints::invoice_by_id(99)).await.unwrap_err();
    let post_err = api.post(endpoints::INVOICES, json!({})).await.unwrap_err();

    for err in [get_err, post_err] {
        assert_eq!(err, error);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body(), Some(&json!({"message": "not found"})));
    }
}

#[tokio::test(start_paused = true)]
async fn test_debounced_error_reaches_every_waiter() {
    let api = dispatcher(MockTransport::failing(ApiError::Status {
        status: 500,
        body: json!("boom"),
    }));

    let results = join_all((0..3).map(|_| api.get(endpoints::DASHBOARD))).await;

    assert_eq!(api.transport().call_count(), 1);
    for result in results {
        assert_eq!(result.unwrap_err().status(), Some(500));
    }
}

#[tokio::test(start_paused = true)]
async fn test_get_cancelled_when_transport_panics() {
    let api = dispatcher(MockTransport::new(|_| panic!("transport crashed")));

    let err = api.get(endpoints::CONTACTS).await.unwrap_err();

    assert_eq!(err, ApiError::Cancelled);
    assert_eq!(api.transport().call_count(), 1);
    assert_eq!(api.pending_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_response_unwrapped_verbatim() {
    let payloads = [
        Value::Null,
        json!([]),
        json!({"success": true, "data": {"items": [{"id": 1, "tags": ["a"]}]}}),
        json!("text"),
        json!(0),
    ];

    for payload in payloads {
        let api = dispatcher(MockTransport::returning(payload.clone()));
        assert_eq!(api.get(endpoints::BRANCHES).await.unwrap(), payload);
        assert_eq!(api.post(endpoints::BRANCHES, json!({})).await.unwrap(), payload);
    }
}

#[tokio::test(start_paused = true)]
async fn test_envelope_status_and_headers_not_returned() {
    let api = dispatcher(MockTransport::new(|_| {
        let mut response = TransportResponse::ok(json!({"id": 5}));
        response.status = 201;
        Ok(response)
    }));

    let payload = api.post(endpoints::CAMPAIGNS, json!({"name": "Spring"})).await.unwrap();

    assert_eq!(payload, json!({"id": 5}));
}

#[tokio::test(start_paused = true)]
async fn test_call_as_deserializes_payload() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Branch {
        id: u32,
        name: String,
    }

    let api = dispatcher(MockTransport::returning(json!([{"id": 1, "name": "North"}])));

    let branches: Vec<Branch> = api
        .call_as(endpoints::BRANCHES, HttpMethod::Get, None, RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(branches, vec![Branch { id: 1, name: "North".to_string() }]);

    let err = api
        .call_as::<Vec<u32>>(endpoints::BRANCHES, HttpMethod::Get, None, RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}
