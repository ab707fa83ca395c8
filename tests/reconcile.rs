//! End-to-end reconciliation against a mock Apstra server.

use apstra_reconcile::config::{ReconcileRequest, TokenResolver};
use apstra_reconcile::error::ErrorKind;
use apstra_reconcile::planner::Action;
use apstra_reconcile::reconcile_request_with;
use apstra_reconcile::report::Outcome;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POOLS: &str = "/api/resources/ip-pools";
const TOKEN: &str = "secret-token";

fn request(server: &MockServer, extra: Value) -> ReconcileRequest {
    let mut document = json!({
        "server": server.uri(),
        "api_token": TOKEN,
        "kind": "ip-pools",
        "display_name": "cicd_test",
        "max_attempts": 3,
        "retry_base_delay_ms": 0,
        "timeout_secs": 5
    });
    if let (Some(base), Value::Object(extra)) = (document.as_object_mut(), extra) {
        base.extend(extra);
    }
    serde_json::from_value(document).unwrap()
}

async fn reconcile(request: &ReconcileRequest, dry_run: bool) -> Outcome {
    let resolver = TokenResolver::with_lookup(|_: &str| None);
    reconcile_request_with(request, dry_run, &resolver).await
}

fn pool(id: &str, subnets: &[&str]) -> Value {
    json!({
        "id": id,
        "display_name": "cicd_test",
        "subnets": subnets
            .iter()
            .map(|s| json!({ "network": s, "status": "pool_element_available" }))
            .collect::<Vec<_>>(),
        "tags": []
    })
}

async fn mount_listing(server: &MockServer, items: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(POOLS))
        .and(header("AuthToken", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_pool_with_two_subnets() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![]).await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .and(body_partial_json(json!({
            "display_name": "cicd_test",
            "subnets": [{ "network": "100.1.1.0/24" }, { "network": "100.1.2.0/24" }]
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(pool("p9", &["100.1.1.0/24", "100.1.2.0/24"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24", "100.1.2.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(outcome.changed);
    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.resource_id.as_deref(), Some("p9"));
    assert!(outcome.after.is_some());
}

#[tokio::test]
async fn test_second_run_is_a_noop() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![pool("p9", &["100.1.2.0/24", "100.1.1.0/24"])]).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24", "100.1.2.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(!outcome.changed);
    assert_eq!(outcome.action, Action::None);
    assert_eq!(outcome.resource_id.as_deref(), Some("p9"));
    assert!(outcome.diff.is_empty());
}

#[tokio::test]
async fn test_update_adds_subnet() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![pool("p1", &["100.1.1.0/24"])]).await;

    Mock::given(method("PUT"))
        .and(path(format!("{POOLS}/p1")))
        .and(body_partial_json(json!({
            "subnets": [{ "network": "100.1.1.0/24" }, { "network": "100.1.2.0/24" }]
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "id": "p1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{POOLS}/p1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(pool("p1", &["100.1.1.0/24", "100.1.2.0/24"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24", "100.1.2.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(outcome.changed);
    assert_eq!(outcome.action, Action::Update);
    assert_eq!(outcome.diff.len(), 1);
    assert_eq!(outcome.diff[0].field, "subnets");
    assert!(outcome.before.is_some());
}

#[tokio::test]
async fn test_delete_existing_pool() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![pool("p1", &["100.1.1.0/24"])]).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{POOLS}/p1")))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "state": "absent" }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(outcome.changed);
    assert_eq!(outcome.action, Action::Delete);
    assert_eq!(outcome.resource_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_absent_pool_that_does_not_exist() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![]).await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "state": "absent" }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(!outcome.changed);
    assert!(outcome.resource_id.is_none());
}

#[tokio::test]
async fn test_check_mode_reports_without_writing() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![]).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24"] }));
    let outcome = reconcile(&req, true).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(outcome.changed);
    assert!(outcome.dry_run);
    assert_eq!(outcome.action, Action::Create);
    assert!(outcome.after.is_none());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_listing(&server, vec![pool("p9", &["100.1.1.0/24"])]).await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(!outcome.changed);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(!outcome.changed);
    assert_eq!(outcome.error.map(|e| e.kind), Some(ErrorKind::Unavailable));
}

#[tokio::test]
async fn test_duplicate_identity_is_refused() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        vec![pool("p1", &["100.1.1.0/24"]), pool("p2", &["100.1.2.0/24"])],
    )
    .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(!outcome.changed);
    assert_eq!(
        outcome.error.map(|e| e.kind),
        Some(ErrorKind::AmbiguousIdentity)
    );
}

#[tokio::test]
async fn test_rejected_token_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "errors": "Invalid token" })))
        .expect(1)
        .mount(&server)
        .await;

    let req = request(&server, json!({}));
    let outcome = reconcile(&req, false).await;

    let error = outcome.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Unauthorized);
    assert!(!error.message.contains(TOKEN));
}

#[tokio::test]
async fn test_rejected_write_carries_server_detail() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![]).await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "errors": { "subnets": "overlap" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(!outcome.changed);
    let error = outcome.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Malformed);
    assert!(error.detail.unwrap_or_default().contains("overlap"));
}

#[tokio::test]
async fn test_login_with_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .and(body_partial_json(json!({ "username": "admin" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": TOKEN })))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, vec![pool("p9", &["100.1.1.0/24"])]).await;

    let mut req = request(
        &server,
        json!({ "username": "admin", "password": "hunter2", "subnets": ["100.1.1.0/24"] }),
    );
    req.api_token = None;
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(!outcome.changed);
}

#[tokio::test]
async fn test_transient_write_failures_are_retried() {
    let server = MockServer::start().await;
    mount_listing(&server, vec![]).await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(201).set_body_json(pool("p9", &["100.1.1.0/24"])))
        .expect(1)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(outcome.changed);
    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.resource_id.as_deref(), Some("p9"));
}

#[tokio::test]
async fn test_retried_create_adopts_pool_from_lost_response() {
    let server = MockServer::start().await;

    // The first POST lands on the server but its response is lost.
    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(504))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, vec![pool("p9", &["100.1.1.0/24"])]).await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24"] }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(outcome.changed);
    assert_eq!(outcome.resource_id.as_deref(), Some("p9"));
}

#[tokio::test]
async fn test_reconcile_twice_against_same_server() {
    let server = MockServer::start().await;
    let created = pool("p9", &["100.1.1.0/24", "100.1.2.0/24"]);

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(201).set_body_json(created.clone()))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, vec![created]).await;

    let req = request(&server, json!({ "subnets": ["100.1.1.0/24", "100.1.2.0/24"] }));
    let first = reconcile(&req, false).await;
    let second = reconcile(&req, false).await;

    assert!(first.error.is_none(), "{first}");
    assert!(second.error.is_none(), "{second}");
    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(second.action, Action::None);
    assert!(first.after.is_some());
    assert_eq!(first.after, second.after);
}

#[tokio::test]
async fn test_absent_pool_with_missing_collection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let req = request(&server, json!({ "state": "absent" }));
    let outcome = reconcile(&req, false).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(!outcome.changed);
}

#[tokio::test]
async fn test_ipv6_prefix_spelling_is_not_a_change() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/resources/ipv6-pools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "v6",
                "display_name": "cicd_test",
                "subnets": [{ "network": "fc01:a05:fab::/48", "status": "pool_element_available" }],
                "tags": []
            }]
        })))
        .mount(&server)
        .await;

    let req = request(
        &server,
        json!({ "kind": "ipv6-pools", "subnets": ["FC01:0A05:0FAB::/48"] }),
    );
    let outcome = reconcile(&req, true).await;

    assert!(outcome.error.is_none(), "{outcome}");
    assert!(!outcome.changed);
    assert_eq!(outcome.action, Action::None);
}
