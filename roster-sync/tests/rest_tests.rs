use roster_sync::prompt::mock::ScriptedPrompt;
use roster_sync::{
    LoadSource, MemoryCache, RemoteStore, RestConfig, RestStore, SubmitOutcome, SyncConfig,
    SyncError, Synchronizer,
};
use roster_types::{ChangeEvent, NewRecord, Record, RecordForm, RecordId};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "anon-key";

fn mock_config(server: &MockServer) -> RestConfig {
    RestConfig {
        base_url: format!("{}/", server.uri()),
        api_key: KEY.to_string(),
        ..Default::default()
    }
}

fn store(server: &MockServer) -> RestStore {
    RestStore::new(mock_config(server)).unwrap()
}

fn candidate() -> NewRecord {
    NewRecord {
        name: "Ann".into(),
        age: Some(34),
        salary: None,
        gender: Some("F".into()),
        custom_id: "E1".into(),
    }
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn rest_config_defaults() {
    let cfg = RestConfig::default();
    assert_eq!(cfg.schema, "public");
    assert_eq!(cfg.request_timeout_secs, 30);
    assert!(cfg.api_key.is_empty());
}

#[test]
fn rest_config_serde_fills_defaults() {
    let cfg: RestConfig =
        serde_json::from_value(json!({"base_url": "https://x.example", "api_key": "k"})).unwrap();
    assert_eq!(cfg.base_url, "https://x.example");
    assert_eq!(cfg.schema, "public");
}

#[test]
fn rest_store_rejects_empty_base_url() {
    let cfg = RestConfig {
        base_url: "  ".into(),
        ..Default::default()
    };
    assert!(matches!(RestStore::new(cfg), Err(SyncError::Config(_))));
}

#[test]
fn rest_store_provider_name() {
    let store = RestStore::new(RestConfig::default()).unwrap();
    assert_eq!(store.provider_name(), "PostgREST");
}

// ── Bulk query ──────────────────────────────────────────────────

#[tokio::test]
async fn fetch_all_orders_by_created_at_and_authenticates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("select", "*"))
        .and(query_param("order", "created_at.asc"))
        .and(header("apikey", KEY))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("accept-profile", "public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Ann", "age": 34, "salary": null, "gender": "F",
             "custom_id": "E1", "created_at": "2024-01-01T00:00:01+00:00"},
            {"id": 2, "name": "Bo", "age": null, "salary": 900, "gender": null,
             "custom_id": "E2", "created_at": "2024-01-01T00:00:02+00:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = store(&server).fetch_all("employees").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Ann");
    assert_eq!(records[0].age, Some(34));
    assert_eq!(records[1].id, RecordId::Int(2));
    assert_eq!(records[1].salary, Some(900));
}

#[tokio::test]
async fn fetch_all_maps_api_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "PGRST301",
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let err = store(&server).fetch_all("employees").await.unwrap_err();
    match err {
        SyncError::Remote { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "JWT expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_all_keeps_raw_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = store(&server).fetch_all("employees").await.unwrap_err();
    assert_eq!(err.to_string(), "remote store returned 503: upstream down");
}

#[tokio::test]
async fn fetch_all_rejects_partial_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(&server)
        .await;

    assert!(matches!(
        store(&server).fetch_all("employees").await,
        Err(SyncError::Network(_))
    ));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let cfg = RestConfig {
        base_url: "http://127.0.0.1:1".into(),
        request_timeout_secs: 2,
        ..Default::default()
    };
    let store = RestStore::new(cfg).unwrap();
    assert!(matches!(
        store.fetch_all("employees").await,
        Err(SyncError::Network(_))
    ));
}

// ── Mutations ───────────────────────────────────────────────────

#[tokio::test]
async fn insert_posts_single_element_array() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/employees"))
        .and(header("prefer", "return=minimal"))
        .and(header("content-profile", "public"))
        .and(header("apikey", KEY))
        .and(body_json(json!([{
            "name": "Ann", "age": 34, "salary": null, "gender": "F", "custom_id": "E1"
        }])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).insert("employees", &candidate()).await.unwrap();
}

#[tokio::test]
async fn insert_conflict_is_remote_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let err = store(&server).insert("employees", &candidate()).await.unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 409, .. }));
    assert!(err.to_string().contains("duplicate key"));
}

#[tokio::test]
async fn delete_filters_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/employees"))
        .and(query_param("id", "eq.5"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .delete("employees", &RecordId::Int(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_with_text_id() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(query_param("id", "eq.7f1c-aa"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .delete("employees", &RecordId::Text("7f1c-aa".into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_forbidden_is_remote_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "permission denied"})))
        .mount(&server)
        .await;

    let err = store(&server)
        .delete("employees", &RecordId::Int(1))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 403, .. }));
}

// ── Change feed ─────────────────────────────────────────────────

#[tokio::test]
async fn subscribe_decodes_ndjson_frames() {
    let server = MockServer::start().await;

    let body = [
        r#"{"eventType":"INSERT","new":{"id":1,"name":"Ann","custom_id":"E1"},"old":{}}"#,
        "",
        r#"{"eventType":"INSERT","new":{"id":2,"name":"Bo"},"old":{}}"#,
        "not json at all",
        r#"{"eventType":"UPDATE","new":{"id":1,"name":"Anne","custom_id":"E1"},"old":{"id":1}}"#,
        r#"{"eventType":"DELETE","new":{},"old":{"id":1}}"#,
        r#"{"eventType":"TRUNCATE"}"#,
    ]
    .join("\n");

    Mock::given(method("GET"))
        .and(path("/realtime/v1/changes"))
        .and(query_param("schema", "public"))
        .and(query_param("table", "employees"))
        .and(header("apikey", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let mut feed = store(&server).subscribe("employees").await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = feed.recv().await {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            ChangeEvent::Insert(Record::new(1, "Ann", "E1")),
            ChangeEvent::Update(Record::new(1, "Anne", "E1")),
            ChangeEvent::Delete(RecordId::Int(1)),
            ChangeEvent::Other("TRUNCATE".into()),
        ]
    );
}

#[tokio::test]
async fn subscribe_rejected_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/realtime/v1/changes"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such table"))
        .mount(&server)
        .await;

    let err = store(&server).subscribe("nope").await.unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: 404, .. }));
}

// ── Synchronizer over REST ──────────────────────────────────────

#[tokio::test]
async fn synchronizer_falls_back_when_backend_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::with_slot(
        "employeeData",
        r#"[{"id":5,"name":"Bo","custom_id":"E5"}]"#,
    ));
    let mut sync = Synchronizer::new(SyncConfig::default(), Arc::new(store(&server)), cache);

    assert_eq!(sync.load().await, LoadSource::Fallback);
    assert_eq!(sync.store().snapshot(), &[Record::new(5, "Bo", "E5")]);
}

#[tokio::test]
async fn synchronizer_insert_failure_over_rest_alerts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "bad row"})))
        .mount(&server)
        .await;

    let sync = Synchronizer::new(
        SyncConfig::default(),
        Arc::new(store(&server)),
        Arc::new(MemoryCache::new()),
    );
    let prompt = ScriptedPrompt::accepting();
    let form = RecordForm {
        name: "Ann".into(),
        custom_id: "E1".into(),
        ..Default::default()
    };

    let outcome = sync.submit_insert(&form, &prompt).await;
    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(
        prompt.alerts(),
        vec!["Insert failed: remote store returned 400: bad row"]
    );
}
