mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use vm_domain::config::Config;
use vm_gateway::bootstrap::{assemble, Collaborators};
use vm_gateway::realtime::WebhookVerifier;
use vm_gateway::state::AppState;
use vm_transcripts::{SqliteTranscriptStore, TranscriptStore};

use common::{catalog, CannedLlm, FakeControl, SECRET};

fn app_state(control: Arc<FakeControl>) -> AppState {
    let store: Arc<dyn TranscriptStore> = Arc::new(SqliteTranscriptStore::open_in_memory().unwrap());
    assemble(
        Arc::new(Config::default()),
        catalog(),
        Collaborators {
            control,
            llm: Arc::new(CannedLlm::default()),
            store,
            webhook_secret: SECRET.into(),
        },
    )
    .unwrap()
}

fn app(state: &AppState) -> axum::Router {
    vm_gateway::api::router().with_state(state.clone())
}

fn incoming_call(call_id: &str) -> Value {
    json!({
        "id": "evt_1",
        "object": "event",
        "type": "realtime.call.incoming",
        "created_at": 1_700_000_000,
        "data": {
            "call_id": call_id,
            "sip_headers": [
                {"name": "From", "value": "sip:+15550001@example.com"},
                {"name": "To", "value": "sip:+15550002@example.com"}
            ]
        }
    })
}

fn signed(body: &Value) -> Request<Body> {
    let raw = body.to_string();
    let ts = chrono::Utc::now().timestamp();
    let sig = WebhookVerifier::new(SECRET, 300).unwrap().sign("msg_1", ts, raw.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("webhook-id", "msg_1")
        .header("webhook-timestamp", ts.to_string())
        .header("webhook-signature", sig)
        .body(Body::from(raw))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn drain(state: &AppState) {
    tokio::time::timeout(Duration::from_secs(5), state.supervisor.wait_idle())
        .await
        .expect("calls finished");
}

#[tokio::test]
async fn bad_signature_is_rejected_without_side_effects() {
    let control = FakeControl::new();
    let state = app_state(control.clone());

    let raw = incoming_call("rtc_bad").to_string();
    let req = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("webhook-id", "msg_1")
        .header("webhook-timestamp", chrono::Utc::now().timestamp().to_string())
        .header("webhook-signature", "v1,Zm9yZ2VkLXNpZ25hdHVyZQ==")
        .body(Body::from(raw))
        .unwrap();

    let resp = app(&state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("signature"));

    assert!(control.accepted_ids().is_empty());
    assert_eq!(state.supervisor.active_count(), 0);
}

#[tokio::test]
async fn unsigned_request_is_rejected() {
    let control = FakeControl::new();
    let state = app_state(control.clone());

    let req = Request::builder()
        .method("POST")
        .uri("/webhook")
        .body(Body::from(incoming_call("rtc_1").to_string()))
        .unwrap();

    let resp = app(&state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(control.accepted_ids().is_empty());
}

#[tokio::test]
async fn incoming_call_is_accepted_as_receptionist_and_monitored() {
    let control = FakeControl::new();
    let state = app_state(control.clone());

    let resp = app(&state).oneshot(signed(&incoming_call("rtc_1"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let accepted = control.accepted.lock().clone();
    assert_eq!(accepted.len(), 1);
    let (call_id, payload) = &accepted[0];
    assert_eq!(call_id, "rtc_1");
    assert_eq!(payload.kind, "realtime");
    assert_eq!(payload.model, "gpt-realtime");
    assert_eq!(payload.instructions, "You are the receptionist.");
    assert!(payload.audio.is_some());

    drain(&state).await;
    // Monitoring ran: tools registered and greeting requested.
    assert_eq!(control.sent_to("rtc_1").len(), 2);
}

#[tokio::test]
async fn refused_accept_is_acknowledged_but_not_monitored() {
    let control = FakeControl::new();
    control.reject_accepts(404);
    let state = app_state(control.clone());

    let resp = app(&state).oneshot(signed(&incoming_call("rtc_2"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(control.accepted_ids(), ["rtc_2"]);

    drain(&state).await;
    assert!(control.sent_to("rtc_2").is_empty());
}

#[tokio::test]
async fn ended_and_unknown_events_are_acknowledged() {
    let control = FakeControl::new();
    let state = app_state(control.clone());

    let ended = json!({"id": "evt_2", "type": "realtime.call.ended", "data": {"call_id": "rtc_1"}});
    let resp = app(&state).oneshot(signed(&ended)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let other = json!({"id": "evt_3", "type": "realtime.call.refer", "data": {}});
    let resp = app(&state).oneshot(signed(&other)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert!(control.accepted_ids().is_empty());
}

#[tokio::test]
async fn signed_garbage_is_a_client_error() {
    let control = FakeControl::new();
    let state = app_state(control.clone());

    let resp = app(&state).oneshot(signed(&json!(["not", "an", "envelope"]))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let no_call = json!({"id": "evt_4", "type": "realtime.call.incoming", "data": {}});
    let resp = app(&state).oneshot(signed(&no_call)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(control.accepted_ids().is_empty());
}

#[tokio::test]
async fn health_reports_centre_and_agents() {
    let state = app_state(FakeControl::new());

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app(&state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Happy Medical Centre Webhook Server");
    assert_eq!(body["agents"], json!(["dentist", "nutritionist", "receptionist"]));
    assert_eq!(body["active_calls"], 0);
}
