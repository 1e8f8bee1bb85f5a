//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use chrono::{TimeDelta, Utc};
use hmac::{Hmac, Mac};
use livestatus_core::{
  dispatch::PushNotification,
  subject::{Subject, SubjectId, SubjectState},
  subscription::NotificationKind,
};
use serde_json::json;
use sha2::Sha256;
use tower::ServiceExt as _;

use crate::{
  AppState, LiveService, WEBHOOK_PATH, router,
  webhook::{
    MESSAGE_ID, MESSAGE_SIGNATURE, MESSAGE_TIMESTAMP, MESSAGE_TYPE, WebhookConfig,
    verify_freshness, verify_signature,
  },
};

const SECRET: &str = "s3cret-s3cret";

// ─── Fake engine ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeLive {
  pushes: Mutex<Vec<PushNotification>>,
  states: Vec<SubjectState>,
}

impl FakeLive {
  fn pushes(&self) -> Vec<PushNotification> { self.pushes.lock().unwrap().clone() }
}

impl LiveService for FakeLive {
  fn push(&self, push: PushNotification) { self.pushes.lock().unwrap().push(push); }

  async fn snapshots(&self) -> Vec<SubjectState> { self.states.clone() }

  async fn snapshot(&self, id: &SubjectId) -> Option<SubjectState> {
    self.states.iter().find(|s| s.id() == id).cloned()
  }
}

fn state(live: Arc<FakeLive>) -> AppState<FakeLive> {
  AppState { live, webhook: Arc::new(WebhookConfig { secret: SECRET.into() }) }
}

fn alice() -> SubjectState {
  SubjectState::offline(Subject {
    id:           "42".into(),
    login:        "alice".into(),
    display_name: "Alice".into(),
  })
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn sign(id: &str, timestamp: &str, body: &str) -> String {
  let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
  mac.update(id.as_bytes());
  mac.update(timestamp.as_bytes());
  mac.update(body.as_bytes());
  format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn envelope(kind: &str, extra: serde_json::Value) -> String {
  let mut body = json!({
    "subscription": {
      "id": "sub-1",
      "type": kind,
      "status": "enabled",
      "condition": { "broadcaster_user_id": "42" },
    },
  });
  if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
    obj.extend(extra.clone());
  }
  body.to_string()
}

fn webhook_request(message_type: &str, body: &str, signature: Option<String>) -> Request<Body> {
  let timestamp = Utc::now().to_rfc3339();
  let signature = signature.unwrap_or_else(|| sign("msg-1", &timestamp, body));
  Request::builder()
    .method("POST")
    .uri(WEBHOOK_PATH)
    .header(MESSAGE_ID, "msg-1")
    .header(MESSAGE_TIMESTAMP, timestamp)
    .header(MESSAGE_SIGNATURE, signature)
    .header(MESSAGE_TYPE, message_type)
    .header("content-type", "application/json")
    .body(Body::from(body.to_owned()))
    .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  String::from_utf8(bytes.to_vec()).unwrap()
}

// ─── Verification ────────────────────────────────────────────────────────────

#[test]
fn signature_round_trip() {
  let sig = sign("id", "ts", "{}");
  assert!(verify_signature(SECRET, "id", "ts", b"{}", &sig).is_ok());
  assert!(verify_signature(SECRET, "id", "ts", b"{ }", &sig).is_err());
  assert!(verify_signature("other-secret", "id", "ts", b"{}", &sig).is_err());
  assert!(verify_signature(SECRET, "id", "ts", b"{}", "md5=abc").is_err());
}

#[test]
fn stale_timestamps_are_rejected() {
  let now = Utc::now();
  let fresh = (now - TimeDelta::minutes(2)).to_rfc3339();
  let stale = (now - TimeDelta::minutes(11)).to_rfc3339();
  assert!(verify_freshness(&fresh, now).is_ok());
  assert!(verify_freshness(&stale, now).is_err());
  assert!(verify_freshness("yesterday", now).is_err());
}

// ─── Webhook ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn callback_verification_echoes_challenge() {
  let live = Arc::new(FakeLive::default());
  let body = envelope("stream.online", json!({ "challenge": "pogchamp-kappa" }));
  let resp = router(state(live.clone()))
    .oneshot(webhook_request("webhook_callback_verification", &body, None))
    .await
    .unwrap();

  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()["content-type"], "text/plain");
  assert_eq!(body_string(resp).await, "pogchamp-kappa");
  assert!(live.pushes().is_empty());
}

#[tokio::test]
async fn notification_is_pushed() {
  let live = Arc::new(FakeLive::default());
  let body = envelope("stream.offline", json!({ "event": { "broadcaster_user_id": "42" } }));
  let resp = router(state(live.clone()))
    .oneshot(webhook_request("notification", &body, None))
    .await
    .unwrap();

  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  assert_eq!(live.pushes(), vec![PushNotification {
    subject_id: "42".into(),
    kind:       NotificationKind::WentOffline,
  }]);
}

#[tokio::test]
async fn unknown_notification_type_is_acknowledged() {
  let live = Arc::new(FakeLive::default());
  let body = envelope("channel.follow", json!({}));
  let resp = router(state(live.clone()))
    .oneshot(webhook_request("notification", &body, None))
    .await
    .unwrap();

  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  assert!(live.pushes().is_empty());
}

#[tokio::test]
async fn revocation_is_acknowledged() {
  let live = Arc::new(FakeLive::default());
  let body = envelope("stream.online", json!({}));
  let resp = router(state(live.clone()))
    .oneshot(webhook_request("revocation", &body, None))
    .await
    .unwrap();

  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  assert!(live.pushes().is_empty());
}

#[tokio::test]
async fn bad_signature_is_forbidden() {
  let live = Arc::new(FakeLive::default());
  let body = envelope("stream.online", json!({}));
  let forged = sign("msg-1", "2020-01-01T00:00:00Z", &body);
  let resp = router(state(live.clone()))
    .oneshot(webhook_request("notification", &body, Some(forged)))
    .await
    .unwrap();

  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert!(body_string(resp).await.contains("signature mismatch"));
  assert!(live.pushes().is_empty());
}

#[tokio::test]
async fn missing_headers_are_forbidden() {
  let live = Arc::new(FakeLive::default());
  let req = Request::builder()
    .method("POST")
    .uri(WEBHOOK_PATH)
    .body(Body::from("{}"))
    .unwrap();
  let resp = router(state(live)).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unparseable_body_is_bad_request() {
  let live = Arc::new(FakeLive::default());
  let resp = router(state(live))
    .oneshot(webhook_request("notification", "not json", None))
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_lists_snapshots() {
  let live = Arc::new(FakeLive { states: vec![alice()], ..FakeLive::default() });
  let req = Request::builder().uri("/live").body(Body::empty()).unwrap();
  let resp = router(state(live)).oneshot(req).await.unwrap();

  assert_eq!(resp.status(), StatusCode::OK);
  let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
  assert_eq!(json[0]["subject"]["login"], "alice");
  assert!(json[0]["live"].is_null());
}

#[tokio::test]
async fn unknown_subject_is_not_found() {
  let live = Arc::new(FakeLive { states: vec![alice()], ..FakeLive::default() });
  let found = Request::builder().uri("/live/42").body(Body::empty()).unwrap();
  let missing = Request::builder().uri("/live/7").body(Body::empty()).unwrap();

  let app = router(state(live));
  assert_eq!(app.clone().oneshot(found).await.unwrap().status(), StatusCode::OK);
  assert_eq!(app.oneshot(missing).await.unwrap().status(), StatusCode::NOT_FOUND);
}
