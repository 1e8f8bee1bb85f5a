//! EventSub webhook receiver.
//!
//! Every request is authenticated with the shared secret before its body is
//! even parsed. Notifications are handed to the [`LiveService`] and
//! acknowledged immediately; the actual work happens on a background task.

use axum::{
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use livestatus_core::{
  dispatch::PushNotification, subject::SubjectId, subscription::NotificationKind,
};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::{AppState, LiveService, error::Error};

type HmacSha256 = Hmac<Sha256>;

pub const MESSAGE_ID: &str = "twitch-eventsub-message-id";
pub const MESSAGE_TIMESTAMP: &str = "twitch-eventsub-message-timestamp";
pub const MESSAGE_SIGNATURE: &str = "twitch-eventsub-message-signature";
pub const MESSAGE_TYPE: &str = "twitch-eventsub-message-type";

/// Older (or further in the future) messages are treated as replays.
const MAX_MESSAGE_AGE: TimeDelta = TimeDelta::minutes(10);

/// Webhook verification settings.
#[derive(Clone)]
pub struct WebhookConfig {
  pub secret: String,
}

// ─── Verification ────────────────────────────────────────────────────────────

/// Check `signature` (`sha256=<hex>`) against the HMAC of
/// `message_id + timestamp + body`.
pub fn verify_signature(
  secret: &str,
  message_id: &str,
  timestamp: &str,
  body: &[u8],
  signature: &str,
) -> Result<(), Error> {
  let expected = signature
    .strip_prefix("sha256=")
    .and_then(|hex_sig| hex::decode(hex_sig).ok())
    .ok_or(Error::Forbidden("malformed signature"))?;
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|_| Error::Forbidden("unusable secret"))?;
  mac.update(message_id.as_bytes());
  mac.update(timestamp.as_bytes());
  mac.update(body);
  mac
    .verify_slice(&expected)
    .map_err(|_| Error::Forbidden("signature mismatch"))
}

/// Reject messages whose timestamp is too far from `now`.
pub fn verify_freshness(timestamp: &str, now: DateTime<Utc>) -> Result<(), Error> {
  let sent = DateTime::parse_from_rfc3339(timestamp)
    .map_err(|_| Error::Forbidden("malformed timestamp"))?;
  if (now - sent.with_timezone(&Utc)).abs() > MAX_MESSAGE_AGE {
    return Err(Error::Forbidden("stale message"));
  }
  Ok(())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, Error> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Forbidden("missing eventsub header"))
}

/// Authenticate a request from its headers and raw body.
pub fn verify_request(
  headers: &HeaderMap,
  body: &[u8],
  config: &WebhookConfig,
  now: DateTime<Utc>,
) -> Result<(), Error> {
  let timestamp = header_str(headers, MESSAGE_TIMESTAMP)?;
  verify_signature(
    &config.secret,
    header_str(headers, MESSAGE_ID)?,
    timestamp,
    body,
    header_str(headers, MESSAGE_SIGNATURE)?,
  )?;
  verify_freshness(timestamp, now)
}

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
  subscription: SubscriptionInfo,
  challenge:    Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionInfo {
  #[serde(rename = "type")]
  kind:      String,
  #[serde(default)]
  status:    String,
  condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
  broadcaster_user_id: String,
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// `POST /eventsub`
pub async fn receive<L: LiveService>(
  State(state): State<AppState<L>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response, Error> {
  verify_request(&headers, &body, &state.webhook, Utc::now())?;

  let envelope: Envelope =
    serde_json::from_slice(&body).map_err(|e| Error::BadRequest(e.to_string()))?;
  let sub = envelope.subscription;
  let subject = sub.condition.broadcaster_user_id;

  match header_str(&headers, MESSAGE_TYPE)? {
    "webhook_callback_verification" => {
      let challenge = envelope
        .challenge
        .ok_or_else(|| Error::BadRequest("missing challenge".into()))?;
      info!(%subject, kind = %sub.kind, "subscription verified");
      Ok(([(header::CONTENT_TYPE, "text/plain")], challenge).into_response())
    }
    "notification" => {
      match sub.kind.parse::<NotificationKind>() {
        Ok(kind) => {
          debug!(%subject, %kind, "notification received");
          state
            .live
            .push(PushNotification { subject_id: SubjectId::new(subject), kind });
        }
        Err(_) => warn!(%subject, kind = %sub.kind, "unhandled notification type"),
      }
      Ok(StatusCode::NO_CONTENT.into_response())
    }
    "revocation" => {
      warn!(%subject, kind = %sub.kind, reason = %sub.status, "subscription revoked");
      Ok(StatusCode::NO_CONTENT.into_response())
    }
    other => Err(Error::BadRequest(format!("unknown message type {other}"))),
  }
}
