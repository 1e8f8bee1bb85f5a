//! Discord REST client for channel messages and guild scheduled events.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use livestatus_core::resource::{
  Embed, EventApi, EventContent, LinkButton, MessageApi, MessageContent, Presence,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::{ClientError, ensure_success};

pub const API_URL: &str = "https://discord.com/api/v10";

// Discord enum values.
const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
const LINK_STYLE: u8 = 5;
const GUILD_ONLY: u8 = 2;
const EXTERNAL: u8 = 3;
const STATUS_ACTIVE: u8 = 2;
const STATUS_COMPLETED: u8 = 3;
const STATUS_CANCELED: u8 = 4;

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
  content:          &'a str,
  embeds:           [&'a Embed; 1],
  /// Always sent so an edit drops a button that is no longer wanted.
  components:       Vec<ActionRow<'a>>,
  allowed_mentions: AllowedMentions,
}

#[derive(Debug, Serialize)]
struct ActionRow<'a> {
  #[serde(rename = "type")]
  kind:       u8,
  components: [Button<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Button<'a> {
  #[serde(rename = "type")]
  kind:  u8,
  style: u8,
  url:   &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  label: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  emoji: Option<Emoji<'a>>,
}

#[derive(Debug, Serialize)]
struct Emoji<'a> {
  name: &'a str,
}

#[derive(Debug, Serialize)]
struct AllowedMentions {
  parse: [&'static str; 2],
}

impl<'a> MessageBody<'a> {
  fn new(content: &'a MessageContent) -> Self {
    let components = content
      .button
      .as_ref()
      .map(|b| ActionRow { kind: ACTION_ROW, components: [Button::link(b)] })
      .into_iter()
      .collect();
    Self {
      content: &content.content,
      embeds: [&content.embed],
      components,
      allowed_mentions: AllowedMentions { parse: ["everyone", "roles"] },
    }
  }
}

impl<'a> Button<'a> {
  fn link(button: &'a LinkButton) -> Self {
    Self {
      kind:  BUTTON,
      style: LINK_STYLE,
      url:   &button.url,
      label: button.label.as_deref(),
      emoji: button.emoji.as_deref().map(|name| Emoji { name }),
    }
  }
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  name:                 Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  description:          Option<&'a str>,
  privacy_level:        u8,
  entity_type:          u8,
  entity_metadata:      EntityMetadata<'a>,
  #[serde(skip_serializing_if = "Option::is_none")]
  scheduled_start_time: Option<DateTime<Utc>>,
  scheduled_end_time:   DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  image:                Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  status:               Option<u8>,
}

#[derive(Debug, Serialize)]
struct EntityMetadata<'a> {
  location: &'a str,
}

impl<'a> EventBody<'a> {
  /// A create leaves the status to Discord; an edit keeps the event active.
  fn new(content: &'a EventContent, editing: bool) -> Self {
    Self {
      name:                 content.name.as_deref(),
      description:          content.description.as_deref(),
      privacy_level:        GUILD_ONLY,
      entity_type:          EXTERNAL,
      entity_metadata:      EntityMetadata { location: &content.location },
      scheduled_start_time: content.start_at,
      scheduled_end_time:   content.end_at,
      image:                content.image.as_deref(),
      status:               editing.then_some(STATUS_ACTIVE),
    }
  }
}

#[derive(Debug, Deserialize)]
struct Created {
  id: String,
}

#[derive(Debug, Deserialize)]
struct ScheduledEvent {
  status: u8,
}

fn event_presence(event: &ScheduledEvent) -> Presence {
  match event.status {
    STATUS_COMPLETED | STATUS_CANCELED => Presence::Terminal,
    _ => Presence::Active,
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DiscordClient {
  http:     Client,
  token:    Arc<str>,
  base_url: String,
}

impl DiscordClient {
  pub fn new(token: &str) -> Result<Self, ClientError> {
    Self::with_base_url(token, API_URL)
  }

  pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ClientError> {
    let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      http,
      token: Arc::from(token),
      base_url: base_url.trim_end_matches('/').to_owned(),
    })
  }

  fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
    self
      .http
      .request(method, format!("{}{path}", self.base_url))
      .header("Authorization", format!("Bot {}", self.token))
  }

  async fn send(&self, path: &str, req: RequestBuilder) -> Result<reqwest::Response, ClientError> {
    ensure_success(path, req.send().await?).await
  }

  /// GET `path`; a 404 is `None`.
  async fn fetch<T: DeserializeOwned>(
    &self,
    path: &str,
  ) -> Result<Option<T>, ClientError> {
    let resp = self.request(reqwest::Method::GET, path).send().await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    Ok(Some(ensure_success(path, resp).await?.json().await?))
  }

  async fn write<B: Serialize>(
    &self,
    method: reqwest::Method,
    path: &str,
    body: &B,
  ) -> Result<String, ClientError> {
    let resp = self.send(path, self.request(method, path).json(body)).await?;
    let created: Created = resp.json().await?;
    Ok(created.id)
  }
}

impl MessageApi for DiscordClient {
  type Error = ClientError;

  async fn check_message(&self, channel_id: &str, message_id: &str) -> Result<Presence, ClientError> {
    let path = format!("/channels/{channel_id}/messages/{message_id}");
    let found: Option<serde_json::Value> = self.fetch(&path).await?;
    Ok(found.map_or(Presence::Missing, |_| Presence::Active))
  }

  async fn create_message(
    &self,
    channel_id: &str,
    content: &MessageContent,
  ) -> Result<String, ClientError> {
    let path = format!("/channels/{channel_id}/messages");
    let id = self
      .write(reqwest::Method::POST, &path, &MessageBody::new(content))
      .await?;
    debug!(channel = channel_id, message = %id, "message posted");
    Ok(id)
  }

  async fn edit_message(
    &self,
    channel_id: &str,
    message_id: &str,
    content: &MessageContent,
  ) -> Result<String, ClientError> {
    let path = format!("/channels/{channel_id}/messages/{message_id}");
    self
      .write(reqwest::Method::PATCH, &path, &MessageBody::new(content))
      .await
  }
}

impl EventApi for DiscordClient {
  type Error = ClientError;

  async fn check_event(&self, group_id: &str, event_id: &str) -> Result<Presence, ClientError> {
    let path = format!("/guilds/{group_id}/scheduled-events/{event_id}");
    let found: Option<ScheduledEvent> = self.fetch(&path).await?;
    Ok(found.as_ref().map_or(Presence::Missing, event_presence))
  }

  async fn create_event(&self, group_id: &str, content: &EventContent) -> Result<String, ClientError> {
    let path = format!("/guilds/{group_id}/scheduled-events");
    let id = self
      .write(reqwest::Method::POST, &path, &EventBody::new(content, false))
      .await?;
    debug!(guild = group_id, event = %id, "scheduled event created");
    Ok(id)
  }

  async fn edit_event(
    &self,
    group_id: &str,
    event_id: &str,
    content: &EventContent,
  ) -> Result<String, ClientError> {
    let path = format!("/guilds/{group_id}/scheduled-events/{event_id}");
    self
      .write(reqwest::Method::PATCH, &path, &EventBody::new(content, true))
      .await
  }

  async fn delete_event(&self, group_id: &str, event_id: &str) -> Result<(), ClientError> {
    let path = format!("/guilds/{group_id}/scheduled-events/{event_id}");
    self.send(&path, self.request(reqwest::Method::DELETE, &path)).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
  };
  use chrono::TimeZone as _;
  use livestatus_core::resource::EmbedFooter;
  use serde_json::json;
  use tokio::net::TcpListener;

  use super::*;

  fn embed() -> Embed {
    Embed {
      title:       Some("Speedrun".into()),
      description: None,
      url:         "https://twitch.tv/alice".into(),
      color:       10_181_046,
      image:       None,
      thumbnail:   None,
      fields:      Vec::new(),
      footer:      Some(EmbedFooter { text: "alice on Twitch".into(), icon_url: "icon".into() }),
    }
  }

  fn event() -> EventContent {
    EventContent {
      name:        Some("alice is live".into()),
      description: None,
      location:    "https://twitch.tv/alice".into(),
      image:       Some("data:image/jpeg;base64,AA==".into()),
      start_at:    Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 10).unwrap()),
      end_at:      Utc.with_ymd_and_hms(2024, 1, 1, 12, 2, 0).unwrap(),
    }
  }

  #[test]
  fn message_body_carries_link_button() {
    let content = MessageContent {
      content: "@everyone".into(),
      embed:   embed(),
      button:  Some(LinkButton {
        label: Some("Watch".into()),
        emoji: None,
        url:   "https://twitch.tv/alice".into(),
      }),
    };
    let body = serde_json::to_value(MessageBody::new(&content)).unwrap();

    assert_eq!(body["content"], "@everyone");
    assert_eq!(body["embeds"][0]["title"], "Speedrun");
    assert!(body["embeds"][0].get("description").is_none());
    assert_eq!(body["embeds"][0]["footer"]["text"], "alice on Twitch");
    let button = &body["components"][0]["components"][0];
    assert_eq!(body["components"][0]["type"], 1);
    assert_eq!(button["type"], 2);
    assert_eq!(button["style"], 5);
    assert_eq!(button["label"], "Watch");
    assert!(button.get("emoji").is_none());
  }

  #[test]
  fn message_without_button_clears_components() {
    let content = MessageContent { content: String::new(), embed: embed(), button: None };
    let body = serde_json::to_value(MessageBody::new(&content)).unwrap();
    assert_eq!(body["components"], json!([]));
  }

  #[test]
  fn event_create_and_edit_payloads() {
    let content = event();
    let create = serde_json::to_value(EventBody::new(&content, false)).unwrap();
    assert_eq!(create["privacy_level"], 2);
    assert_eq!(create["entity_type"], 3);
    assert_eq!(create["entity_metadata"]["location"], "https://twitch.tv/alice");
    assert_eq!(create["scheduled_start_time"], "2024-01-01T12:00:10Z");
    assert!(create.get("status").is_none());

    let edit_content = EventContent { start_at: None, ..event() };
    let edit = serde_json::to_value(EventBody::new(&edit_content, true)).unwrap();
    assert_eq!(edit["status"], 2);
    assert!(edit.get("scheduled_start_time").is_none());
  }

  async fn scheduled_event(
    headers: HeaderMap,
    Path((_, id)): Path<(String, String)>,
  ) -> axum::response::Response {
    assert_eq!(
      headers.get("authorization").and_then(|v| v.to_str().ok()),
      Some("Bot token")
    );
    match id.as_str() {
      "active" => Json(json!({ "id": id, "status": 2 })).into_response(),
      "ended" => Json(json!({ "id": id, "status": 3 })).into_response(),
      _ => StatusCode::NOT_FOUND.into_response(),
    }
  }

  #[tokio::test]
  async fn event_presence_maps_status() {
    let app = Router::new()
      .route("/guilds/{guild}/scheduled-events/{id}", get(scheduled_event));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let client = DiscordClient::with_base_url("token", &format!("http://{addr}")).unwrap();
    assert_eq!(client.check_event("g", "active").await.unwrap(), Presence::Active);
    assert_eq!(client.check_event("g", "ended").await.unwrap(), Presence::Terminal);
    assert_eq!(client.check_event("g", "gone").await.unwrap(), Presence::Missing);
  }
}
