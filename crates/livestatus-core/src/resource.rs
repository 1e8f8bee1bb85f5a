//! Downstream collaborators and the content they receive.
//!
//! Content types serialize to the chat platform's JSON shapes so transports
//! can embed them directly; optional fields are skipped when absent.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

// ─── Presence ────────────────────────────────────────────────────────────────

/// What the platform says about a bound resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
  /// Exists and can still be edited.
  Active,
  /// Exists but has ended (cancelled or completed).
  Terminal,
  /// Deleted, or never existed.
  Missing,
}

// ─── Message content ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
  pub url:    String,
  pub width:  u32,
  pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
  pub name:   String,
  pub value:  String,
  pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
  pub text:     String,
  pub icon_url: String,
}

/// A rich embed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub url:         String,
  pub color:       u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image:       Option<EmbedImage>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub thumbnail:   Option<EmbedImage>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub fields:      Vec<EmbedField>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub footer:      Option<EmbedFooter>,
}

/// A button that opens `url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkButton {
  pub label: Option<String>,
  pub emoji: Option<String>,
  pub url:   String,
}

/// Everything needed to send or edit a notification message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageContent {
  /// Plain text above the embed; carries the mention.
  pub content: String,
  pub embed:   Embed,
  pub button:  Option<LinkButton>,
}

// ─── Event content ───────────────────────────────────────────────────────────

/// An external scheduled event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventContent {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// External location shown on the event (the channel page).
  pub location:    String,
  /// Cover image as a `data:` URL.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image:       Option<String>,
  /// Only set on creation; a running event keeps its start time.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_at:    Option<DateTime<Utc>>,
  /// Expiry horizon, pushed forward on every refresh.
  pub end_at:      DateTime<Utc>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Channel messages on the chat platform.
///
/// Messages are never deleted by the engine; an ended stream leaves its last
/// (offline) rendering in place.
pub trait MessageApi: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn check_message(
    &self,
    channel_id: &str,
    message_id: &str,
  ) -> impl Future<Output = Result<Presence, Self::Error>> + Send;

  /// Post a new message and return its identifier.
  fn create_message(
    &self,
    channel_id: &str,
    content: &MessageContent,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send;

  /// Edit in place and return the (unchanged) identifier.
  fn edit_message(
    &self,
    channel_id: &str,
    message_id: &str,
    content: &MessageContent,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Scheduled events on the chat platform.
pub trait EventApi: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn check_event(
    &self,
    group_id: &str,
    event_id: &str,
  ) -> impl Future<Output = Result<Presence, Self::Error>> + Send;

  fn create_event(
    &self,
    group_id: &str,
    content: &EventContent,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send;

  fn edit_event(
    &self,
    group_id: &str,
    event_id: &str,
    content: &EventContent,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send;

  fn delete_event(
    &self,
    group_id: &str,
    event_id: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
