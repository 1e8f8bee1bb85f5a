//! Subjects (the upstream broadcasters being watched) and their in-memory
//! state.
//!
//! A [`SubjectState`] is the only mutable thing the engine owns. It is never
//! handed out by reference outside the state store's lock; readers get a
//! clone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stream `type` value the platform reports for a running broadcast.
pub const LIVE_KIND: &str = "live";

// ─── Identity ────────────────────────────────────────────────────────────────

/// Stable upstream identifier of a subject (the broadcaster user id).
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SubjectId {
  fn from(id: &str) -> Self { Self(id.to_owned()) }
}

impl From<String> for SubjectId {
  fn from(id: String) -> Self { Self(id) }
}

/// A watched broadcaster. Immutable once resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:           SubjectId,
  /// URL-safe login name.
  pub login:        String,
  pub display_name: String,
}

impl Subject {
  /// Public channel page, used for embed links, buttons and event locations.
  pub fn channel_url(&self) -> String {
    format!("https://twitch.tv/{}", self.login)
  }
}

// ─── Observations ────────────────────────────────────────────────────────────

/// One stream entry as reported by the status source.
///
/// Absence of an entry for a subject means the subject is offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamStatus {
  /// Stream type discriminant; only [`LIVE_KIND`] counts as live.
  pub kind:          String,
  pub title:         String,
  pub game_id:       String,
  pub game_name:     String,
  pub viewer_count:  u64,
  pub started_at:    DateTime<Utc>,
  /// Preview template containing `{width}` and `{height}` placeholders.
  pub thumbnail_url: String,
}

impl StreamStatus {
  pub fn is_live(&self) -> bool { self.kind == LIVE_KIND }
}

// ─── State ───────────────────────────────────────────────────────────────────

/// Stream metadata attached to a subject while (and only while) it is live.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveDetails {
  pub game_name:          String,
  pub title:              String,
  pub viewer_count:       u64,
  pub started_at:         DateTime<Utc>,
  /// Full-resolution preview URL (placeholders substituted).
  pub preview_url:        String,
  /// The preview image inlined as a `data:` URL.
  #[serde(skip)]
  pub preview_image:      String,
  pub game_thumbnail_url: Option<String>,
}

/// Authoritative per-subject state.
///
/// `live` is `None` whenever the subject is offline, so stale metadata can
/// never survive a transition to offline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectState {
  pub subject: Subject,
  pub live:    Option<LiveDetails>,
}

impl SubjectState {
  pub fn offline(subject: Subject) -> Self { Self { subject, live: None } }

  pub fn is_live(&self) -> bool { self.live.is_some() }

  pub fn id(&self) -> &SubjectId { &self.subject.id }
}
