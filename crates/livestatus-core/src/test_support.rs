//! In-crate fakes for every collaborator trait.

use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex},
};

use chrono::{TimeZone, Utc};
use thiserror::Error;

use crate::{
  destination::{Destination, EventSettings, MessageSettings},
  error::Result,
  i18n::{
    ButtonTemplate, EmbedTemplate, EmbedTemplates, EventTemplates, Localizer,
    Messages,
  },
  resource::{EventApi, EventContent, MessageApi, MessageContent, Presence},
  source::{ImageFetcher, StatusSource},
  state::{NotificationSink, SyncScope},
  subject::{LIVE_KIND, StreamStatus, Subject, SubjectId, SubjectState},
  subscription::{Cost, Subscription, SubscriptionRequest, SubscriptionTransport},
};

#[derive(Debug, Error)]
#[error("fake failure: {0}")]
pub struct FakeError(pub String);

// ─── Builders ────────────────────────────────────────────────────────────────

pub fn subject(id: &str, login: &str) -> Subject {
  Subject {
    id:           id.into(),
    login:        login.into(),
    display_name: login.to_uppercase(),
  }
}

pub fn live_status(title: &str, game: &str) -> StreamStatus {
  StreamStatus {
    kind:          LIVE_KIND.into(),
    title:         title.into(),
    game_id:       "509658".into(),
    game_name:     game.into(),
    viewer_count:  12,
    started_at:    Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    thumbnail_url: "https://previews/live_user-{width}x{height}.jpg".into(),
  }
}

pub fn destination(subject_id: &str, group: &str, channel: &str) -> Destination {
  Destination {
    group_id:   group.into(),
    subject_id: subject_id.into(),
    lang:       "en".into(),
    event:      EventSettings { active: true },
    message:    MessageSettings {
      active:     true,
      buttons:    true,
      channel_id: channel.into(),
      mention:    "everyone".into(),
    },
  }
}

pub fn localizer() -> Arc<Localizer> {
  let en = Messages {
    event: EventTemplates {
      title:       "%streamer% is live".into(),
      description: "%title%".into(),
    },
    embed: EmbedTemplates {
      online:  EmbedTemplate {
        title:       "%title%".into(),
        description: "Playing %game%".into(),
        button:      ButtonTemplate {
          emoji: "📺".into(),
          label: "Watch %streamer%".into(),
        },
        fields:      Vec::new(),
      },
      offline: EmbedTemplate {
        title: "%streamer% is offline".into(),
        ..EmbedTemplate::default()
      },
      footer:  String::new(),
    },
  };
  Arc::new(Localizer::new(HashMap::from([("en".to_owned(), en)])))
}

// ─── Discord ─────────────────────────────────────────────────────────────────

/// A successful downstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  CreateMessage { channel: String, content: MessageContent },
  EditMessage { channel: String, id: String, content: MessageContent },
  CreateEvent { group: String, content: EventContent },
  EditEvent { group: String, id: String, content: EventContent },
  DeleteEvent { group: String, id: String },
}

#[derive(Default)]
struct DiscordState {
  calls:   Vec<Call>,
  next_id: u32,
  present: HashMap<String, Presence>,
  failing: HashSet<&'static str>,
}

/// Records calls; every created resource reads as active until deleted or
/// overridden with [`FakeDiscord::set_presence`].
#[derive(Clone, Default)]
pub struct FakeDiscord {
  inner: Arc<Mutex<DiscordState>>,
}

impl FakeDiscord {
  pub fn calls(&self) -> Vec<Call> { self.inner.lock().unwrap().calls.clone() }

  pub fn clear_calls(&self) { self.inner.lock().unwrap().calls.clear(); }

  pub fn set_presence(&self, id: &str, presence: Presence) {
    self.inner.lock().unwrap().present.insert(id.to_owned(), presence);
  }

  /// Make every call to `op` fail, e.g. `"delete_event"`.
  pub fn fail(&self, op: &'static str) { self.inner.lock().unwrap().failing.insert(op); }

  pub fn heal(&self, op: &'static str) { self.inner.lock().unwrap().failing.remove(op); }

  fn record(&self, op: &'static str, call: Call) -> Result<(), FakeError> {
    let mut state = self.inner.lock().unwrap();
    if state.failing.contains(op) {
      return Err(FakeError(op.to_owned()));
    }
    state.calls.push(call);
    Ok(())
  }

  fn mint(&self, prefix: &str) -> String {
    let mut state = self.inner.lock().unwrap();
    state.next_id += 1;
    let id = format!("{prefix}{}", state.next_id);
    state.present.insert(id.clone(), Presence::Active);
    id
  }

  fn presence(&self, op: &'static str, id: &str) -> Result<Presence, FakeError> {
    let state = self.inner.lock().unwrap();
    if state.failing.contains(op) {
      return Err(FakeError(op.to_owned()));
    }
    Ok(state.present.get(id).copied().unwrap_or(Presence::Missing))
  }
}

impl MessageApi for FakeDiscord {
  type Error = FakeError;

  async fn check_message(&self, _channel_id: &str, message_id: &str) -> Result<Presence, FakeError> {
    self.presence("check_message", message_id)
  }

  async fn create_message(
    &self,
    channel_id: &str,
    content: &MessageContent,
  ) -> Result<String, FakeError> {
    self.record("create_message", Call::CreateMessage {
      channel: channel_id.into(),
      content: content.clone(),
    })?;
    Ok(self.mint("m"))
  }

  async fn edit_message(
    &self,
    channel_id: &str,
    message_id: &str,
    content: &MessageContent,
  ) -> Result<String, FakeError> {
    self.record("edit_message", Call::EditMessage {
      channel: channel_id.into(),
      id:      message_id.into(),
      content: content.clone(),
    })?;
    Ok(message_id.to_owned())
  }
}

impl EventApi for FakeDiscord {
  type Error = FakeError;

  async fn check_event(&self, _group_id: &str, event_id: &str) -> Result<Presence, FakeError> {
    self.presence("check_event", event_id)
  }

  async fn create_event(
    &self,
    group_id: &str,
    content: &EventContent,
  ) -> Result<String, FakeError> {
    self.record("create_event", Call::CreateEvent {
      group:   group_id.into(),
      content: content.clone(),
    })?;
    Ok(self.mint("e"))
  }

  async fn edit_event(
    &self,
    group_id: &str,
    event_id: &str,
    content: &EventContent,
  ) -> Result<String, FakeError> {
    self.record("edit_event", Call::EditEvent {
      group:   group_id.into(),
      id:      event_id.into(),
      content: content.clone(),
    })?;
    Ok(event_id.to_owned())
  }

  async fn delete_event(&self, group_id: &str, event_id: &str) -> Result<(), FakeError> {
    self.record("delete_event", Call::DeleteEvent {
      group: group_id.into(),
      id:    event_id.into(),
    })?;
    self.inner.lock().unwrap().present.remove(event_id);
    Ok(())
  }
}

// ─── Status source ───────────────────────────────────────────────────────────

#[derive(Default)]
struct SourceState {
  statuses:     HashMap<SubjectId, StreamStatus>,
  users:        HashMap<SubjectId, Subject>,
  failures:     u32,
  fetches:      u32,
  user_fetches: u32,
}

/// A scripted upstream.
#[derive(Clone, Default)]
pub struct FakeSource {
  inner: Arc<Mutex<SourceState>>,
}

impl FakeSource {
  pub fn with_users(users: impl IntoIterator<Item = Subject>) -> Self {
    let source = Self::default();
    source.inner.lock().unwrap().users =
      users.into_iter().map(|u| (u.id.clone(), u)).collect();
    source
  }

  pub fn set(&self, id: &str, status: Option<StreamStatus>) {
    let mut state = self.inner.lock().unwrap();
    match status {
      Some(status) => state.statuses.insert(id.into(), status),
      None => state.statuses.remove(&SubjectId::from(id)),
    };
  }

  /// Fail the next `n` fetches, statuses and users alike.
  pub fn fail_next(&self, n: u32) { self.inner.lock().unwrap().failures = n; }

  pub fn fetches(&self) -> u32 { self.inner.lock().unwrap().fetches }

  pub fn user_fetches(&self) -> u32 { self.inner.lock().unwrap().user_fetches }
}

impl StatusSource for FakeSource {
  type Error = FakeError;

  async fn fetch_statuses(
    &self,
    ids: &[SubjectId],
  ) -> Result<HashMap<SubjectId, StreamStatus>, FakeError> {
    let mut state = self.inner.lock().unwrap();
    state.fetches += 1;
    if state.failures > 0 {
      state.failures -= 1;
      return Err(FakeError("fetch_statuses".into()));
    }
    Ok(
      ids
        .iter()
        .filter_map(|id| state.statuses.get(id).map(|s| (id.clone(), s.clone())))
        .collect(),
    )
  }

  async fn fetch_users(
    &self,
    ids: &[SubjectId],
  ) -> Result<HashMap<SubjectId, Subject>, FakeError> {
    let mut state = self.inner.lock().unwrap();
    state.user_fetches += 1;
    if state.failures > 0 {
      state.failures -= 1;
      return Err(FakeError("fetch_users".into()));
    }
    Ok(
      ids
        .iter()
        .filter_map(|id| state.users.get(id).map(|u| (id.clone(), u.clone())))
        .collect(),
    )
  }
}

// ─── Images ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ImageState {
  existing:   HashSet<String>,
  fail_fetch: bool,
}

#[derive(Clone, Default)]
pub struct FakeImages {
  inner: Arc<Mutex<ImageState>>,
}

impl FakeImages {
  pub fn add_existing(&self, url: &str) {
    self.inner.lock().unwrap().existing.insert(url.to_owned());
  }

  pub fn fail_fetch(&self, fail: bool) { self.inner.lock().unwrap().fail_fetch = fail; }
}

impl ImageFetcher for FakeImages {
  type Error = FakeError;

  async fn fetch(&self, url: &str) -> Result<Vec<u8>, FakeError> {
    if self.inner.lock().unwrap().fail_fetch {
      return Err(FakeError(format!("fetch {url}")));
    }
    Ok(b"jpeg".to_vec())
  }

  async fn exists(&self, url: &str) -> bool {
    self.inner.lock().unwrap().existing.contains(url)
  }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Remembers every notification it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
  seen: Arc<Mutex<Vec<(SubjectState, SyncScope)>>>,
}

impl RecordingSink {
  pub fn seen(&self) -> Vec<(SubjectState, SyncScope)> { self.seen.lock().unwrap().clone() }
}

impl NotificationSink for RecordingSink {
  async fn notify(&self, state: &SubjectState, scope: SyncScope) -> Result<()> {
    self.seen.lock().unwrap().push((state.clone(), scope));
    Ok(())
  }
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

#[derive(Default)]
struct TransportState {
  existing: Vec<Subscription>,
  deleted:  Vec<String>,
  created:  Vec<SubscriptionRequest>,
  creates:  usize,
  fail_at:  Option<usize>,
}

#[derive(Clone, Default)]
pub struct FakeTransport {
  inner: Arc<Mutex<TransportState>>,
}

impl FakeTransport {
  pub fn with_existing(ids: &[&str]) -> Self {
    let transport = Self::default();
    transport.inner.lock().unwrap().existing = ids
      .iter()
      .map(|id| Subscription { id: (*id).into(), kind: "stream.online".into() })
      .collect();
    transport
  }

  /// Fail the `n`th create call (1-based) and every one after it.
  pub fn fail_create_at(&self, n: usize) { self.inner.lock().unwrap().fail_at = Some(n); }

  /// Create calls attempted, failed ones included.
  pub fn creates(&self) -> usize { self.inner.lock().unwrap().creates }

  pub fn deleted(&self) -> Vec<String> { self.inner.lock().unwrap().deleted.clone() }

  pub fn created(&self) -> Vec<SubscriptionRequest> {
    self.inner.lock().unwrap().created.clone()
  }
}

impl SubscriptionTransport for FakeTransport {
  type Error = FakeError;

  async fn list(&self) -> Result<Vec<Subscription>, FakeError> {
    Ok(self.inner.lock().unwrap().existing.clone())
  }

  async fn delete(&self, id: &str) -> Result<(), FakeError> {
    let mut state = self.inner.lock().unwrap();
    state.existing.retain(|s| s.id != id);
    state.deleted.push(id.to_owned());
    Ok(())
  }

  /// Each subscription costs one; the limit is fixed.
  async fn create(&self, request: &SubscriptionRequest) -> Result<Cost, FakeError> {
    let mut state = self.inner.lock().unwrap();
    state.creates += 1;
    if state.fail_at.is_some_and(|n| state.creates >= n) {
      return Err(FakeError(format!("create {}", request.subject_id)));
    }
    state.created.push(request.clone());
    Ok(Cost { used: state.created.len() as u64, limit: 10_000 })
  }
}
