//! The subject state store: authoritative in-memory state, the transition
//! function, and side-effect dispatch.
//!
//! Every subject has its own [`tokio::sync::Mutex`]. The lock is held across
//! the transition *and* the downstream sync, so two triggers for the same
//! subject can never interleave their read-check-act-persist sequences.

use std::{collections::HashMap, future::Future};

use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
  error::{Error, Result},
  render::{
    GAME_THUMBNAIL_HEIGHT, GAME_THUMBNAIL_WIDTH, STREAM_IMAGE_HEIGHT,
    STREAM_IMAGE_WIDTH,
  },
  source::ImageFetcher,
  subject::{LiveDetails, StreamStatus, Subject, SubjectId, SubjectState},
};

const BOX_ART_BASE: &str = "https://static-cdn.jtvnw.net/ttv-boxart";

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Which downstream resources a notification should touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
  /// Messages and events.
  Full,
  /// Events only; used to keep running events from expiring.
  EventsOnly,
}

/// Receives the full subject state after every mutation.
///
/// Called with the subject lock held; implementations must not call back
/// into the store for the same subject.
pub trait NotificationSink: Send + Sync {
  fn notify(
    &self,
    state: &SubjectState,
    scope: SyncScope,
  ) -> impl Future<Output = Result<()>> + Send;
}

// ─── Store ───────────────────────────────────────────────────────────────────

pub struct StateStore<I, N> {
  subjects: HashMap<SubjectId, Mutex<SubjectState>>,
  images:   I,
  sink:     N,
}

impl<I: ImageFetcher, N: NotificationSink> StateStore<I, N> {
  /// Build the store with every subject offline. The subject set is fixed
  /// from here on.
  pub fn new(subjects: impl IntoIterator<Item = Subject>, images: I, sink: N) -> Self {
    let subjects = subjects
      .into_iter()
      .map(|s| (s.id.clone(), Mutex::new(SubjectState::offline(s))))
      .collect();
    Self { subjects, images, sink }
  }

  /// Every known subject id, sorted.
  pub fn subject_ids(&self) -> Vec<SubjectId> {
    let mut ids: Vec<_> = self.subjects.keys().cloned().collect();
    ids.sort();
    ids
  }

  pub fn contains(&self, id: &SubjectId) -> bool { self.subjects.contains_key(id) }

  pub fn sink(&self) -> &N { &self.sink }

  /// Apply one observation and sync every destination.
  ///
  /// The sink runs even when liveness did not change, so metadata edits
  /// propagate. A sink failure is returned but the new state is kept.
  pub async fn apply_observation(
    &self,
    id: &SubjectId,
    status: Option<StreamStatus>,
  ) -> Result<()> {
    let mut state = self.lock(id)?.lock().await;
    self.transition(&mut state, status).await?;
    self.sink.notify(&state, SyncScope::Full).await
  }

  /// Poll variant of [`apply_observation`](Self::apply_observation): a
  /// subject that was offline and is still not live is left untouched.
  /// Returns whether the observation was applied.
  pub async fn apply_polled(
    &self,
    id: &SubjectId,
    status: Option<StreamStatus>,
  ) -> Result<bool> {
    let mut state = self.lock(id)?.lock().await;
    let fetched_live = status.as_ref().is_some_and(StreamStatus::is_live);
    if !state.is_live() && !fetched_live {
      debug!(subject = %id, "still offline, skipping");
      return Ok(false);
    }
    self.transition(&mut state, status).await?;
    self.sink.notify(&state, SyncScope::Full).await?;
    Ok(true)
  }

  /// Re-sync the current state without a new observation.
  pub async fn refresh(&self, id: &SubjectId, scope: SyncScope) -> Result<()> {
    let state = self.lock(id)?.lock().await;
    self.sink.notify(&state, scope).await
  }

  pub async fn snapshot(&self, id: &SubjectId) -> Option<SubjectState> {
    let state = self.subjects.get(id)?.lock().await;
    Some(state.clone())
  }

  /// Every subject's state, ordered by id.
  pub async fn snapshots(&self) -> Vec<SubjectState> {
    let mut out = Vec::with_capacity(self.subjects.len());
    for id in self.subject_ids() {
      if let Some(state) = self.snapshot(&id).await {
        out.push(state);
      }
    }
    out
  }

  fn lock(&self, id: &SubjectId) -> Result<&Mutex<SubjectState>> {
    self
      .subjects
      .get(id)
      .ok_or_else(|| Error::UnknownSubject(id.clone()))
  }

  async fn transition(
    &self,
    state: &mut SubjectState,
    status: Option<StreamStatus>,
  ) -> Result<()> {
    let was_live = state.is_live();
    state.live = match status.filter(StreamStatus::is_live) {
      Some(status) => Some(self.resolve(status).await?),
      None => None,
    };
    if was_live != state.is_live() {
      info!(subject = %state.id(), live = state.is_live(), "liveness changed");
    }
    Ok(())
  }

  async fn resolve(&self, status: StreamStatus) -> Result<LiveDetails> {
    let preview_url = status
      .thumbnail_url
      .replace("{width}", &STREAM_IMAGE_WIDTH.to_string())
      .replace("{height}", &STREAM_IMAGE_HEIGHT.to_string());
    let bytes = self.images.fetch(&preview_url).await.map_err(|e| {
      Error::Preview { url: preview_url.clone(), source: Box::new(e) }
    })?;
    let preview_image = format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes));
    let game_thumbnail_url = self.game_thumbnail(&status.game_id).await;

    Ok(LiveDetails {
      game_name: status.game_name,
      title: status.title,
      viewer_count: status.viewer_count,
      started_at: status.started_at,
      preview_url,
      preview_image,
      game_thumbnail_url,
    })
  }

  /// Box art for `game_id`, preferring the IGDB variant when it exists.
  async fn game_thumbnail(&self, game_id: &str) -> Option<String> {
    if game_id.is_empty() {
      return None;
    }
    let size = format!("{GAME_THUMBNAIL_WIDTH}x{GAME_THUMBNAIL_HEIGHT}");
    let igdb = format!("{BOX_ART_BASE}/{game_id}_IGDB-{size}.jpg");
    if self.images.exists(&igdb).await {
      Some(igdb)
    } else {
      Some(format!("{BOX_ART_BASE}/{game_id}-{size}.jpg"))
    }
  }
}
