//! Triggers: push notifications, the periodic poll and the keep-alive tick.
//!
//! Pushes are untrusted hints. Each one is checked against a fresh fetch
//! before anything is applied.

use std::{collections::HashMap, sync::Arc};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
  error::{Error, Result},
  retry::RetryPolicy,
  source::{ImageFetcher, StatusSource},
  state::{NotificationSink, StateStore, SyncScope},
  subject::{StreamStatus, Subject, SubjectId},
  subscription::NotificationKind,
};

// ─── Push types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
  pub subject_id: SubjectId,
  pub kind:       NotificationKind,
}

/// Why a push was dropped without being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
  /// Went offline, but the source still reports a live stream.
  StillLive,
  /// Went live or changed, but the source reports no stream.
  NotStreaming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
  Applied { live: bool },
  Rejected(Rejection),
  UnknownSubject,
}

/// Check a push against the freshly fetched status.
pub fn verify(
  kind: NotificationKind,
  status: Option<&StreamStatus>,
) -> Result<(), Rejection> {
  match kind {
    NotificationKind::WentOffline if status.is_some_and(StreamStatus::is_live) => {
      Err(Rejection::StillLive)
    }
    NotificationKind::WentLive | NotificationKind::ProfileChanged if status.is_none() => {
      Err(Rejection::NotStreaming)
    }
    _ => Ok(()),
  }
}

// ─── Startup ─────────────────────────────────────────────────────────────────

/// Resolve profiles for the configured subject ids, retrying failed fetches
/// under `retry`. Unknown ids are skipped with a warning; the result keeps
/// the input order.
pub async fn resolve_subjects<S: StatusSource>(
  source: &S,
  ids: &[SubjectId],
  retry: &RetryPolicy,
) -> Result<Vec<Subject>> {
  let mut users = retry
    .run("resolve subjects", move || source.fetch_users(ids))
    .await
    .map_err(|e| Error::Status(Box::new(e)))?;
  let mut subjects = Vec::with_capacity(ids.len());
  for id in ids {
    match users.remove(id) {
      Some(subject) => subjects.push(subject),
      None => warn!(subject = %id, "unknown subject id, skipping"),
    }
  }
  Ok(subjects)
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

struct Inner<S, I, N> {
  source: S,
  states: StateStore<I, N>,
  retry:  RetryPolicy,
}

/// Routes every trigger into the state store. Cheap to clone.
pub struct Dispatcher<S, I, N> {
  inner: Arc<Inner<S, I, N>>,
}

impl<S, I, N> Clone for Dispatcher<S, I, N> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<S, I, N> Dispatcher<S, I, N>
where
  S: StatusSource,
  I: ImageFetcher,
  N: NotificationSink,
{
  pub fn new(source: S, states: StateStore<I, N>, retry: RetryPolicy) -> Self {
    Self { inner: Arc::new(Inner { source, states, retry }) }
  }

  pub fn states(&self) -> &StateStore<I, N> { &self.inner.states }

  /// Fetch every subject once and apply the result. Any failure is fatal.
  pub async fn hydrate(&self) -> Result<()> {
    let ids = self.inner.states.subject_ids();
    let mut statuses = self.fetch(&ids, "hydrate").await?;
    let mut live = 0usize;
    for id in &ids {
      let status = statuses.remove(id);
      live += usize::from(status.as_ref().is_some_and(StreamStatus::is_live));
      self.inner.states.apply_observation(id, status).await?;
    }
    info!(subjects = ids.len(), live, "hydrated");
    Ok(())
  }

  /// One batched fetch; apply to subjects that are live now or were live
  /// before.
  pub async fn tick_poll(&self) -> Result<()> {
    let ids = self.inner.states.subject_ids();
    let mut statuses = self.fetch(&ids, "poll").await?;
    let mut errors = Vec::new();
    let mut applied = 0usize;
    for id in &ids {
      match self.inner.states.apply_polled(id, statuses.remove(id)).await {
        Ok(true) => applied += 1,
        Ok(false) => {}
        Err(e) => {
          warn!(subject = %id, error = %e, "poll apply failed");
          errors.push(e);
        }
      }
    }
    debug!(subjects = ids.len(), applied, "poll done");
    Error::join(errors)
  }

  /// Re-sync events for every subject so running ones do not expire.
  pub async fn tick_keep_alive(&self) -> Result<()> {
    let mut errors = Vec::new();
    for id in self.inner.states.subject_ids() {
      if let Err(e) = self.inner.states.refresh(&id, SyncScope::EventsOnly).await {
        warn!(subject = %id, error = %e, "keep-alive failed");
        errors.push(e);
      }
    }
    Error::join(errors)
  }

  /// Verify a push against a fresh fetch and apply it.
  pub async fn process_push(&self, push: &PushNotification) -> Result<PushOutcome> {
    let id = &push.subject_id;
    if !self.inner.states.contains(id) {
      return Ok(PushOutcome::UnknownSubject);
    }

    let ids = [id.clone()];
    let status = self.fetch(&ids, push.kind.as_ref()).await?.remove(id);
    if let Err(rejection) = verify(push.kind, status.as_ref()) {
      return Ok(PushOutcome::Rejected(rejection));
    }

    let live = status.as_ref().is_some_and(StreamStatus::is_live);
    self.inner.states.apply_observation(id, status).await?;
    Ok(PushOutcome::Applied { live })
  }

  async fn fetch(
    &self,
    ids: &[SubjectId],
    what: &str,
  ) -> Result<HashMap<SubjectId, StreamStatus>> {
    let source = &self.inner.source;
    self
      .inner
      .retry
      .run(what, move || source.fetch_statuses(ids))
      .await
      .map_err(|e| Error::Status(Box::new(e)))
  }
}

impl<S, I, N> Dispatcher<S, I, N>
where
  S: StatusSource + 'static,
  I: ImageFetcher + 'static,
  N: NotificationSink + 'static,
{
  /// Process a push on its own task. Pushes are not ordered relative to
  /// each other; the subject lock is the only serialization.
  pub fn handle_push(&self, push: PushNotification) -> JoinHandle<()> {
    let this = self.clone();
    tokio::spawn(async move {
      let subject = &push.subject_id;
      let kind = push.kind;
      match this.process_push(&push).await {
        Ok(PushOutcome::Applied { live }) => {
          info!(%subject, %kind, live, "push applied");
        }
        Ok(PushOutcome::Rejected(reason)) => {
          warn!(%subject, %kind, ?reason, "push rejected, status mismatch");
        }
        Ok(PushOutcome::UnknownSubject) => {
          warn!(%subject, %kind, "push for unknown subject");
        }
        Err(e) => error!(%subject, %kind, error = %e, "push failed"),
      }
    })
  }
}
