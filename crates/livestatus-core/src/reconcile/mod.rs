//! The resource reconciler.
//!
//! One check-then-act protocol, written once against [`ResourceDriver`] and
//! instantiated per resource kind:
//!
//! 1. read the binding (a failed read counts as absent);
//! 2. check a bound resource (failure, terminal or missing counts as absent);
//! 3. create, edit, retire or skip depending on binding and liveness;
//! 4. persist the outcome.
//!
//! Callers hold the subject lock for the whole sequence.

mod event;
mod message;

use std::{future::Future, sync::Arc};

use chrono::Utc;
use tracing::{debug, info, warn};

pub(crate) use self::{event::EventDriver, message::MessageDriver};
use crate::{
  binding::{BindingKey, BindingStore, ResourceKind},
  destination::Destination,
  error::{Action, BoxError, Error, Result},
  i18n::Localizer,
  render::Render,
  resource::{EventApi, MessageApi, Presence},
  state::{NotificationSink, SyncScope},
  subject::SubjectState,
};

// ─── Driver ──────────────────────────────────────────────────────────────────

/// When a failed retire still clears the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetirePolicy {
  /// Clear regardless of the outcome.
  ClearAlways,
  /// Keep the binding so a later sync retries the retire.
  ClearOnSuccess,
}

/// Kind-specific half of the protocol.
pub(crate) trait ResourceDriver: Send + Sync {
  const KIND: ResourceKind;
  const RETIRE: RetirePolicy;

  fn check(
    &self,
    dest: &Destination,
    id: &str,
  ) -> impl Future<Output = Result<Presence, BoxError>> + Send;

  fn create(
    &self,
    ctx: &Render<'_>,
  ) -> impl Future<Output = Result<String, BoxError>> + Send;

  fn edit(
    &self,
    ctx: &Render<'_>,
    id: &str,
  ) -> impl Future<Output = Result<String, BoxError>> + Send;

  /// Take down the resource of a subject that went offline.
  fn retire(
    &self,
    ctx: &Render<'_>,
    id: &str,
  ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

async fn sync<R, D>(registry: &R, driver: &D, ctx: &Render<'_>) -> Result<()>
where
  R: BindingStore,
  D: ResourceDriver,
{
  let key = ctx.dest.binding_key(D::KIND);
  let subject = ctx.state.id();
  let group = ctx.dest.group_id.as_str();

  let stored = registry.get(&key).await.unwrap_or_else(|e| {
    warn!(%subject, guild = group, kind = %D::KIND, error = %e, "binding read failed, treating as absent");
    None
  });

  let bound = match stored.as_deref() {
    Some(id) => match driver.check(ctx.dest, id).await {
      Ok(Presence::Active) => Some(id.to_owned()),
      Ok(presence) => {
        debug!(%subject, guild = group, kind = %D::KIND, id = %id, ?presence, "bound resource is gone");
        None
      }
      Err(e) => {
        warn!(%subject, guild = group, kind = %D::KIND, id = %id, error = %e, "presence check failed, treating as absent");
        None
      }
    },
    None => None,
  };

  let fail = |action, source| Error::Resource {
    kind: D::KIND,
    action,
    subject: subject.clone(),
    group: group.to_owned(),
    source,
  };

  match (bound, ctx.state.is_live()) {
    // Nothing stored: nothing to write. A stored id the check ruled out is
    // cleared so it cannot outlive the stream.
    (None, false) if stored.is_none() => Ok(()),
    (None, false) => persist(registry, &key, None).await,
    (None, true) => {
      let id = driver.create(ctx).await.map_err(|e| fail(Action::Create, e))?;
      info!(%subject, guild = group, kind = %D::KIND, id = %id, "created");
      persist(registry, &key, Some(&id)).await
    }
    (Some(id), true) => {
      let id = driver.edit(ctx, &id).await.map_err(|e| fail(Action::Edit, e))?;
      debug!(%subject, guild = group, kind = %D::KIND, id = %id, "edited");
      persist(registry, &key, Some(&id)).await
    }
    (Some(id), false) => match driver.retire(ctx, &id).await {
      Ok(()) => {
        info!(%subject, guild = group, kind = %D::KIND, id = %id, "retired");
        persist(registry, &key, None).await
      }
      Err(e) => {
        if D::RETIRE == RetirePolicy::ClearAlways {
          persist(registry, &key, None).await?;
        }
        Err(fail(Action::Retire, e))
      }
    },
  }
}

async fn persist<R: BindingStore>(
  registry: &R,
  key: &BindingKey,
  id: Option<&str>,
) -> Result<()> {
  registry
    .set(key, id)
    .await
    .map_err(|e| Error::Registry(Box::new(e)))
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// Keeps every destination's message and event in line with subject state.
pub struct Reconciler<R, M, E> {
  registry:     R,
  messages:     MessageDriver<M>,
  events:       EventDriver<E>,
  destinations: Vec<Destination>,
  localizer:    Arc<Localizer>,
}

impl<R, M, E> Reconciler<R, M, E>
where
  R: BindingStore,
  M: MessageApi,
  E: EventApi,
{
  pub fn new(
    registry: R,
    message_api: M,
    event_api: E,
    destinations: Vec<Destination>,
    localizer: Arc<Localizer>,
  ) -> Self {
    Self {
      registry,
      messages: MessageDriver(message_api),
      events: EventDriver(event_api),
      destinations,
      localizer,
    }
  }

  /// Sync one destination. A destination for another subject is ignored.
  ///
  /// Message and event are reconciled independently; their errors are
  /// joined.
  pub async fn reconcile(
    &self,
    state: &SubjectState,
    dest: &Destination,
    scope: SyncScope,
  ) -> Result<()> {
    if &dest.subject_id != state.id() {
      return Ok(());
    }
    let ctx = Render {
      state,
      dest,
      messages: self.localizer.messages(&dest.lang),
      now: Utc::now(),
    };

    let mut errors = Vec::new();
    if dest.wants(ResourceKind::Event) {
      if let Err(e) = sync(&self.registry, &self.events, &ctx).await {
        errors.push(e);
      }
    }
    if scope == SyncScope::Full && dest.wants(ResourceKind::Message) {
      if let Err(e) = sync(&self.registry, &self.messages, &ctx).await {
        errors.push(e);
      }
    }
    Error::join(errors)
  }
}

impl<R, M, E> NotificationSink for Reconciler<R, M, E>
where
  R: BindingStore,
  M: MessageApi,
  E: EventApi,
{
  async fn notify(&self, state: &SubjectState, scope: SyncScope) -> Result<()> {
    let mut errors = Vec::new();
    for dest in self.destinations.iter().filter(|d| &d.subject_id == state.id()) {
      if let Err(e) = self.reconcile(state, dest, scope).await {
        warn!(subject = %state.id(), guild = %dest.group_id, error = %e, "destination sync failed");
        errors.push(e);
      }
    }
    Error::join(errors)
  }
}
