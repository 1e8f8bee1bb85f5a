use super::{ResourceDriver, RetirePolicy};
use crate::{
  binding::ResourceKind,
  destination::Destination,
  error::BoxError,
  render::{Render, event_content},
  resource::{EventApi, Presence},
};

/// Scheduled events are deleted when the subject goes offline. A failed
/// delete keeps the binding, so the next keep-alive tick tries again.
pub(crate) struct EventDriver<E>(pub(crate) E);

impl<E: EventApi> ResourceDriver for EventDriver<E> {
  const KIND: ResourceKind = ResourceKind::Event;
  const RETIRE: RetirePolicy = RetirePolicy::ClearOnSuccess;

  async fn check(&self, dest: &Destination, id: &str) -> Result<Presence, BoxError> {
    self
      .0
      .check_event(&dest.group_id, id)
      .await
      .map_err(BoxError::from)
  }

  async fn create(&self, ctx: &Render<'_>) -> Result<String, BoxError> {
    let content = event_content(ctx, true);
    self
      .0
      .create_event(&ctx.dest.group_id, &content)
      .await
      .map_err(BoxError::from)
  }

  async fn edit(&self, ctx: &Render<'_>, id: &str) -> Result<String, BoxError> {
    let content = event_content(ctx, false);
    self
      .0
      .edit_event(&ctx.dest.group_id, id, &content)
      .await
      .map_err(BoxError::from)
  }

  async fn retire(&self, ctx: &Render<'_>, id: &str) -> Result<(), BoxError> {
    self
      .0
      .delete_event(&ctx.dest.group_id, id)
      .await
      .map_err(BoxError::from)
  }
}
