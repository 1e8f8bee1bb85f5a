use super::{ResourceDriver, RetirePolicy};
use crate::{
  binding::ResourceKind,
  destination::Destination,
  error::BoxError,
  render::{Render, message_content},
  resource::{MessageApi, Presence},
};

/// Messages are never deleted: going offline edits them one last time into
/// their offline rendering and forgets them.
pub(crate) struct MessageDriver<M>(pub(crate) M);

impl<M: MessageApi> ResourceDriver for MessageDriver<M> {
  const KIND: ResourceKind = ResourceKind::Message;
  const RETIRE: RetirePolicy = RetirePolicy::ClearAlways;

  async fn check(&self, dest: &Destination, id: &str) -> Result<Presence, BoxError> {
    self
      .0
      .check_message(&dest.message.channel_id, id)
      .await
      .map_err(BoxError::from)
  }

  async fn create(&self, ctx: &Render<'_>) -> Result<String, BoxError> {
    let content = message_content(ctx);
    self
      .0
      .create_message(&ctx.dest.message.channel_id, &content)
      .await
      .map_err(BoxError::from)
  }

  async fn edit(&self, ctx: &Render<'_>, id: &str) -> Result<String, BoxError> {
    let content = message_content(ctx);
    self
      .0
      .edit_message(&ctx.dest.message.channel_id, id, &content)
      .await
      .map_err(BoxError::from)
  }

  async fn retire(&self, ctx: &Render<'_>, id: &str) -> Result<(), BoxError> {
    self.edit(ctx, id).await.map(drop)
  }
}
