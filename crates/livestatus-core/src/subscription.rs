//! Push subscription management.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info};

use crate::{
  error::{Error, Result},
  subject::SubjectId,
};

/// Change notifications the streaming platform can push.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
pub enum NotificationKind {
  /// Title or category changed.
  #[serde(rename = "channel.update")]
  #[strum(serialize = "channel.update")]
  ProfileChanged,
  #[serde(rename = "stream.online")]
  #[strum(serialize = "stream.online")]
  WentLive,
  #[serde(rename = "stream.offline")]
  #[strum(serialize = "stream.offline")]
  WentOffline,
}

impl NotificationKind {
  pub const ALL: [NotificationKind; 3] = [
    NotificationKind::ProfileChanged,
    NotificationKind::WentLive,
    NotificationKind::WentOffline,
  ];
}

/// An existing subscription as listed by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
  pub id:   String,
  /// Raw event type; may be one this crate does not model.
  pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
  pub kind:       NotificationKind,
  pub subject_id: SubjectId,
}

/// Subscription budget as reported after a create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cost {
  pub used:  u64,
  pub limit: u64,
}

pub trait SubscriptionTransport: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list(&self) -> impl Future<Output = Result<Vec<Subscription>, Self::Error>> + Send;

  fn delete(&self, id: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

  fn create(
    &self,
    request: &SubscriptionRequest,
  ) -> impl Future<Output = Result<Cost, Self::Error>> + Send;
}

/// Replaces every push subscription with a fresh set at startup.
pub struct SubscriptionManager<T> {
  transport: T,
  kinds:     Vec<NotificationKind>,
}

impl<T: SubscriptionTransport> SubscriptionManager<T> {
  /// Subscribe to every [`NotificationKind`].
  pub fn new(transport: T) -> Self { Self::with_kinds(transport, NotificationKind::ALL.to_vec()) }

  pub fn with_kinds(transport: T, kinds: Vec<NotificationKind>) -> Self {
    Self { transport, kinds }
  }

  /// Delete all subscriptions, then create one per (subject, kind).
  ///
  /// Any failure aborts the resync, so later creates never run. Returns the
  /// cost reported by the last create.
  pub async fn resync_all(&self, subject_ids: &[SubjectId]) -> Result<Cost> {
    if subject_ids.is_empty() {
      return Err(Error::NoSubjects);
    }

    let existing = self.transport.list().await.map_err(subscription_error)?;
    for sub in &existing {
      self.transport.delete(&sub.id).await.map_err(subscription_error)?;
      debug!(id = %sub.id, kind = %sub.kind, "unsubscribed");
    }

    let mut cost = Cost::default();
    for subject_id in subject_ids {
      for &kind in &self.kinds {
        let request = SubscriptionRequest { kind, subject_id: subject_id.clone() };
        cost = self
          .transport
          .create(&request)
          .await
          .map_err(subscription_error)?;
      }
    }

    info!(
      removed = existing.len(),
      subjects = subject_ids.len(),
      used = cost.used,
      limit = cost.limit,
      "subscriptions resynced"
    );
    Ok(cost)
  }
}

fn subscription_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Subscription(Box::new(e))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_use_platform_names() {
    assert_eq!(NotificationKind::WentLive.to_string(), "stream.online");
    assert_eq!(
      "channel.update".parse::<NotificationKind>().unwrap(),
      NotificationKind::ProfileChanged
    );
    assert_eq!(
      serde_json::to_string(&NotificationKind::WentOffline).unwrap(),
      "\"stream.offline\""
    );
  }
}
