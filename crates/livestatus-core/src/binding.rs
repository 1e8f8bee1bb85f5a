//! The `BindingStore` trait: the persisted resource registry.
//!
//! A binding records which external resource currently represents a subject
//! at a destination. The trait is implemented by storage backends (e.g.
//! `livestatus-store-sqlite`); the reconciler depends on this abstraction, not
//! on any concrete backend.

use std::{
  collections::BTreeMap,
  convert::Infallible,
  future::Future,
  sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::subject::SubjectId;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The two kinds of downstream artifact kept in sync with subject state.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
  /// A chat message in a channel.
  Message,
  /// A scheduled event in a group.
  Event,
}

/// Registry key: one binding per (kind, subject, group, target).
///
/// `target_id` is the channel for messages and empty for events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingKey {
  pub kind:       ResourceKind,
  pub subject_id: SubjectId,
  pub group_id:   String,
  pub target_id:  String,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable mapping from [`BindingKey`] to an external resource identifier.
///
/// A missing key and an empty identifier are equivalent: both mean "no
/// active resource". Implementations never enforce uniqueness themselves;
/// the reconciler's per-subject lock does.
pub trait BindingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Current resource identifier for `key`, or `None` when absent/empty.
  fn get(
    &self,
    key: &BindingKey,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

  /// Overwrite the binding. `None` persists the empty identifier.
  fn set(
    &self,
    key: &BindingKey,
    resource_id: Option<&str>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// An ordered, process-local [`BindingStore`].
///
/// Cloning is cheap and clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBindings {
  entries: Arc<Mutex<BTreeMap<BindingKey, String>>>,
}

impl MemoryBindings {
  pub fn new() -> Self { Self::default() }

  /// Raw stored value, distinguishing "never written" (`None`) from the
  /// persisted empty identifier (`Some("")`).
  pub fn raw(&self, key: &BindingKey) -> Option<String> {
    self.lock().get(key).cloned()
  }

  /// Number of stored keys, empty values included.
  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.lock().is_empty() }

  fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<BindingKey, String>> {
    // A poisoned map still holds consistent strings.
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl BindingStore for MemoryBindings {
  type Error = Infallible;

  async fn get(&self, key: &BindingKey) -> Result<Option<String>, Infallible> {
    Ok(self.lock().get(key).filter(|id| !id.is_empty()).cloned())
  }

  async fn set(
    &self,
    key: &BindingKey,
    resource_id: Option<&str>,
  ) -> Result<(), Infallible> {
    self
      .lock()
      .insert(key.clone(), resource_id.unwrap_or_default().to_owned());
    Ok(())
  }
}
