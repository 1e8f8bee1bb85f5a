//! HTTP surface and platform clients for livestatus.
//!
//! Exposes an axum [`Router`] that receives EventSub webhooks and serves the
//! current live status, plus the Twitch and Discord REST clients that back
//! the core engine's collaborator traits.

pub mod config;
pub mod discord;
pub mod error;
pub mod i18n;
pub mod images;
pub mod scheduler;
pub mod status;
pub mod twitch;
pub mod webhook;

pub use error::{ClientError, Error};

use std::{future::Future, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use livestatus_core::{
  dispatch::{Dispatcher, PushNotification},
  source::{ImageFetcher, StatusSource},
  state::NotificationSink,
  subject::{SubjectId, SubjectState},
};
use tower_http::trace::TraceLayer;

use webhook::WebhookConfig;

pub const WEBHOOK_PATH: &str = "/eventsub";

// ─── Live service ────────────────────────────────────────────────────────────

/// What the router needs from the engine.
pub trait LiveService: Send + Sync {
  /// Hand off a verified push; processing happens in the background.
  fn push(&self, push: PushNotification);

  fn snapshots(&self) -> impl Future<Output = Vec<SubjectState>> + Send;

  fn snapshot(&self, id: &SubjectId) -> impl Future<Output = Option<SubjectState>> + Send;
}

impl<S, I, N> LiveService for Dispatcher<S, I, N>
where
  S: StatusSource + 'static,
  I: ImageFetcher + 'static,
  N: NotificationSink + 'static,
{
  fn push(&self, push: PushNotification) {
    // The task logs its own outcome.
    drop(self.handle_push(push));
  }

  async fn snapshots(&self) -> Vec<SubjectState> { self.states().snapshots().await }

  async fn snapshot(&self, id: &SubjectId) -> Option<SubjectState> {
    self.states().snapshot(id).await
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<L> {
  pub live:    Arc<L>,
  pub webhook: Arc<WebhookConfig>,
}

impl<L> Clone for AppState<L> {
  fn clone(&self) -> Self {
    Self { live: self.live.clone(), webhook: self.webhook.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router<L>(state: AppState<L>) -> Router
where
  L: LiveService + 'static,
{
  Router::new()
    .route(WEBHOOK_PATH, post(webhook::receive::<L>))
    .route("/live", get(status::list::<L>))
    .route("/live/{subject_id}", get(status::get_one::<L>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
