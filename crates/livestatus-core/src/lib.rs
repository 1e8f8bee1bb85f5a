//! Core types, collaborator traits and the reconciliation engine for
//! livestatus.
//!
//! This crate has no HTTP or database dependencies. The
//! streaming platform, the chat platform and the binding registry are all
//! reached through the traits defined here; concrete implementations live in
//! `livestatus-store-sqlite` and `livestatus-server`.

// We intentionally use native `async fn` in trait impls. The trait
// definitions spell out `impl Future + Send` so the engine can be spawned.
#![allow(async_fn_in_trait)]

pub mod binding;
pub mod destination;
pub mod dispatch;
pub mod error;
pub mod i18n;
pub mod reconcile;
pub mod render;
pub mod resource;
pub mod retry;
pub mod source;
pub mod state;
pub mod subject;
pub mod subscription;

pub use error::{BoxError, Error, Result};

#[cfg(test)]
mod test_support;
