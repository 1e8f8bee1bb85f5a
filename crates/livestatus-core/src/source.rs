//! Upstream collaborators: the status source and the image fetcher.

use std::{collections::HashMap, future::Future};

use crate::subject::{StreamStatus, Subject, SubjectId};

/// The streaming platform's view of who is live.
///
/// Implementations never return a partial batch: the result is either
/// complete or an error. Failed status fetches are retried by the dispatcher.
pub trait StatusSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Current stream for each subject in `ids`. Subjects that are offline are
  /// simply missing from the map.
  fn fetch_statuses(
    &self,
    ids: &[SubjectId],
  ) -> impl Future<Output = Result<HashMap<SubjectId, StreamStatus>, Self::Error>>
  + Send;

  /// Profiles for the subjects in `ids`. Unknown ids are missing from the map.
  fn fetch_users(
    &self,
    ids: &[SubjectId],
  ) -> impl Future<Output = Result<HashMap<SubjectId, Subject>, Self::Error>> + Send;
}

/// Plain HTTP image access used while resolving live metadata.
pub trait ImageFetcher: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Download the image at `url`.
  fn fetch(
    &self,
    url: &str,
  ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send;

  /// Whether `url` currently resolves to an image. Failures count as `false`.
  fn exists(&self, url: &str) -> impl Future<Output = bool> + Send;
}
