//! Error types for `livestatus-core`.

use strum::Display;
use thiserror::Error;

use crate::{binding::ResourceKind, subject::SubjectId};

/// Collaborator errors are boxed at the engine boundary; every trait in this
/// crate carries its own associated error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The downstream call a reconciliation step attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
  Create,
  Edit,
  Retire,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown subject: {0}")]
  UnknownSubject(SubjectId),

  #[error("status source error: {0}")]
  Status(#[source] BoxError),

  #[error("failed to fetch stream preview {url}: {source}")]
  Preview {
    url:    String,
    #[source]
    source: BoxError,
  },

  #[error("{kind} {action} failed for subject {subject} in group {group}: {source}")]
  Resource {
    kind:    ResourceKind,
    action:  Action,
    subject: SubjectId,
    group:   String,
    #[source]
    source:  BoxError,
  },

  #[error("registry error: {0}")]
  Registry(#[source] BoxError),

  #[error("subscription error: {0}")]
  Subscription(#[source] BoxError),

  #[error("no subjects to subscribe to")]
  NoSubjects,

  #[error("{}", join_messages(.0))]
  Joined(Vec<Error>),
}

impl Error {
  /// Fold independently collected errors into a single result.
  ///
  /// No errors is success; a single error is returned as-is.
  pub fn join(mut errors: Vec<Error>) -> Result<()> {
    match errors.len() {
      0 => Ok(()),
      1 => Err(errors.remove(0)),
      _ => Err(Error::Joined(errors)),
    }
  }

  /// Number of leaf errors, looking through [`Error::Joined`].
  pub fn count(&self) -> usize {
    match self {
      Error::Joined(errors) => errors.iter().map(Error::count).sum(),
      _ => 1,
    }
  }
}

fn join_messages(errors: &[Error]) -> String {
  errors
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
