//! Fixed-delay, fixed-attempt retries.

use std::{fmt::Display, future::Future, time::Duration};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total tries, the first one included. Zero behaves like one.
  pub attempts: u32,
  #[serde(with = "millis", rename = "delay_ms")]
  pub delay:    Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { attempts: 5, delay: Duration::from_secs(2) }
  }
}

impl RetryPolicy {
  pub fn new(attempts: u32, delay: Duration) -> Self { Self { attempts, delay } }

  /// A policy that tries once.
  pub fn none() -> Self { Self::new(1, Duration::ZERO) }

  /// Run `op` until it succeeds or attempts run out.
  pub async fn run<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, E>
  where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    self.run_when(what, op, |_| true).await
  }

  /// Like [`run`](Self::run), but stop at the first error `is_transient`
  /// rejects.
  pub async fn run_when<T, E, F, Fut>(
    &self,
    what: &str,
    mut op: F,
    is_transient: impl Fn(&E) -> bool,
  ) -> Result<T, E>
  where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let attempts = self.attempts.max(1);
    let mut attempt = 1;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(e) if attempt < attempts && is_transient(&e) => {
          warn!(what, attempt, attempts, error = %e, "attempt failed, retrying");
          tokio::time::sleep(self.delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

mod millis {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
  }
}
