//! Periodic background jobs.

use std::{future::Future, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error};

/// Run `job` every `period` on its own task. The first run happens one full
/// period after spawning; a failed run is logged and the schedule continues.
pub fn spawn_periodic<F, Fut, E>(name: &'static str, period: Duration, mut job: F) -> JoinHandle<()>
where
  F: FnMut() -> Fut + Send + 'static,
  Fut: Future<Output = Result<(), E>> + Send,
  E: std::fmt::Display,
{
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;
    loop {
      interval.tick().await;
      debug!(job = name, "tick");
      if let Err(e) = job().await {
        error!(job = name, error = %e, "scheduled job failed");
      }
    }
  })
}
