//! Runtime configuration, deserialised from `config.toml` and
//! `LIVESTATUS_`-prefixed environment variables.
//!
//! Nested keys use `__` in the environment, e.g.
//! `LIVESTATUS_TWITCH__CLIENT_SECRET`.

use std::{
  collections::{BTreeMap, BTreeSet},
  path::{Path, PathBuf},
  time::Duration,
};

use config::ConfigError;
use livestatus_core::{
  destination::{Destination, EventSettings, MessageSettings},
  i18n::DEFAULT_LANG,
  render::EVENT_EXPIRY,
  retry::RetryPolicy,
  subject::SubjectId,
};
use serde::Deserialize;

/// Twitch accepts EventSub secrets between 10 and 100 characters.
const WEBHOOK_SECRET_LEN: std::ops::RangeInclusive<usize> = 10..=100;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub server:     ServerSettings,
  pub twitch:     TwitchSettings,
  pub discord:    DiscordSettings,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_i18n_dir")]
  pub i18n_dir:   PathBuf,
  #[serde(default)]
  pub schedule:   ScheduleSettings,
  #[serde(default)]
  pub retry:      RetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
  pub host: String,
  pub port: u16,
}

impl Default for ServerSettings {
  fn default() -> Self { Self { host: "0.0.0.0".into(), port: 8080 } }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitchSettings {
  pub client_id:      String,
  pub client_secret:  String,
  /// Public callback URL Twitch delivers notifications to.
  pub webhook_url:    String,
  pub webhook_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
  pub token:   String,
  /// Guild id → notifiers configured in that guild.
  #[serde(default)]
  pub servers: BTreeMap<String, Vec<NotifierSettings>>,
}

/// One watched broadcaster inside a guild.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierSettings {
  pub twitch_id: String,
  #[serde(default = "default_lang")]
  pub lang:      String,
  #[serde(default)]
  pub event:     EventSettings,
  #[serde(default)]
  pub message:   MessageSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
  /// Event refresh period; must stay below the two-minute event expiry.
  pub keep_alive_secs: u64,
  pub poll_secs:       u64,
}

impl Default for ScheduleSettings {
  fn default() -> Self { Self { keep_alive_secs: 60, poll_secs: 300 } }
}

impl ScheduleSettings {
  pub fn keep_alive(&self) -> Duration { Duration::from_secs(self.keep_alive_secs) }

  pub fn poll(&self) -> Duration { Duration::from_secs(self.poll_secs) }

  fn validate(&self) -> Result<(), ConfigError> {
    let expiry = EVENT_EXPIRY.num_seconds().unsigned_abs();
    if self.poll_secs == 0 {
      return Err(ConfigError::Message("schedule.poll_secs must be positive".into()));
    }
    if self.keep_alive_secs == 0 || self.keep_alive_secs >= expiry {
      return Err(ConfigError::Message(format!(
        "schedule.keep_alive_secs must be between 1 and {}",
        expiry - 1
      )));
    }
    Ok(())
  }
}

fn default_store_path() -> PathBuf { PathBuf::from("livestatus.db") }

fn default_i18n_dir() -> PathBuf { PathBuf::from("i18n") }

fn default_lang() -> String { DEFAULT_LANG.to_owned() }

impl Settings {
  /// Read `path` (optional) overlaid with the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let settings: Settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("LIVESTATUS")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if !WEBHOOK_SECRET_LEN.contains(&self.twitch.webhook_secret.len()) {
      return Err(ConfigError::Message(
        "twitch.webhook_secret must be 10 to 100 characters".into(),
      ));
    }
    self.schedule.validate()
  }

  /// Every configured notifier as a core [`Destination`].
  pub fn destinations(&self) -> Vec<Destination> {
    self
      .discord
      .servers
      .iter()
      .flat_map(|(guild, notifiers)| {
        notifiers.iter().map(move |n| Destination {
          group_id:   guild.clone(),
          subject_id: SubjectId::new(n.twitch_id.clone()),
          lang:       n.lang.clone(),
          event:      n.event.clone(),
          message:    n.message.clone(),
        })
      })
      .collect()
  }

  /// Distinct subject ids across all guilds, sorted.
  pub fn subject_ids(&self) -> Vec<SubjectId> {
    self
      .discord
      .servers
      .values()
      .flatten()
      .map(|n| n.twitch_id.as_str())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .map(SubjectId::from)
      .collect()
  }
}
