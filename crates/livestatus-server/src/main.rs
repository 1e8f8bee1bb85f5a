//! livestatus server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), subscribes to
//! Twitch EventSub for every configured broadcaster, brings Discord in line
//! with the current stream status and then serves the webhook endpoint.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use livestatus_core::{
  dispatch::{Dispatcher, resolve_subjects},
  reconcile::Reconciler,
  state::StateStore,
  subscription::SubscriptionManager,
};
use livestatus_server::{
  AppState,
  config::Settings,
  discord::DiscordClient,
  i18n,
  images::HttpImages,
  scheduler::spawn_periodic,
  twitch::TwitchClient,
  webhook::WebhookConfig,
};
use livestatus_store_sqlite::SqliteBindings;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Twitch live status for Discord")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let localizer = Arc::new(
    i18n::load_dir(&expand_tilde(&settings.i18n_dir)).context("failed to load i18n bundles")?,
  );

  let store_path = expand_tilde(&settings.store_path);
  let bindings = SqliteBindings::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Twitch: token, subscriptions, subject profiles.
  let twitch = TwitchClient::connect(settings.twitch.clone())
    .await
    .context("failed to authenticate with twitch")?;

  let subject_ids = settings.subject_ids();
  SubscriptionManager::new(twitch.clone())
    .resync_all(&subject_ids)
    .await
    .context("failed to resync eventsub subscriptions")?;

  let subjects = resolve_subjects(&twitch, &subject_ids, &settings.retry)
    .await
    .context("failed to resolve twitch users")?;

  // Discord side and the engine.
  let discord = DiscordClient::new(&settings.discord.token).context("failed to build discord client")?;
  let reconciler = Reconciler::new(
    bindings,
    discord.clone(),
    discord,
    settings.destinations(),
    localizer,
  );
  let images = HttpImages::new().context("failed to build image client")?;
  let states = StateStore::new(subjects, images, reconciler);
  let dispatcher = Dispatcher::new(twitch, states, settings.retry);

  dispatcher.hydrate().await.context("initial status sync failed")?;

  let keep_alive = dispatcher.clone();
  spawn_periodic("keep-alive", settings.schedule.keep_alive(), move || {
    let d = keep_alive.clone();
    async move { d.tick_keep_alive().await }
  });
  let poll = dispatcher.clone();
  spawn_periodic("poll", settings.schedule.poll(), move || {
    let d = poll.clone();
    async move { d.tick_poll().await }
  });

  let state = AppState {
    live:    Arc::new(dispatcher),
    webhook: Arc::new(WebhookConfig { secret: settings.twitch.webhook_secret.clone() }),
  };
  let app = livestatus_server::router(state);
  let address = format!("{}:{}", settings.server.host, settings.server.port);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
