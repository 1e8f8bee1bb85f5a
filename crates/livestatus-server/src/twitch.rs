//! Twitch Helix client: app token, stream/user lookups and EventSub
//! subscription management.
//!
//! A rejected token is refreshed and the request replayed once. Transient
//! failure retries are the caller's business.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use livestatus_core::{
  retry::RetryPolicy,
  source::StatusSource,
  subject::{StreamStatus, Subject, SubjectId},
  subscription::{
    Cost, NotificationKind, Subscription, SubscriptionRequest, SubscriptionTransport,
  },
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
  config::TwitchSettings,
  error::{ClientError, ensure_success},
};

pub const HELIX_URL: &str = "https://api.twitch.tv/helix";
pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Helix caps id filters and page sizes at 100.
const MAX_IDS: usize = 100;

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Page<T> {
  data:       Vec<T>,
  #[serde(default)]
  pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
  cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

#[derive(Debug, Deserialize)]
struct HelixStream {
  user_id:       String,
  #[serde(rename = "type")]
  kind:          String,
  title:         String,
  game_id:       String,
  game_name:     String,
  viewer_count:  u64,
  started_at:    DateTime<Utc>,
  thumbnail_url: String,
}

impl From<HelixStream> for StreamStatus {
  fn from(s: HelixStream) -> Self {
    StreamStatus {
      kind:          s.kind,
      title:         s.title,
      game_id:       s.game_id,
      game_name:     s.game_name,
      viewer_count:  s.viewer_count,
      started_at:    s.started_at,
      thumbnail_url: s.thumbnail_url,
    }
  }
}

#[derive(Debug, Deserialize)]
struct HelixUser {
  id:           String,
  login:        String,
  display_name: String,
}

#[derive(Debug, Deserialize)]
struct HelixSubscription {
  id:   String,
  #[serde(rename = "type")]
  kind: String,
}

#[derive(Debug, Deserialize)]
struct CreatedSubscription {
  total_cost:     u64,
  max_total_cost: u64,
}

#[derive(Debug, Serialize)]
struct CreateSubscription<'a> {
  #[serde(rename = "type")]
  kind:      &'a str,
  version:   &'static str,
  condition: Condition<'a>,
  transport: Transport<'a>,
}

#[derive(Debug, Serialize)]
struct Condition<'a> {
  broadcaster_user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Transport<'a> {
  method:   &'static str,
  callback: &'a str,
  secret:   &'a str,
}

fn version(kind: NotificationKind) -> &'static str {
  match kind {
    NotificationKind::ProfileChanged => "2",
    NotificationKind::WentLive | NotificationKind::WentOffline => "1",
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cheap to clone; clones share the HTTP pool and the app token.
#[derive(Clone)]
pub struct TwitchClient {
  http:      Client,
  settings:  Arc<TwitchSettings>,
  token:     Arc<RwLock<String>>,
  helix_url: String,
  token_url: String,
}

impl TwitchClient {
  /// Build a client against the public endpoints and fetch an app token.
  pub async fn connect(settings: TwitchSettings) -> Result<Self, ClientError> {
    Self::with_endpoints(settings, HELIX_URL, TOKEN_URL).await
  }

  pub async fn with_endpoints(
    settings: TwitchSettings,
    helix_url: &str,
    token_url: &str,
  ) -> Result<Self, ClientError> {
    let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
    let client = Self {
      http,
      settings: Arc::new(settings),
      token: Arc::default(),
      helix_url: helix_url.trim_end_matches('/').to_owned(),
      token_url: token_url.to_owned(),
    };
    client.refresh_token().await?;
    Ok(client)
  }

  async fn refresh_token(&self) -> Result<(), ClientError> {
    let resp = self
      .http
      .post(&self.token_url)
      .query(&[
        ("client_id", self.settings.client_id.as_str()),
        ("client_secret", self.settings.client_secret.as_str()),
        ("grant_type", "client_credentials"),
      ])
      .send()
      .await?;
    let token: TokenResponse = ensure_success("oauth2/token", resp).await?.json().await?;
    *self.token.write().await = token.access_token;
    info!("twitch app token refreshed");
    Ok(())
  }

  fn url(&self, endpoint: &str) -> String { format!("{}{endpoint}", self.helix_url) }

  /// Send an authenticated Helix request built by `build`, replaying it
  /// once after a token refresh.
  async fn send(
    &self,
    endpoint: &str,
    build: impl Fn() -> RequestBuilder,
  ) -> Result<reqwest::Response, ClientError> {
    let this = self;
    let build = &build;
    RetryPolicy::new(2, Duration::ZERO)
      .run_when(
        endpoint,
        move || async move {
          let token = this.token.read().await.clone();
          let resp = build()
            .header("Client-Id", &this.settings.client_id)
            .bearer_auth(token)
            .send()
            .await?;
          if resp.status() == StatusCode::UNAUTHORIZED {
            this.refresh_token().await?;
            return Err(ClientError::TokenExpired);
          }
          ensure_success(endpoint, resp).await
        },
        |e| matches!(e, ClientError::TokenExpired),
      )
      .await
  }

  async fn get<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    query: &[(&str, &str)],
  ) -> Result<T, ClientError> {
    let url = self.url(endpoint);
    let resp = self.send(endpoint, || self.http.get(&url).query(query)).await?;
    Ok(resp.json().await?)
  }
}

fn id_query<'a>(key: &'a str, ids: &'a [SubjectId]) -> Vec<(&'a str, &'a str)> {
  ids.iter().map(|id| (key, id.as_str())).collect()
}

impl StatusSource for TwitchClient {
  type Error = ClientError;

  async fn fetch_statuses(
    &self,
    ids: &[SubjectId],
  ) -> Result<HashMap<SubjectId, StreamStatus>, ClientError> {
    let mut out = HashMap::new();
    for chunk in ids.chunks(MAX_IDS) {
      let mut query = id_query("user_id", chunk);
      query.push(("first", "100"));
      let page: Page<HelixStream> = self.get("/streams", &query).await?;
      for stream in page.data {
        out.insert(SubjectId::new(stream.user_id.clone()), stream.into());
      }
    }
    debug!(requested = ids.len(), streaming = out.len(), "fetched statuses");
    Ok(out)
  }

  async fn fetch_users(
    &self,
    ids: &[SubjectId],
  ) -> Result<HashMap<SubjectId, Subject>, ClientError> {
    let mut out = HashMap::new();
    for chunk in ids.chunks(MAX_IDS) {
      let page: Page<HelixUser> = self.get("/users", &id_query("id", chunk)).await?;
      for user in page.data {
        let id = SubjectId::new(user.id);
        out.insert(id.clone(), Subject {
          id,
          login: user.login,
          display_name: user.display_name,
        });
      }
    }
    Ok(out)
  }
}

impl SubscriptionTransport for TwitchClient {
  type Error = ClientError;

  async fn list(&self) -> Result<Vec<Subscription>, ClientError> {
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
      let query: Vec<(&str, &str)> =
        cursor.as_deref().map(|c| ("after", c)).into_iter().collect();
      let page: Page<HelixSubscription> =
        self.get("/eventsub/subscriptions", &query).await?;
      out.extend(page.data.into_iter().map(|s| Subscription { id: s.id, kind: s.kind }));
      match page.pagination.cursor.filter(|c| !c.is_empty()) {
        Some(next) => cursor = Some(next),
        None => return Ok(out),
      }
    }
  }

  async fn delete(&self, id: &str) -> Result<(), ClientError> {
    let url = self.url("/eventsub/subscriptions");
    self
      .send("/eventsub/subscriptions", || {
        self.http.delete(&url).query(&[("id", id)])
      })
      .await?;
    Ok(())
  }

  async fn create(&self, request: &SubscriptionRequest) -> Result<Cost, ClientError> {
    let body = CreateSubscription {
      kind:      request.kind.as_ref(),
      version:   version(request.kind),
      condition: Condition { broadcaster_user_id: request.subject_id.as_str() },
      transport: Transport {
        method:   "webhook",
        callback: &self.settings.webhook_url,
        secret:   &self.settings.webhook_secret,
      },
    };
    let url = self.url("/eventsub/subscriptions");
    let resp = self
      .send("/eventsub/subscriptions", || self.http.post(&url).json(&body))
      .await?;
    let created: CreatedSubscription = resp.json().await?;
    debug!(subject = %request.subject_id, kind = %request.kind, "subscribed");
    Ok(Cost { used: created.total_cost, limit: created.max_total_cost })
  }
}
