//! Plain HTTP image access for preview and box-art lookups.

use std::time::Duration;

use livestatus_core::source::ImageFetcher;
use reqwest::{Client, StatusCode};

use crate::error::{ClientError, ensure_success};

#[derive(Clone)]
pub struct HttpImages {
  http: Client,
}

impl HttpImages {
  pub fn new() -> Result<Self, ClientError> {
    let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { http })
  }
}

impl ImageFetcher for HttpImages {
  type Error = ClientError;

  async fn fetch(&self, url: &str) -> Result<Vec<u8>, ClientError> {
    let resp = ensure_success(url, self.http.get(url).send().await?).await?;
    Ok(resp.bytes().await?.to_vec())
  }

  async fn exists(&self, url: &str) -> bool {
    matches!(
      self.http.get(url).send().await,
      Ok(resp) if resp.status() == StatusCode::OK
    )
  }
}
