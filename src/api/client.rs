use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::models::ApiEnvelope;
use crate::util::env;

/// Thin reqwest wrapper over the content API's read endpoints.
#[derive(Clone)]
pub struct ContentApiClient {
    http: Client,
    base: Url,
}

impl ContentApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url).with_context(|| format!("invalid content API url '{base_url}'"))?;
        // Relative joins keep any path prefix only when the base ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("content-maint/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base })
    }

    /// Base URL from `CONTENT_API_URL` (default `http://localhost:4000`).
    pub fn from_env() -> Result<Self> {
        Self::new(&env::api_base_url())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.base
            .join(&format!("api/content/{path}"))
            .context("building content API url")
    }

    async fn get_envelope(&self, url: Url) -> Result<ApiEnvelope> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("request {url}"))?;
        let status = resp.status();
        let body = resp.text().await.with_context(|| format!("read body of {url}"))?;
        serde_json::from_str(&body).with_context(|| format!("{url} returned {status} with a non-JSON body"))
    }

    /// `GET /api/content/{type}`
    pub async fn list(&self, content_type: &str) -> Result<ApiEnvelope> {
        let url = self.endpoint(&[content_type])?;
        self.get_envelope(url).await
    }

    /// `GET /api/content/{type}/drill/{step}`
    pub async fn drill(&self, content_type: &str, step: &str) -> Result<ApiEnvelope> {
        let url = self.endpoint(&[content_type, "drill", step])?;
        self.get_envelope(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_encoded_endpoints() {
        let c = ContentApiClient::new("http://localhost:4000").unwrap();
        let url = c.endpoint(&["mortgage-refi", "drill", "refinance mortgage/1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4000/api/content/mortgage-refi/drill/refinance%20mortgage%2F1"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let c = ContentApiClient::new("https://admin.example.com/cms").unwrap();
        let url = c.endpoint(&["credit"]).unwrap();
        assert_eq!(url.as_str(), "https://admin.example.com/cms/api/content/credit");

        let c = ContentApiClient::new("https://admin.example.com/cms/").unwrap();
        assert_eq!(c.endpoint(&["credit"]).unwrap().path(), "/cms/api/content/credit");
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(ContentApiClient::new("not a url").is_err());
    }
}
