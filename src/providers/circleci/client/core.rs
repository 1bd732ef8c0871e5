use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::{Semaphore, SemaphorePermit};
use url::Url;

use crate::auth::Token;
use crate::error::{DeployLensError, Result};

const TOKEN_HEADER: &str = "Circle-Token";
const USER_AGENT: &str = concat!("deploylens/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Transport settings shared by every CircleCI call.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

pub struct CircleCiClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
    semaphore: Arc<Semaphore>,
}

impl CircleCiClient {
    pub fn new(base_url: &str, token: Option<Token>, options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| DeployLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let api_url = Url::parse(&normalized)
            .map_err(|e| DeployLensError::Config(format!("Invalid base URL: {e}")))?
            .join("api/")
            .map_err(|e| DeployLensError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
            semaphore: Arc::new(Semaphore::new(options.max_concurrent_requests.max(1))),
        })
    }

    /// Builds an API URL from path segments.
    ///
    /// Each segment is percent-encoded on its own, so `/`, `?` and `#` inside
    /// an id stay part of that id. `.` and `..` are refused.
    pub(super) fn endpoint<I, S>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<S> = segments.into_iter().collect();
        if let Some(bad) = segments
            .iter()
            .map(|segment| segment.as_ref())
            .find(|segment| segment.is_empty() || matches!(*segment, "." | ".."))
        {
            return Err(DeployLensError::Config(format!("Invalid path segment '{bad}'")));
        }

        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| DeployLensError::Config(format!("Unusable API URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(&segments);
        Ok(url)
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| DeployLensError::Config("request limiter was closed".to_string()))
    }

    /// Authenticated GET returning a decoded JSON document.
    pub(super) async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let _permit = self.permit().await?;
        debug!("GET {url}");

        let mut request = self.client.get(url.clone()).header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeployLensError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| DeployLensError::MalformedResponse(format!("{url}: {e}")))
    }

    /// Unauthenticated GET of a raw text document.
    pub(super) async fn get_text(&self, url: Url) -> Result<String> {
        let _permit = self.permit().await?;
        debug!("GET {url}");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeployLensError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
