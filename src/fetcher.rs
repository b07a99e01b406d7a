use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{AppError, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// Header set sent with every outbound request, shaped like a desktop browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserHeaders {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub connection: String,
    pub upgrade_insecure_requests: String,
}

impl Default for BrowserHeaders {
    fn default() -> Self {
        BrowserHeaders {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            accept_encoding: "gzip, deflate".to_string(),
            connection: "keep-alive".to_string(),
            upgrade_insecure_requests: "1".to_string(),
        }
    }
}

impl BrowserHeaders {
    fn to_header_map(&self) -> Result<HeaderMap> {
        let pairs: [(HeaderName, &str); 6] = [
            (header::USER_AGENT, self.user_agent.as_str()),
            (header::ACCEPT, self.accept.as_str()),
            (header::ACCEPT_LANGUAGE, self.accept_language.as_str()),
            (header::ACCEPT_ENCODING, self.accept_encoding.as_str()),
            (header::CONNECTION, self.connection.as_str()),
            (header::UPGRADE_INSECURE_REQUESTS, self.upgrade_insecure_requests.as_str()),
        ];

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let value = HeaderValue::from_str(value).map_err(|e| {
                AppError::ConfigError(format!("Invalid value for header {}: {}", name, e))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub headers: BrowserHeaders,
    /// Skips TLS certificate verification. Lets misconfigured sites be
    /// scraped at the cost of exposing requests to interception.
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout: DEFAULT_TIMEOUT,
            headers: BrowserHeaders::default(),
            accept_invalid_certs: false,
        }
    }
}

/// A fetched document, owned by the request that fetched it.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub html: String,
    /// Where the request ended up after redirects.
    pub final_url: Url,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(MAX_CONNECT_TIMEOUT))
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .default_headers(config.headers.to_header_map()?);

        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for outbound fetches");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Fetcher { client })
    }

    /// Fetches `url` once, normalising a missing scheme to `https://`.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<PageSnapshot> {
        let target = parse_target(url)?;
        debug!(target = %target, "dispatching request");

        let response = self.client.get(target).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        // Body read and decode failures are transport failures too.
        let html = response.text().await?;
        debug!(final_url = %final_url, bytes = html.len(), "fetched page");

        Ok(PageSnapshot {
            html,
            final_url,
            content_type,
        })
    }
}

/// Prepends `https://` when the input carries no http(s) scheme.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Normalises and parses a user-supplied URL, requiring a scheme and a host.
pub fn parse_target(raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        return Err(AppError::ValidationError("URL is required".to_string()));
    }

    let normalized = normalize_url(raw);
    let url = Url::parse(&normalized)
        .map_err(|e| AppError::ValidationError(format!("Invalid URL '{}': {}", normalized, e)))?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(AppError::ValidationError(format!(
            "Invalid URL '{}': missing host",
            normalized
        ))),
    }
}
