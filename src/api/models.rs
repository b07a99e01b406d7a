use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::extractor::ExtractedContent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
    /// Accepted for client compatibility; pages are always fetched statically.
    #[serde(default)]
    pub use_playwright: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    pub url: String,
    #[serde(flatten)]
    pub content: ExtractedContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub fetch_time: String,
    pub content_size: String,
    pub word_count: usize,
    pub title_length: usize,
    pub links_count: usize,
    pub images_count: usize,
    pub headings_count: usize,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: f64,
}

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}
