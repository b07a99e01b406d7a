use std::time::Duration;

use chrono::Utc;
use url::Url;

use crate::api::models::ScrapeResponse;
use crate::extractor::ExtractedContent;

/// Wall-clock time as seconds with two decimals, e.g. `"0.42s"`.
pub fn format_fetch_time(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

/// Byte length in KiB with one decimal, e.g. `"12.3 KB"`.
pub fn format_content_size(bytes: usize) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Combines the extracted content with the statistics derived from it.
pub fn assemble(
    final_url: &Url,
    html: String,
    content: ExtractedContent,
    elapsed: Duration,
    include_html: bool,
) -> ScrapeResponse {
    ScrapeResponse {
        url: final_url.to_string(),
        fetch_time: format_fetch_time(elapsed),
        content_size: format_content_size(html.len()),
        word_count: word_count(&content.text_content),
        title_length: content.title.chars().count(),
        links_count: content.links.len(),
        images_count: content.images.len(),
        headings_count: content.headings.len(),
        scraped_at: Utc::now(),
        html: include_html.then_some(html),
        content,
    }
}
