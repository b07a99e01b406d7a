//! Turns a fetched HTML document into the structured summary returned by the API.
//!
//! Parsing goes through `scraper`'s html5ever backend, which recovers from
//! malformed markup the way a browser does, so extraction never fails on
//! bad HTML. Individual elements that cannot be used (for example an `href`
//! that does not resolve against the page URL) are dropped.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};

const NO_TITLE: &str = "No title";
const NO_TEXT: &str = "No text";
const NO_ALT: &str = "No alt text";

const TEXTUAL_MARKERS: &[&str] = &["html", "xml", "json", "javascript"];

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript"];
const NAVIGATION_TAGS: &[&str] = &["header", "footer", "nav"];

// Create static selectors to avoid recompiling them each time
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Failed to parse title selector"));
static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("Failed to parse meta selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Failed to parse link selector"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("Failed to parse image selector"));
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("Failed to parse body selector"));
static HEADING_SELECTORS: Lazy<[Selector; 6]> = Lazy::new(|| {
    std::array::from_fn(|i| {
        Selector::parse(&format!("h{}", i + 1)).expect("Failed to parse heading selector")
    })
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Also drop `header`, `footer` and `nav` subtrees from the text content.
    pub strip_navigation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    const ALL: [HeadingLevel; 6] = [
        HeadingLevel::H1,
        HeadingLevel::H2,
        HeadingLevel::H3,
        HeadingLevel::H4,
        HeadingLevel::H5,
        HeadingLevel::H6,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenGraphTag {
    pub property: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    pub title: String,
    pub description: String,
    pub meta_tags: Vec<MetaTag>,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub open_graph: Vec<OpenGraphTag>,
    pub text_content: String,
}

pub fn extract(html: &str, base_url: &Url, options: ExtractOptions) -> ExtractedContent {
    let document = Html::parse_document(html);

    ExtractedContent {
        title: extract_title(&document),
        description: extract_description(&document),
        meta_tags: extract_meta_tags(&document),
        headings: extract_headings(&document),
        links: extract_links(&document, base_url),
        images: extract_images(&document, base_url),
        open_graph: extract_open_graph(&document),
        text_content: extract_text(&document, options),
    }
}

/// Rejects bodies whose declared media type is not text. A missing
/// `Content-Type` is treated as HTML.
pub fn ensure_text_content(content_type: Option<&str>) -> Result<()> {
    let Some(content_type) = content_type else {
        return Ok(());
    };
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if media_type.is_empty()
        || media_type.starts_with("text/")
        || TEXTUAL_MARKERS.iter().any(|marker| media_type.contains(marker))
    {
        Ok(())
    } else {
        Err(AppError::ParseError(format!(
            "content type '{}' cannot be read as text",
            media_type
        )))
    }
}

/// Collapses every run of whitespace to one space and trims both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves each `(raw_url, payload)` candidate against `base`, dropping
/// the ones that do not form a valid URL.
pub fn resolve_all<'a, T, I>(base: &Url, candidates: I) -> Vec<(String, T)>
where
    I: IntoIterator<Item = (&'a str, T)>,
{
    candidates
        .into_iter()
        .filter_map(|(raw, payload)| {
            base.join(raw.trim())
                .ok()
                .map(|resolved| (String::from(resolved), payload))
        })
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn or_placeholder(text: String, placeholder: &str) -> String {
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

/// Attribute value exactly as written; an empty value counts as absent.
fn non_empty_attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn extract_title(document: &Html) -> String {
    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(element_text)
        .unwrap_or_default();
    or_placeholder(title, NO_TITLE)
}

fn meta_content(document: &Html, attribute: &str, expected: &str) -> Option<String> {
    document
        .select(&META_SELECTOR)
        .find(|meta| meta.value().attr(attribute) == Some(expected))
        .and_then(|meta| non_empty_attr(meta, "content"))
}

fn extract_description(document: &Html) -> String {
    meta_content(document, "name", "description")
        .or_else(|| meta_content(document, "property", "og:description"))
        .unwrap_or_default()
}

fn extract_meta_tags(document: &Html) -> Vec<MetaTag> {
    document
        .select(&META_SELECTOR)
        .filter_map(|meta| {
            let name = non_empty_attr(meta, "name")
                .or_else(|| non_empty_attr(meta, "property"))
                .or_else(|| non_empty_attr(meta, "http-equiv"))?;
            let content = non_empty_attr(meta, "content")?;
            Some(MetaTag { name, content })
        })
        .collect()
}

fn extract_headings(document: &Html) -> Vec<Heading> {
    HeadingLevel::ALL
        .iter()
        .zip(HEADING_SELECTORS.iter())
        .flat_map(|(level, selector)| {
            document.select(selector).map(move |heading| {
                let classes: Vec<&str> = heading.value().classes().collect();
                Heading {
                    level: *level,
                    text: or_placeholder(element_text(heading), NO_TEXT),
                    id: non_empty_attr(heading, "id"),
                    class: (!classes.is_empty()).then(|| classes.join(" ")),
                }
            })
        })
        .collect()
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Link> {
    let candidates = document.select(&LINK_SELECTOR).filter_map(|anchor| {
        let href = anchor.value().attr("href")?;
        Some((href, or_placeholder(element_text(anchor), NO_TEXT)))
    });

    resolve_all(base_url, candidates)
        .into_iter()
        .map(|(url, text)| Link { text, url })
        .collect()
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<Image> {
    let candidates = document.select(&IMAGE_SELECTOR).filter_map(|img| {
        let src = img.value().attr("src")?;
        Some((src, img))
    });

    resolve_all(base_url, candidates)
        .into_iter()
        .map(|(src, img)| Image {
            src,
            alt: non_empty_attr(img, "alt").unwrap_or_else(|| NO_ALT.to_string()),
            width: non_empty_attr(img, "width"),
            height: non_empty_attr(img, "height"),
        })
        .collect()
}

fn extract_open_graph(document: &Html) -> Vec<OpenGraphTag> {
    document
        .select(&META_SELECTOR)
        .filter_map(|meta| {
            let property = meta.value().attr("property")?;
            property.starts_with("og:").then(|| OpenGraphTag {
                property: property.to_string(),
                content: meta.value().attr("content").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

fn extract_text(document: &Html, options: ExtractOptions) -> String {
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut chunks = Vec::new();
    collect_visible_text(root, options, &mut chunks);
    collapse_whitespace(&chunks.join(" "))
}

fn is_skipped(name: &str, options: ExtractOptions) -> bool {
    HIDDEN_TAGS.contains(&name) || (options.strip_navigation && NAVIGATION_TAGS.contains(&name))
}

fn collect_visible_text<'a>(element: ElementRef<'a>, options: ExtractOptions, out: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(&**text),
            Node::Element(el) if is_skipped(el.name(), options) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_visible_text(child, options, out);
                }
            }
            _ => {}
        }
    }
}
