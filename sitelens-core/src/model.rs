// Input records handed over by the crawler, sitemap and robots collaborators

use crate::table::{Cell, Column, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Normalize a URL for comparison: trim, lowercase and strip trailing
/// slashes unless only a bare `scheme://host` would remain.
pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let stripped = lowered.trim_end_matches('/');
    let min_len = lowered.find("://").map_or(0, |idx| idx + 3);
    if stripped.len() > min_len {
        stripped.to_string()
    } else {
        lowered
    }
}

/// H1 values as delivered by the extractor: absent, one string, or a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Headings {
    #[default]
    Absent,
    Single(String),
    Many(Vec<String>),
}

impl Headings {
    pub fn count(&self) -> usize {
        match self {
            Headings::Absent => 0,
            Headings::Single(s) if s.trim().is_empty() => 0,
            Headings::Single(_) => 1,
            Headings::Many(list) => list.len(),
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        match self {
            Headings::Absent => Vec::new(),
            Headings::Single(s) => vec![s.as_str()],
            Headings::Many(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundLink {
    #[serde(alias = "link", alias = "url")]
    pub target: String,
    #[serde(default, alias = "anchorText", alias = "text")]
    pub anchor_text: Option<String>,
    #[serde(default)]
    pub nofollow: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "metaDescription", alias = "meta_desc")]
    pub meta_description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_headings")]
    pub h1: Headings,
    #[serde(default)]
    pub canonical: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    /// URLs requested before landing on `url`, in hop order.
    #[serde(default, alias = "redirectUrls")]
    pub redirect_urls: Option<Vec<String>>,
    #[serde(default, alias = "redirectTimes")]
    pub redirect_times: Option<u32>,
    #[serde(default, alias = "redirectReasons")]
    pub redirect_reasons: Option<Vec<u16>>,
    #[serde(default, alias = "outboundLinks", alias = "links")]
    pub outbound_links: Vec<OutboundLink>,
}

fn deserialize_headings<'de, D>(deserializer: D) -> Result<Headings, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Headings>::deserialize(deserializer)?.unwrap_or_default())
}

impl PageRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Full hop chain ending at this page, or `None` when it was not redirected.
    pub fn redirect_chain(&self) -> Option<Vec<&str>> {
        let hops = self.redirect_urls.as_ref().filter(|h| !h.is_empty())?;
        let mut chain: Vec<&str> = hops.iter().map(String::as_str).collect();
        chain.push(self.url.as_str());
        Some(chain)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitemapRecord {
    #[serde(alias = "url")]
    pub loc: String,
    #[serde(default)]
    pub lastmod: Option<String>,
    #[serde(default, alias = "sourceSitemap", alias = "sitemap")]
    pub source_sitemap: Option<String>,
}

impl SitemapRecord {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotsRecord {
    pub directive: String,
    #[serde(default)]
    pub content: String,
}

impl RobotsRecord {
    pub fn new(directive: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            content: content.into(),
        }
    }
}

impl Row for RobotsRecord {
    const COLUMNS: &'static [Column] = &[Column::text("directive"), Column::text("content")];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.directive.clone()),
            Cell::Text(self.content.clone()),
        ]
    }
}

/// The site's entry page as fetched once for the rendering and schema probes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPage {
    pub url: String,
    pub html: Option<String>,
}

/// Read-only crawl output, unique by normalized URL.
#[derive(Debug, Clone, Default)]
pub struct PageStore {
    pages: Vec<PageRecord>,
}

impl PageStore {
    pub fn new(records: Vec<PageRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut pages = Vec::with_capacity(records.len());
        for record in records {
            if record.url.trim().is_empty() {
                debug!("Dropping page record without url");
                continue;
            }
            if seen.insert(record.normalized_url()) {
                pages.push(record);
            } else {
                debug!("Dropping duplicate page record for {}", record.url);
            }
        }
        Self { pages }
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn normalized_urls(&self) -> Vec<String> {
        self.pages.iter().map(PageRecord::normalized_url).collect()
    }
}

/// Sitemap entries in ingestion order; the same `loc` may repeat across files.
#[derive(Debug, Clone, Default)]
pub struct SitemapStore {
    records: Vec<SitemapRecord>,
}

impl SitemapStore {
    pub fn new(records: Vec<SitemapRecord>) -> Self {
        let records = records
            .into_iter()
            .filter(|r| !r.loc.trim().is_empty())
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[SitemapRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First occurrence per normalized `loc`, ingestion order preserved.
    pub fn deduplicated(&self) -> Vec<&SitemapRecord> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(normalize_url(&r.loc)))
            .collect()
    }
}
