// Rule-based interpretation of report tables into summaries and red flags

use crate::entry_page::{RenderingMode, RenderingRow, SchemaRow};
use crate::error::{AuditError, Result};
use crate::link_graph::{LinkEdgeRow, LinkNodeRow};
use crate::model::{RobotsRecord, normalize_url};
use crate::ngrams::{NgramRow, is_symbol_token};
use crate::reconcile::ReconciliationRow;
use crate::reporters::{
    CanonicalRow, HeadingsRow, MetaRow, RedirectRow, StatusRow, UrlStructureRow, panic_message,
};
use crate::table::{ReportTable, Row, count_where, mean};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

pub const MAX_REDIRECT_CHAIN: usize = 2;
pub const MAX_MEAN_PATH_DEPTH: f64 = 5.0;
pub const MAX_MEAN_URL_LENGTH: f64 = 100.0;
pub const MIN_LINKS_PER_PAGE: f64 = 2.0;
pub const SYMBOL_SHARE_THRESHOLD: f64 = 0.1;
pub const BRAND_SHARE_THRESHOLD: f64 = 0.3;
pub const LEGAL_TERMS: [&str; 4] = ["policy", "terms", "conditions", "privacy"];
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlag {
    pub severity: Severity,
    pub message: String,
}

impl RedFlag {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for RedFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str().to_uppercase(), self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub summary: String,
    pub meaning: String,
    pub red_flags: Vec<RedFlag>,
    pub details: String,
}

impl InsightRecord {
    fn new(summary: String, meaning: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            summary,
            meaning: meaning.into(),
            red_flags: Vec::new(),
            details: details.into(),
        }
    }

    fn flag(&mut self, severity: Severity, message: impl Into<String>) {
        self.red_flags.push(RedFlag::new(severity, message));
    }

    /// Neutral insight for a dimension whose table has no rows.
    pub fn no_data(dimension: Dimension) -> Self {
        let name = dimension.name();
        Self {
            summary: format!("No data was collected for {}.", name),
            meaning: format!("{} insights are not available in this run.", name),
            red_flags: Vec::new(),
            details: "Check logs for crawl or parsing details. This does not always indicate an issue."
                .to_string(),
        }
    }

    /// Neutral insight for a dimension whose rule failed.
    pub fn not_generated(dimension: Dimension) -> Self {
        let name = dimension.name();
        Self {
            summary: format!("{} insights could not be generated.", name),
            meaning: format!("{} section did not produce data.", name),
            red_flags: Vec::new(),
            details: "Check logs for details. This does not always indicate an issue.".to_string(),
        }
    }
}

/// Report dimensions in assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    RenderingMode,
    Robots,
    Meta,
    Headings,
    SchemaCheck,
    Canonicals,
    Status,
    SitemapVsCrawl,
    UrlStructure,
    Redirects,
    InternalLinks,
    Ngrams1,
    Ngrams2,
    Ngrams3,
}

impl Dimension {
    pub const ALL: [Dimension; 14] = [
        Dimension::RenderingMode,
        Dimension::Robots,
        Dimension::Meta,
        Dimension::Headings,
        Dimension::SchemaCheck,
        Dimension::Canonicals,
        Dimension::Status,
        Dimension::SitemapVsCrawl,
        Dimension::UrlStructure,
        Dimension::Redirects,
        Dimension::InternalLinks,
        Dimension::Ngrams1,
        Dimension::Ngrams2,
        Dimension::Ngrams3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::RenderingMode => "Rendering_Mode",
            Dimension::Robots => "Robots",
            Dimension::Meta => "Meta",
            Dimension::Headings => "Headings",
            Dimension::SchemaCheck => "Schema_Check",
            Dimension::Canonicals => "Canonicals",
            Dimension::Status => "Status",
            Dimension::SitemapVsCrawl => "Sitemap_vs_Crawl",
            Dimension::UrlStructure => "URL_Structure",
            Dimension::Redirects => "Redirects",
            Dimension::InternalLinks => "Internal_Links",
            Dimension::Ngrams1 => "Ngrams_1",
            Dimension::Ngrams2 => "Ngrams_2",
            Dimension::Ngrams3 => "Ngrams_3",
        }
    }

    pub fn title(&self) -> String {
        self.name().replace('_', " ")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name().eq_ignore_ascii_case(name))
    }

    /// Phrase length for n-gram dimensions.
    pub fn ngram_order(&self) -> Option<usize> {
        match self {
            Dimension::Ngrams1 => Some(1),
            Dimension::Ngrams2 => Some(2),
            Dimension::Ngrams3 => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs to rules beyond the table itself.
#[derive(Debug, Clone)]
pub struct InsightContext {
    /// Site brand token for the n-gram dominance rule.
    pub brand_token: Option<String>,
    pub top_k: usize,
}

impl Default for InsightContext {
    fn default() -> Self {
        Self {
            brand_token: None,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Run one dimension's rule without ever failing.
///
/// An empty table short-circuits to [`InsightRecord::no_data`]. A rule that
/// returns an error or panics yields [`InsightRecord::not_generated`].
pub fn interpret<R, F>(dimension: Dimension, table: &ReportTable<R>, rule: F) -> InsightRecord
where
    R: Row,
    F: FnOnce(&ReportTable<R>) -> Result<InsightRecord>,
{
    info!("Interpreting {}...", dimension);
    if table.is_empty() {
        return InsightRecord::no_data(dimension);
    }

    match panic::catch_unwind(AssertUnwindSafe(|| rule(table))) {
        Ok(Ok(insight)) => insight,
        Ok(Err(e)) => {
            warn!("Interpretation issue in {}: {}", dimension, e);
            InsightRecord::not_generated(dimension)
        }
        Err(payload) => {
            warn!(
                "Interpretation issue in {}: {}",
                dimension,
                panic_message(payload.as_ref())
            );
            InsightRecord::not_generated(dimension)
        }
    }
}

pub fn interpret_meta(table: &ReportTable<MetaRow>) -> Result<InsightRecord> {
    let rows = table.rows();
    let missing_titles = count_where(rows, |r| r.title_missing);
    let missing_desc = count_where(rows, |r| r.description_missing);

    let mut insight = InsightRecord::new(
        format!(
            "Out of {} pages, {} missing titles, {} missing descriptions.",
            rows.len(),
            missing_titles,
            missing_desc
        ),
        "Meta tags help search engines understand content and influence click-through rates in SERPs.",
        "Pages without titles or descriptions risk poor rankings and unattractive snippets in search results.",
    );
    if missing_titles > 0 {
        insight.flag(
            Severity::High,
            format!("{} pages missing titles (should be 0).", missing_titles),
        );
    }
    if missing_desc > 0 {
        insight.flag(
            Severity::Medium,
            format!("{} pages missing descriptions (should be minimized).", missing_desc),
        );
    }
    Ok(insight)
}

pub fn interpret_headings(table: &ReportTable<HeadingsRow>) -> Result<InsightRecord> {
    let rows = table.rows();
    let missing = count_where(rows, |r| r.missing_h1);
    let multiple = count_where(rows, |r| r.multiple_h1);

    let mut insight = InsightRecord::new(
        format!(
            "Checked {} pages: {} missing H1, {} with multiple H1s.",
            rows.len(),
            missing,
            multiple
        ),
        "H1s provide structure and signal primary topic to search engines.",
        "Ideally, each page should have exactly one descriptive H1.",
    );
    if missing > 0 {
        insight.flag(
            Severity::Medium,
            format!("{} pages missing H1 (bad for SEO).", missing),
        );
    }
    if multiple > 0 {
        insight.flag(
            Severity::Low,
            format!("{} pages have multiple H1s (confuses search engines).", multiple),
        );
    }
    Ok(insight)
}

pub fn interpret_canonicals(table: &ReportTable<CanonicalRow>) -> Result<InsightRecord> {
    let rows = table.rows();
    let total = rows.len();
    let missing = count_where(rows, |r| r.canonical_missing);
    let self_refs = count_where(rows, |r| r.self_referencing);

    let mut insight = InsightRecord::new(
        format!(
            "{}/{} pages missing canonicals, {} are self-referencing.",
            missing, total, self_refs
        ),
        "Canonicals consolidate duplicate URLs to avoid dilution of ranking signals.",
        "Incorrect canonicals can cause indexation issues and duplicate content penalties.",
    );
    if missing > 0 {
        insight.flag(
            Severity::Medium,
            format!("{} pages missing canonical tags.", missing),
        );
    }
    if self_refs < total {
        insight.flag(
            Severity::Low,
            format!(
                "{} pages not self-referencing (check canonical setup).",
                total - self_refs
            ),
        );
    }
    Ok(insight)
}

pub fn interpret_status(table: &ReportTable<StatusRow>) -> Result<InsightRecord> {
    let rows = table.rows();
    let mut counts: HashMap<Option<u16>, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.status).or_default() += 1;
    }
    let mut distribution: Vec<(Option<u16>, usize)> = counts.into_iter().collect();
    distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_codes = distribution
        .iter()
        .take(5)
        .map(|(code, count)| match code {
            Some(code) => format!("{}: {}", code, count),
            None => format!("none: {}", count),
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut insight = InsightRecord::new(
        format!("Checked {} URLs. Status distribution → {}", rows.len(), top_codes),
        "Status codes show accessibility of pages to users and bots.",
        "Fixing error codes ensures pages can be crawled and indexed.",
    );
    if rows.iter().any(|r| matches!(r.status, Some(400..=499))) {
        insight.flag(Severity::High, "Presence of 4xx errors (broken links).");
    }
    if rows.iter().any(|r| matches!(r.status, Some(500..=599))) {
        insight.flag(Severity::Critical, "Presence of 5xx errors (server issues).");
    }
    Ok(insight)
}

pub fn interpret_sitemap_vs_crawl(table: &ReportTable<ReconciliationRow>) -> Result<InsightRecord> {
    let rows = table.rows();
    let orphaned = count_where(rows, |r| r.orphaned);
    let uncatalogued = count_where(rows, |r| r.uncatalogued);

    let mut insight = InsightRecord::new(
        format!(
            "Compared {} URLs. {} orphaned, {} uncatalogued.",
            rows.len(),
            orphaned,
            uncatalogued
        ),
        "Orphaned pages are not reached by the crawl; uncatalogued pages may miss exposure.",
        "Ensure all important pages appear in both crawl and sitemap.",
    );
    if orphaned > 0 {
        insight.flag(Severity::Medium, format!("{} orphaned pages found.", orphaned));
    }
    if uncatalogued > 0 {
        insight.flag(
            Severity::Low,
            format!("{} uncatalogued pages found.", uncatalogued),
        );
    }
    Ok(insight)
}

pub fn interpret_url_structure(table: &ReportTable<UrlStructureRow>) -> Result<InsightRecord> {
    let rows = table.rows();
    let depths: Vec<f64> = rows.iter().map(|r| r.url_path_depth as f64).collect();
    let lengths: Vec<f64> = rows.iter().map(|r| r.url_length as f64).collect();
    let avg_depth = mean(&depths).ok_or_else(|| AuditError::Rule("no URL depths".to_string()))?;
    let avg_length = mean(&lengths).ok_or_else(|| AuditError::Rule("no URL lengths".to_string()))?;

    let mut insight = InsightRecord::new(
        format!(
            "Analyzed {} URLs. Avg path depth = {:.2}, Avg length = {:.1}.",
            rows.len(),
            avg_depth,
            avg_length
        ),
        "Deep or long URLs can be harder for users and crawlers.",
        "Shallow, clean URLs improve crawlability and CTR.",
    );
    if avg_depth > MAX_MEAN_PATH_DEPTH {
        insight.flag(
            Severity::Low,
            "High average URL depth (may be buried in site).",
        );
    }
    if avg_length > MAX_MEAN_URL_LENGTH {
        insight.flag(Severity::Low, "Excessive URL length (not SEO-friendly).");
    }
    Ok(insight)
}

pub fn interpret_redirects(table: &ReportTable<RedirectRow>) -> Result<InsightRecord> {
    let rows = table.rows();
    let unique_urls: HashSet<String> = rows.iter().map(|r| normalize_url(&r.url)).collect();
    let longest_chain = rows.iter().map(|r| r.redirect_times).max().unwrap_or(0);

    let mut summary = format!(
        "Found {} redirect steps across {} unique URLs.",
        rows.len(),
        unique_urls.len()
    );
    if longest_chain > 0 {
        summary.push_str(&format!(" Longest chain has {} redirects.", longest_chain));
    }

    let mut insight = InsightRecord::new(
        summary,
        "Redirects affect crawl efficiency and link equity. Long chains should be avoided.",
        "Use direct 301 redirects. Avoid chains and loops to preserve crawl budget and SEO value.",
    );
    if longest_chain > MAX_REDIRECT_CHAIN {
        insight.flag(
            Severity::Medium,
            format!("Long redirect chain detected (length {}).", longest_chain),
        );
    }
    Ok(insight)
}

pub fn interpret_internal_links(
    nodes: &ReportTable<LinkNodeRow>,
    edges: &ReportTable<LinkEdgeRow>,
) -> Result<InsightRecord> {
    let total_pages = nodes.len();
    let total_links = edges.len();
    let mut ranked: Vec<&LinkNodeRow> = nodes.rows().iter().collect();
    ranked.sort_by(|a, b| b.pagerank.total_cmp(&a.pagerank));
    let top_pages = ranked
        .iter()
        .take(3)
        .map(|r| normalize_url(&r.url))
        .collect::<Vec<_>>()
        .join(", ");

    let mut insight = InsightRecord::new(
        format!(
            "Graph has {} pages, {} links. Top pages (PageRank): {}.",
            total_pages, total_links, top_pages
        ),
        "Pages with higher PageRank are considered more important internally.",
        "Ensure important pages are linked often and early in navigation.",
    );
    if (total_links as f64) / (total_pages.max(1) as f64) < MIN_LINKS_PER_PAGE {
        insight.flag(
            Severity::Medium,
            "Low average internal links per page (site may be poorly connected).",
        );
    }
    Ok(insight)
}

pub fn interpret_robots(table: &ReportTable<RobotsRecord>) -> Result<InsightRecord> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in table.rows() {
        let directive = record.directive.trim().to_lowercase();
        if !directive.is_empty() {
            *counts.entry(directive).or_default() += 1;
        }
    }

    let parts = counts
        .iter()
        .map(|(directive, count)| format!("{} {}", count, directive))
        .collect::<Vec<_>>()
        .join(", ");

    let mut insight = InsightRecord::new(
        format!("robots.txt contains {} directives: {}", table.len(), parts),
        "robots.txt provides directives such as which user-agents are allowed or disallowed, and where the sitemap is located.",
        "User-agent directives define which bots rules apply to. Without them, other directives might apply to nobody or be ambiguous.",
    );
    if !counts.keys().any(|d| d.contains("user-agent")) {
        insight.flag(
            Severity::Medium,
            "No 'User-agent' directives: robots.txt may be malformed or ambiguous.",
        );
    }
    if !counts.keys().any(|d| d.contains("sitemap")) {
        insight.flag(Severity::Low, "No sitemap reference found in robots.txt.");
    }
    Ok(insight)
}

pub fn interpret_rendering_mode(table: &ReportTable<RenderingRow>) -> Result<InsightRecord> {
    let row = table
        .rows()
        .first()
        .ok_or_else(|| AuditError::Rule("rendering table has no rows".to_string()))?;

    let mut insight = InsightRecord::new(
        format!("Rendering mode detected: {}", row.rendering_mode.label()),
        "This describes whether the site delivers HTML directly (SSR) or builds it in-browser (CSR).",
        format!(
            "Text length: {}, Script count: {}",
            row.text_length, row.script_count
        ),
    );
    match row.rendering_mode {
        RenderingMode::ClientSide => insight.flag(
            Severity::High,
            "Site appears to be client-side rendered. Crawlers may miss content without JS execution.",
        ),
        RenderingMode::PossiblyClientSide => insight.flag(
            Severity::Medium,
            "Site may be client-side rendered: a noscript fallback is present. Verify content is in the initial HTML.",
        ),
        RenderingMode::ServerSide => {}
    }
    Ok(insight)
}

pub fn interpret_schema(table: &ReportTable<SchemaRow>) -> Result<InsightRecord> {
    let row = table
        .rows()
        .first()
        .ok_or_else(|| AuditError::Rule("schema table has no rows".to_string()))?;

    if !row.schema_present {
        let mut insight = InsightRecord::new(
            "No schema.org structured data detected on the homepage.".to_string(),
            "Structured data can help search engines understand your content.",
            "",
        );
        insight.flag(Severity::Low, "No schema.org data found.");
        return Ok(insight);
    }

    let types = row.schema_types.join(", ");
    Ok(InsightRecord::new(
        format!("Schema.org structured data detected: {}", types),
        "Structured data helps enhance visibility in search features.",
        format!("Schema types: {}", types),
    ))
}

fn share(part: usize, total: usize) -> f64 {
    part as f64 / total.max(1) as f64
}

pub fn interpret_ngrams(
    table: &ReportTable<NgramRow>,
    n: usize,
    context: &InsightContext,
) -> Result<InsightRecord> {
    let rows = table.rows();
    let total_occurrences: usize = rows.iter().map(|r| r.abs_freq).sum();
    let mut ranked: Vec<&NgramRow> = rows.iter().collect();
    ranked.sort_by(|a, b| b.abs_freq.cmp(&a.abs_freq).then_with(|| a.ngram.cmp(&b.ngram)));
    let top: Vec<&NgramRow> = ranked.iter().take(context.top_k).copied().collect();

    let brand = context
        .brand_token
        .as_deref()
        .map(|b| b.trim().to_lowercase())
        .filter(|b| !b.is_empty())
        .or_else(|| {
            ranked
                .first()
                .and_then(|r| r.ngram.split_whitespace().next())
                .map(str::to_string)
        });

    let symbol_occurrences: usize = rows
        .iter()
        .filter(|r| r.ngram.split_whitespace().any(is_symbol_token))
        .map(|r| r.abs_freq)
        .sum();
    let brand_occurrences: usize = brand.as_deref().map_or(0, |brand| {
        rows.iter()
            .filter(|r| {
                r.ngram
                    .split_whitespace()
                    .any(|word| word.eq_ignore_ascii_case(brand))
            })
            .map(|r| r.abs_freq)
            .sum()
    });

    let unit = if n == 1 { "words" } else { "phrases" };
    let details = format!(
        "Top examples: {}",
        top.iter()
            .map(|r| format!("{} ({})", r.ngram, r.abs_freq))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut insight = InsightRecord::new(
        format!(
            "Found {} unique {}-grams, {} total occurrences.",
            rows.len(),
            n,
            total_occurrences
        ),
        format!("{}-grams show the site's most frequent {}.", n, unit),
        details,
    );

    if share(symbol_occurrences, total_occurrences) > SYMBOL_SHARE_THRESHOLD {
        insight.flag(
            Severity::Low,
            "Separator symbols like |, & or - dominate top n-grams: content extraction may include layout artifacts.",
        );
    }
    if share(brand_occurrences, total_occurrences) > BRAND_SHARE_THRESHOLD {
        insight.flag(
            Severity::Low,
            "Brand name dominates content: topical variety is limited.",
        );
    }
    let legal_in_top = top.iter().any(|r| {
        r.ngram
            .split_whitespace()
            .any(|word| LEGAL_TERMS.contains(&word))
    });
    if legal_in_top {
        insight.flag(
            Severity::Info,
            "Legal boilerplate (privacy/terms/policy) appears frequently: may overshadow topical content.",
        );
    }
    Ok(insight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_names_round_trip() {
        for dimension in Dimension::ALL {
            assert_eq!(Dimension::from_name(dimension.name()), Some(dimension));
        }
        assert_eq!(Dimension::SitemapVsCrawl.title(), "Sitemap vs Crawl");
    }

    #[test]
    fn test_red_flag_display() {
        let flag = RedFlag::new(Severity::High, "Broken");
        assert_eq!(flag.to_string(), "[HIGH] Broken");
    }
}
