// Per-check reporters over the page store

use crate::error::Result;
use crate::model::{PageStore, normalize_url};
use crate::table::{Cell, Column, ReportTable, Row};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info, warn};
use url::Url;

/// Separator used when a multi-valued field is flattened into one cell.
pub const MULTI_VALUE_SEPARATOR: &str = "@@";

/// Run a reporter so that a failure never aborts the audit.
///
/// Errors and panics are logged and replaced by an empty table that keeps the
/// reporter's column schema and records why it is empty.
pub fn safe_run<R, F>(name: &str, reporter: F) -> ReportTable<R>
where
    R: Row,
    F: FnOnce() -> Result<ReportTable<R>>,
{
    match guarded(name, reporter) {
        Ok(table) => {
            if table.is_empty() {
                warn!("{} returned no data", name);
            }
            table
        }
        Err(reason) => ReportTable::unavailable(reason),
    }
}

/// Run `task`, turning an error or a panic into a logged reason string.
pub fn guarded<T, F>(name: &str, task: F) -> std::result::Result<T, String>
where
    F: FnOnce() -> Result<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("{} encountered an issue: {}. Using empty table.", name, e);
            Err(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("{} panicked: {}. Using empty table.", name, message);
            Err(message)
        }
    }
}

/// Like [`safe_run`], for reporters whose upstream input may be missing.
pub fn safe_run_on<T, R, F>(name: &str, input: Option<T>, reporter: F) -> ReportTable<R>
where
    R: Row,
    F: FnOnce(T) -> Result<ReportTable<R>>,
{
    match input {
        Some(input) => safe_run(name, || reporter(input)),
        None => {
            warn!("{} skipped: upstream input unavailable", name);
            ReportTable::unavailable("upstream input unavailable")
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

// ============================================================================
// Meta
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRow {
    pub url: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub title_length: usize,
    pub description_length: usize,
    pub title_missing: bool,
    pub description_missing: bool,
}

impl Row for MetaRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::text("title"),
        Column::text("meta_desc"),
        Column::integer("title_length"),
        Column::integer("desc_length"),
        Column::boolean("title_missing"),
        Column::boolean("description_missing"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::opt_text(self.title.as_deref()),
            Cell::opt_text(self.meta_description.as_deref()),
            Cell::Integer(self.title_length as i64),
            Cell::Integer(self.description_length as i64),
            Cell::Boolean(self.title_missing),
            Cell::Boolean(self.description_missing),
        ]
    }
}

pub fn report_meta(pages: &PageStore) -> ReportTable<MetaRow> {
    info!("Generating meta report...");
    let rows: Vec<MetaRow> = pages
        .pages()
        .iter()
        .map(|page| {
            let title = page.title.as_deref();
            let description = page.meta_description.as_deref();
            MetaRow {
                url: page.url.clone(),
                title: page.title.clone(),
                meta_description: page.meta_description.clone(),
                title_length: title.map_or(0, |t| t.chars().count()),
                description_length: description.map_or(0, |d| d.chars().count()),
                title_missing: is_blank(title),
                description_missing: is_blank(description),
            }
        })
        .collect();
    info!("Meta report generated with {} rows", rows.len());
    ReportTable::new(rows)
}

// ============================================================================
// Headings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingsRow {
    pub url: String,
    pub h1: String,
    pub h1_count: usize,
    pub missing_h1: bool,
    pub multiple_h1: bool,
}

impl Row for HeadingsRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::text("h1"),
        Column::integer("h1_count"),
        Column::boolean("missing_h1"),
        Column::boolean("multiple_h1"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::Text(self.h1.clone()),
            Cell::Integer(self.h1_count as i64),
            Cell::Boolean(self.missing_h1),
            Cell::Boolean(self.multiple_h1),
        ]
    }
}

pub fn report_headings(pages: &PageStore) -> ReportTable<HeadingsRow> {
    info!("Generating headings report...");
    let rows: Vec<HeadingsRow> = pages
        .pages()
        .iter()
        .map(|page| {
            let h1_count = page.h1.count();
            HeadingsRow {
                url: page.url.clone(),
                h1: page.h1.texts().join(MULTI_VALUE_SEPARATOR),
                h1_count,
                missing_h1: h1_count == 0,
                multiple_h1: h1_count > 1,
            }
        })
        .collect();
    info!("Headings report generated with {} rows", rows.len());
    ReportTable::new(rows)
}

// ============================================================================
// Canonicals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub url: String,
    pub canonical: Option<String>,
    pub canonical_missing: bool,
    pub self_referencing: bool,
}

impl Row for CanonicalRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::text("canonical"),
        Column::boolean("canonical_missing"),
        Column::boolean("self_referencing"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::opt_text(self.canonical.as_deref()),
            Cell::Boolean(self.canonical_missing),
            Cell::Boolean(self.self_referencing),
        ]
    }
}

pub fn report_canonicals(pages: &PageStore) -> ReportTable<CanonicalRow> {
    info!("Generating canonicals report...");
    let rows: Vec<CanonicalRow> = pages
        .pages()
        .iter()
        .map(|page| CanonicalRow {
            url: page.url.clone(),
            canonical: page.canonical.clone(),
            canonical_missing: page.canonical.is_none(),
            self_referencing: page
                .canonical
                .as_deref()
                .is_some_and(|c| normalize_url(c) == page.normalized_url()),
        })
        .collect();
    info!("Canonicals report generated with {} rows", rows.len());
    ReportTable::new(rows)
}

// ============================================================================
// Status codes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    pub url: String,
    pub status: Option<u16>,
    pub redirect_urls: Option<Vec<String>>,
    pub redirect_times: Option<u32>,
    pub redirect_reasons: Option<Vec<u16>>,
}

impl Row for StatusRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::integer("status"),
        Column::text("redirect_urls"),
        Column::integer("redirect_times"),
        Column::text("redirect_reasons"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::opt_integer(self.status.map(i64::from)),
            self.redirect_urls
                .as_ref()
                .map_or(Cell::Null, |u| Cell::Text(u.join(MULTI_VALUE_SEPARATOR))),
            Cell::opt_integer(self.redirect_times.map(i64::from)),
            self.redirect_reasons.as_ref().map_or(Cell::Null, |r| {
                Cell::Text(
                    r.iter()
                        .map(u16::to_string)
                        .collect::<Vec<_>>()
                        .join(MULTI_VALUE_SEPARATOR),
                )
            }),
        ]
    }
}

pub fn report_status_codes(pages: &PageStore) -> ReportTable<StatusRow> {
    info!("Generating status codes report...");
    let rows: Vec<StatusRow> = pages
        .pages()
        .iter()
        .map(|page| StatusRow {
            url: page.url.clone(),
            status: page.status,
            redirect_urls: page.redirect_urls.clone(),
            redirect_times: page.redirect_times,
            redirect_reasons: page.redirect_reasons.clone(),
        })
        .collect();
    info!("Status codes report generated with {} rows", rows.len());
    ReportTable::new(rows)
}

// ============================================================================
// URL structure
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlStructureRow {
    pub url: String,
    pub scheme: Option<String>,
    pub netloc: Option<String>,
    pub path: String,
    pub url_path_depth: usize,
    pub url_length: usize,
}

impl Row for UrlStructureRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::text("scheme"),
        Column::text("netloc"),
        Column::text("path"),
        Column::integer("url_path_depth"),
        Column::integer("url_length"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::opt_text(self.scheme.as_deref()),
            Cell::opt_text(self.netloc.as_deref()),
            Cell::Text(self.path.clone()),
            Cell::Integer(self.url_path_depth as i64),
            Cell::Integer(self.url_length as i64),
        ]
    }
}

/// Number of non-empty path segments.
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

pub fn report_url_structure(pages: &PageStore) -> ReportTable<UrlStructureRow> {
    info!("Generating URL structure report...");
    let rows: Vec<UrlStructureRow> = pages
        .pages()
        .iter()
        .map(|page| {
            let raw = page.url.trim();
            let (scheme, netloc, path) = match Url::parse(raw) {
                Ok(parsed) => (
                    Some(parsed.scheme().to_string()),
                    parsed.host_str().map(|h| match parsed.port() {
                        Some(port) => format!("{}:{}", h, port),
                        None => h.to_string(),
                    }),
                    parsed.path().to_string(),
                ),
                Err(_) => {
                    // Relative or malformed: treat everything before '?' as the path
                    let path = raw.split(['?', '#']).next().unwrap_or_default();
                    (None, None, path.to_string())
                }
            };
            UrlStructureRow {
                url: page.url.clone(),
                scheme,
                netloc,
                url_path_depth: path_depth(&path),
                path,
                url_length: raw.chars().count(),
            }
        })
        .collect();
    info!("URL structure report generated with {} rows", rows.len());
    ReportTable::new(rows)
}

// ============================================================================
// Redirects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HopType {
    Requested,
    Intermediate,
    Final,
}

impl HopType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HopType::Requested => "requested",
            HopType::Intermediate => "intermediate",
            HopType::Final => "final",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectRow {
    pub url: String,
    pub status: Option<u16>,
    pub order: usize,
    pub hop_type: HopType,
    pub redirect_url: Option<String>,
    /// Number of hops in the chain this row belongs to.
    pub redirect_times: usize,
}

impl Row for RedirectRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::integer("status"),
        Column::integer("order"),
        Column::text("type"),
        Column::text("redirect_url"),
        Column::integer("redirect_times"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::opt_integer(self.status.map(i64::from)),
            Cell::Integer(self.order as i64),
            Cell::Text(self.hop_type.as_str().to_string()),
            Cell::opt_text(self.redirect_url.as_deref()),
            Cell::Integer(self.redirect_times as i64),
        ]
    }
}

/// One row per URL in every redirect chain, the landing page included.
pub fn report_redirects(pages: &PageStore) -> ReportTable<RedirectRow> {
    info!("Generating redirect report...");
    let mut rows = Vec::new();
    for page in pages.pages() {
        let Some(chain) = page.redirect_chain() else {
            continue;
        };
        let hops = chain.len();
        let reasons = page.redirect_reasons.as_deref().unwrap_or_default();
        for (order, url) in chain.iter().enumerate() {
            let is_last = order + 1 == hops;
            let hop_type = if is_last {
                HopType::Final
            } else if order == 0 {
                HopType::Requested
            } else {
                HopType::Intermediate
            };
            let status = if is_last {
                page.status
            } else {
                reasons.get(order).copied()
            };
            rows.push(RedirectRow {
                url: url.to_string(),
                status,
                order,
                hop_type,
                redirect_url: chain.get(order + 1).map(|next| next.to_string()),
                redirect_times: hops,
            });
        }
    }
    info!("Redirect report generated with {} rows", rows.len());
    ReportTable::new(rows)
}
