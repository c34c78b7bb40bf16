// Audit driver: stores -> reporters -> graph -> insights -> report

use crate::entry_page::{check_rendering_mode, check_schema};
use crate::error::{AuditError, Result};
use crate::insights::InsightContext;
use crate::link_graph::{LinkGraph, RedirectMap, build_graph};
use crate::model::{EntryPage, PageRecord, PageStore, RobotsRecord, SitemapRecord, SitemapStore};
use crate::ngrams::report_ngrams;
use crate::reconcile::reconcile;
use crate::report::{
    AssembleOptions, AuditReport, AuditTables, DEFAULT_PREVIEW_ROWS, JobContext, ScorePolicy,
    assemble,
};
use crate::reporters::{
    guarded, report_canonicals, report_headings, report_meta, report_redirects,
    report_status_codes, report_url_structure, safe_run, safe_run_on,
};
use crate::table::ReportTable;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Callback for reporting pipeline stage progress
pub type AuditProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Materialized collaborator output for one run.
#[derive(Debug, Clone, Default)]
pub struct AuditInputs {
    pub pages: Vec<PageRecord>,
    pub sitemap: Vec<SitemapRecord>,
    /// `None` when robots.txt could not be retrieved.
    pub robots: Option<Vec<RobotsRecord>>,
    pub entry_page: Option<EntryPage>,
}

/// Options for configuring an audit run
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub target_url: String,
    /// Regex matched against link hosts; defaults to the escaped target host.
    pub domain_pattern: Option<String>,
    pub resolve_redirects: bool,
    /// Defaults to the first non-`www` label of the target host.
    pub brand_token: Option<String>,
    pub preview_rows: usize,
    pub score_policy: ScorePolicy,
}

impl AuditOptions {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            domain_pattern: None,
            resolve_redirects: true,
            brand_token: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            score_policy: ScorePolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub report: AuditReport,
    pub tables: AuditTables,
    pub page_count: usize,
}

/// Host of `target_url`, lowercased.
pub fn target_host(target_url: &str) -> Result<String> {
    Url::parse(target_url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .ok_or_else(|| AuditError::InvalidUrl(target_url.to_string()))
}

pub fn default_domain_pattern(host: &str) -> String {
    regex::escape(host)
}

/// First host label that is not `www`, e.g. `acme` for `www.acme.co.uk`.
pub fn derive_brand_token(host: &str) -> Option<String> {
    host.split('.')
        .find(|label| !label.is_empty() && *label != "www")
        .map(str::to_lowercase)
}

fn report_progress(callback: &Option<AuditProgressCallback>, message: &str) {
    if let Some(cb) = callback {
        cb(message.to_string());
    }
}

/// Run every reporter, reconcile, build the link graph and assemble the report.
///
/// Only a page store that cannot be built aborts the run; every other
/// failure degrades to an unavailable table for that dimension.
pub fn execute_audit(
    inputs: AuditInputs,
    options: &AuditOptions,
    job: JobContext,
    progress: Option<AuditProgressCallback>,
) -> Result<AuditOutcome> {
    let AuditInputs {
        pages,
        sitemap,
        robots,
        entry_page,
    } = inputs;

    let host = target_host(&options.target_url)?;
    let pattern_source = options
        .domain_pattern
        .clone()
        .unwrap_or_else(|| default_domain_pattern(&host));
    let domain_pattern = Regex::new(&pattern_source)?;

    report_progress(&progress, "Building page store...");
    let supplied = pages.len();
    let pages = PageStore::new(pages);
    if supplied > 0 && pages.is_empty() {
        return Err(AuditError::PageStore(format!(
            "none of the {} page records carried a url",
            supplied
        )));
    }
    let sitemap = SitemapStore::new(sitemap);
    info!(
        "Audit of {} started: {} pages, {} sitemap entries",
        options.target_url,
        pages.len(),
        sitemap.len()
    );

    let entry_html = entry_page.and_then(|page| {
        let url = if page.url.trim().is_empty() {
            options.target_url.clone()
        } else {
            page.url
        };
        page.html.map(|html| (url, html))
    });
    if entry_html.is_none() {
        warn!("No entry page HTML supplied; rendering and schema checks skipped");
    }

    report_progress(&progress, "Probing entry page...");
    let rendering = safe_run_on("Rendering mode", entry_html.as_ref(), |(url, html)| {
        check_rendering_mode(url, html)
    });
    let schema = safe_run_on("Schema check", entry_html.as_ref(), |(url, html)| {
        check_schema(url, html)
    });
    let robots = match robots {
        Some(records) => ReportTable::new(records),
        None => {
            warn!("robots.txt unavailable");
            ReportTable::unavailable("robots.txt unavailable")
        }
    };

    report_progress(&progress, "Running page reporters...");
    let meta = safe_run("Meta", || Ok(report_meta(&pages)));
    let headings = safe_run("Headings", || Ok(report_headings(&pages)));
    let canonicals = safe_run("Canonicals", || Ok(report_canonicals(&pages)));
    let status = safe_run("Status codes", || Ok(report_status_codes(&pages)));
    let url_structure = safe_run("URL structure", || Ok(report_url_structure(&pages)));
    let redirects = safe_run("Redirects", || Ok(report_redirects(&pages)));

    report_progress(&progress, "Comparing sitemap and crawl...");
    let reconciliation = safe_run("Sitemap vs crawl", || Ok(reconcile(&pages, &sitemap)));

    report_progress(&progress, "Building internal link graph...");
    let redirect_map = options
        .resolve_redirects
        .then(|| RedirectMap::from_status(&status));
    let graph = guarded("Internal links", || {
        build_graph(&pages, &domain_pattern, redirect_map.as_ref())
    })
    .unwrap_or_else(|reason| LinkGraph::unavailable(reason));

    report_progress(&progress, "Mining n-grams...");
    let ngrams_1 = safe_run("Ngrams-1", || report_ngrams(&pages, 1));
    let ngrams_2 = safe_run("Ngrams-2", || report_ngrams(&pages, 2));
    let ngrams_3 = safe_run("Ngrams-3", || report_ngrams(&pages, 3));

    let brand_token = options
        .brand_token
        .clone()
        .or_else(|| derive_brand_token(&host))
        .or_else(|| ngrams_1.rows().first().map(|r| r.ngram.clone()));

    let tables = AuditTables {
        rendering,
        robots,
        meta,
        headings,
        schema,
        canonicals,
        status,
        reconciliation,
        url_structure,
        redirects,
        link_nodes: graph.nodes,
        link_edges: graph.edges,
        ngrams_1,
        ngrams_2,
        ngrams_3,
    };

    report_progress(&progress, "Interpreting results...");
    let assemble_options = AssembleOptions {
        preview_rows: options.preview_rows,
        score_policy: options.score_policy,
        context: InsightContext {
            brand_token,
            ..InsightContext::default()
        },
    };
    let page_count = pages.len();
    let report = assemble(job, &tables, page_count, &assemble_options);

    Ok(AuditOutcome {
        report,
        tables,
        page_count,
    })
}
