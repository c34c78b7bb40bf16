// Report assembly and console/JSON rendering

use crate::entry_page::{RenderingRow, SchemaRow};
use crate::insights::{
    Dimension, InsightContext, InsightRecord, Severity, interpret, interpret_canonicals,
    interpret_headings, interpret_internal_links, interpret_meta, interpret_ngrams,
    interpret_redirects, interpret_rendering_mode, interpret_robots, interpret_schema,
    interpret_sitemap_vs_crawl, interpret_status, interpret_url_structure,
};
use crate::link_graph::{LinkEdgeRow, LinkNodeRow};
use crate::model::RobotsRecord;
use crate::ngrams::NgramRow;
use crate::reconcile::ReconciliationRow;
use crate::reporters::{
    CanonicalRow, HeadingsRow, MetaRow, RedirectRow, StatusRow, UrlStructureRow,
};
use crate::table::{Cell, ReportTable, Row, TablePreview, count_where};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const DEFAULT_PREVIEW_ROWS: usize = 5;
pub const BASE_SCORE: usize = 100;
pub const PENALTY_PER_ISSUE: usize = 15;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────\n";
const MAX_CELL_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// How a run without any crawled pages is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// Zero red flags, so the base score stands.
    #[default]
    NoDataIsClean,
    /// An empty crawl scores zero.
    NoDataIsFailure,
}

impl ScorePolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clean" | "no-data-is-clean" => Some(ScorePolicy::NoDataIsClean),
            "failure" | "fail" | "no-data-is-failure" => Some(ScorePolicy::NoDataIsFailure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScorePolicy::NoDataIsClean => "clean",
            ScorePolicy::NoDataIsFailure => "failure",
        }
    }
}

/// Identifies the audit job a report belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobContext {
    pub job_id: String,
    pub customer: String,
    pub target_url: String,
}

impl JobContext {
    pub fn new(
        job_id: impl Into<String>,
        customer: impl Into<String>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            customer: customer.into(),
            target_url: target_url.into(),
        }
    }

    /// Context for a run that is not tracked in an [`crate::AuditStore`].
    pub fn detached(customer: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), customer, target_url)
    }
}

/// Every table produced by one audit run.
#[derive(Debug, Clone, Default)]
pub struct AuditTables {
    pub rendering: ReportTable<RenderingRow>,
    pub robots: ReportTable<RobotsRecord>,
    pub meta: ReportTable<MetaRow>,
    pub headings: ReportTable<HeadingsRow>,
    pub schema: ReportTable<SchemaRow>,
    pub canonicals: ReportTable<CanonicalRow>,
    pub status: ReportTable<StatusRow>,
    pub reconciliation: ReportTable<ReconciliationRow>,
    pub url_structure: ReportTable<UrlStructureRow>,
    pub redirects: ReportTable<RedirectRow>,
    pub link_nodes: ReportTable<LinkNodeRow>,
    pub link_edges: ReportTable<LinkEdgeRow>,
    pub ngrams_1: ReportTable<NgramRow>,
    pub ngrams_2: ReportTable<NgramRow>,
    pub ngrams_3: ReportTable<NgramRow>,
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub preview_rows: usize,
    pub score_policy: ScorePolicy,
    pub context: InsightContext,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
            score_policy: ScorePolicy::default(),
            context: InsightContext::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub dimension: Dimension,
    pub title: String,
    pub insight: InsightRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<TablePreview>,
    /// Set when the table was substituted because its reporter could not run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditOverview {
    pub total_crawled: usize,
    pub sitemap_urls: usize,
    pub missing_titles: usize,
    pub missing_descriptions: usize,
    pub multiple_h1s: usize,
    pub missing_canonicals: usize,
    pub orphaned_pages: usize,
    pub uncatalogued_pages: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub job: JobContext,
    pub generated_at: DateTime<Utc>,
    pub score: u32,
    pub total_issues: usize,
    pub score_policy: ScorePolicy,
    pub overview: AuditOverview,
    pub sections: Vec<ReportSection>,
}

impl AuditReport {
    pub fn section(&self, dimension: Dimension) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.dimension == dimension)
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for flag in self.sections.iter().flat_map(|s| &s.insight.red_flags) {
            match flag.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }
}

/// `max(0, 100 - 15 * issues)`.
pub fn compute_score(total_issues: usize) -> u32 {
    BASE_SCORE.saturating_sub(PENALTY_PER_ISSUE.saturating_mul(total_issues)) as u32
}

fn section<R, F>(
    dimension: Dimension,
    table: &ReportTable<R>,
    preview_rows: usize,
    rule: F,
) -> ReportSection
where
    R: Row,
    F: FnOnce(&ReportTable<R>) -> crate::error::Result<InsightRecord>,
{
    ReportSection {
        dimension,
        title: dimension.title(),
        insight: interpret(dimension, table, rule),
        preview: (!table.is_empty()).then(|| table.head(preview_rows)),
        unavailable: table.unavailable_reason().map(String::from),
    }
}

fn build_overview(tables: &AuditTables, page_count: usize) -> AuditOverview {
    let reconciliation = tables.reconciliation.rows();
    AuditOverview {
        total_crawled: page_count,
        sitemap_urls: count_where(reconciliation, |r| r.in_sitemap),
        missing_titles: count_where(tables.meta.rows(), |r| r.title_missing),
        missing_descriptions: count_where(tables.meta.rows(), |r| r.description_missing),
        multiple_h1s: count_where(tables.headings.rows(), |r| r.multiple_h1),
        missing_canonicals: count_where(tables.canonicals.rows(), |r| r.canonical_missing),
        orphaned_pages: count_where(reconciliation, |r| r.orphaned),
        uncatalogued_pages: count_where(reconciliation, |r| r.uncatalogued),
    }
}

/// Interpret every dimension in fixed order and score the run.
pub fn assemble(
    job: JobContext,
    tables: &AuditTables,
    page_count: usize,
    options: &AssembleOptions,
) -> AuditReport {
    info!("Starting insight generation and report assembly...");
    let n = options.preview_rows;
    let ctx = &options.context;

    let sections: Vec<ReportSection> = Dimension::ALL
        .into_iter()
        .map(|dimension| match dimension {
            Dimension::RenderingMode => {
                section(dimension, &tables.rendering, n, interpret_rendering_mode)
            }
            Dimension::Robots => section(dimension, &tables.robots, n, interpret_robots),
            Dimension::Meta => section(dimension, &tables.meta, n, interpret_meta),
            Dimension::Headings => section(dimension, &tables.headings, n, interpret_headings),
            Dimension::SchemaCheck => section(dimension, &tables.schema, n, interpret_schema),
            Dimension::Canonicals => {
                section(dimension, &tables.canonicals, n, interpret_canonicals)
            }
            Dimension::Status => section(dimension, &tables.status, n, interpret_status),
            Dimension::SitemapVsCrawl => {
                section(dimension, &tables.reconciliation, n, interpret_sitemap_vs_crawl)
            }
            Dimension::UrlStructure => {
                section(dimension, &tables.url_structure, n, interpret_url_structure)
            }
            Dimension::Redirects => section(dimension, &tables.redirects, n, interpret_redirects),
            Dimension::InternalLinks => section(dimension, &tables.link_nodes, n, |nodes| {
                interpret_internal_links(nodes, &tables.link_edges)
            }),
            Dimension::Ngrams1 => section(dimension, &tables.ngrams_1, n, |t| {
                interpret_ngrams(t, 1, ctx)
            }),
            Dimension::Ngrams2 => section(dimension, &tables.ngrams_2, n, |t| {
                interpret_ngrams(t, 2, ctx)
            }),
            Dimension::Ngrams3 => section(dimension, &tables.ngrams_3, n, |t| {
                interpret_ngrams(t, 3, ctx)
            }),
        })
        .collect();

    let total_issues: usize = sections.iter().map(|s| s.insight.red_flags.len()).sum();
    let score = match options.score_policy {
        ScorePolicy::NoDataIsFailure if page_count == 0 => 0,
        _ => compute_score(total_issues),
    };

    info!(
        "Report assembled: {} sections, {} issues, score {}",
        sections.len(),
        total_issues,
        score
    );

    AuditReport {
        job,
        generated_at: Utc::now(),
        score,
        total_issues,
        score_policy: options.score_policy,
        overview: build_overview(tables, page_count),
        sections,
    }
}

fn banner(report: &mut String, heading: &str) {
    report.push_str(RULE);
    report.push_str(heading);
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
}

pub fn generate_text_report(data: &AuditReport) -> String {
    let mut report = String::new();

    // Header
    report.push_str(RULE);
    report.push_str("                          SITELENS SEO AUDIT REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Job ID:       {}\n", data.job.job_id));
    report.push_str(&format!("Customer:     {}\n", data.job.customer));
    report.push_str(&format!("Target:       {}\n", data.job.target_url));
    report.push_str(&format!(
        "Generated:    {}\n",
        data.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!("Score:        {}/100\n", data.score));
    report.push_str(&format!("Red Flags:    {}\n", data.total_issues));
    report.push('\n');

    banner(&mut report, "OVERVIEW");
    let o = &data.overview;
    report.push_str(&format!("  Pages crawled:         {}\n", o.total_crawled));
    report.push_str(&format!("  Sitemap URLs:          {}\n", o.sitemap_urls));
    report.push_str(&format!("  Missing titles:        {}\n", o.missing_titles));
    report.push_str(&format!("  Missing descriptions:  {}\n", o.missing_descriptions));
    report.push_str(&format!("  Multiple H1s:          {}\n", o.multiple_h1s));
    report.push_str(&format!("  Missing canonicals:    {}\n", o.missing_canonicals));
    report.push_str(&format!("  Orphaned pages:        {}\n", o.orphaned_pages));
    report.push_str(&format!("  Uncatalogued pages:    {}\n", o.uncatalogued_pages));
    report.push('\n');

    let counts = data.severity_counts();
    if data.total_issues > 0 {
        if counts.critical > 0 {
            report.push_str(&format!("  [CRITICAL] {}  (Immediate action required)\n", counts.critical));
        }
        if counts.high > 0 {
            report.push_str(&format!("  [HIGH]     {}  (High priority)\n", counts.high));
        }
        if counts.medium > 0 {
            report.push_str(&format!("  [MEDIUM]   {}  (Should be addressed)\n", counts.medium));
        }
        if counts.low > 0 {
            report.push_str(&format!("  [LOW]      {}  (Minor issues)\n", counts.low));
        }
        if counts.info > 0 {
            report.push_str(&format!("  [INFO]     {}  (Informational)\n", counts.info));
        }
        report.push('\n');
    }

    for section in &data.sections {
        banner(&mut report, &section.title.to_uppercase());

        report.push_str("Summary:\n");
        report.push_str(&wrap_text(&section.insight.summary, 80, "  "));
        if !section.insight.meaning.is_empty() {
            report.push_str("\nPurpose:\n");
            report.push_str(&wrap_text(&section.insight.meaning, 80, "  "));
        }
        if !section.insight.details.is_empty() {
            report.push_str("\nDetails:\n");
            report.push_str(&wrap_text(&section.insight.details, 80, "  "));
        }
        if let Some(ref reason) = section.unavailable {
            report.push_str("\nUnavailable:\n");
            report.push_str(&wrap_text(reason, 80, "  "));
        }
        if !section.insight.red_flags.is_empty() {
            report.push_str("\nRed Flags:\n");
            for flag in &section.insight.red_flags {
                report.push_str(&wrap_text(&flag.to_string(), 80, "  ! "));
            }
        }
        if let Some(ref preview) = section.preview {
            report.push_str("\nData Preview:\n");
            report.push_str(&format_preview(preview));
        }
        report.push('\n');
        report.push_str(THIN_RULE);
        report.push('\n');
    }

    // Footer
    report.push_str(RULE);
    report.push_str("                                End of Report\n");
    report.push_str(RULE);
    report.push_str("\nGenerated by Sitelens - SEO crawl analysis and insight engine\n\n");

    report
}

pub fn generate_json_report(data: &AuditReport) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Sitelens",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": data.generated_at.to_rfc3339(),
                "format": "json"
            },
            "job": data.job,
            "summary": {
                "score": data.score,
                "total_issues": data.total_issues,
                "score_policy": data.score_policy,
                "severity_breakdown": data.severity_counts(),
                "overview": data.overview
            },
            "sections": data.sections
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn truncate_cell(cell: &Cell) -> String {
    let text = cell.to_string();
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

fn format_preview(preview: &TablePreview) -> String {
    let mut result = String::new();
    result.push_str(&format!("  {}\n", preview.columns.join(" | ")));
    for row in &preview.rows {
        let cells: Vec<String> = row.iter().map(truncate_cell).collect();
        result.push_str(&format!("  {}\n", cells.join(" | ")));
    }
    if preview.is_truncated() {
        result.push_str(&format!(
            "  ... {} of {} rows shown\n",
            preview.rows.len(),
            preview.total_rows
        ));
    }
    result
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width - indent.len() && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}
