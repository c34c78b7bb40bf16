// Tests for report assembly, scoring and output

use sitelens_core::insights::{Dimension, Severity};
use sitelens_core::model::{PageRecord, PageStore, SitemapStore};
use sitelens_core::reconcile::reconcile;
use sitelens_core::report::{
    AssembleOptions, AuditTables, JobContext, ReportFormat, ScorePolicy, assemble, compute_score,
    generate_json_report, generate_text_report, save_report,
};
use sitelens_core::reporters::{report_headings, report_meta, report_status_codes};
use sitelens_core::table::ReportTable;
use tempfile::TempDir;

fn job() -> JobContext {
    JobContext::new("job-1", "Acme", "https://a.com/")
}

fn sample_tables() -> (AuditTables, usize) {
    let mut broken = PageRecord::new("https://a.com/missing");
    broken.status = Some(404);
    let mut home = PageRecord::new("https://a.com/");
    home.title = Some("Acme".to_string());
    home.status = Some(200);
    let pages = PageStore::new(vec![home, broken]);

    let tables = AuditTables {
        meta: report_meta(&pages),
        headings: report_headings(&pages),
        status: report_status_codes(&pages),
        reconciliation: reconcile(&pages, &SitemapStore::default()),
        ..AuditTables::default()
    };
    (tables, pages.len())
}

// ============================================================================
// Scoring
// ============================================================================

#[test]
fn test_compute_score() {
    assert_eq!(compute_score(0), 100);
    assert_eq!(compute_score(1), 85);
    assert_eq!(compute_score(6), 10);
    assert_eq!(compute_score(7), 0);
    assert_eq!(compute_score(usize::MAX), 0);
}

#[test]
fn test_score_matches_red_flag_count() {
    let (tables, page_count) = sample_tables();
    let report = assemble(job(), &tables, page_count, &AssembleOptions::default());

    let flags: usize = report.sections.iter().map(|s| s.insight.red_flags.len()).sum();
    assert!(flags > 0);
    assert_eq!(report.total_issues, flags);
    assert_eq!(report.score, compute_score(flags));
    assert!(report.score <= 100);
}

#[test]
fn test_empty_run_scores_by_policy() {
    let tables = AuditTables::default();

    let clean = assemble(job(), &tables, 0, &AssembleOptions::default());
    assert_eq!(clean.score, 100);
    assert_eq!(clean.total_issues, 0);
    assert_eq!(clean.score_policy, ScorePolicy::NoDataIsClean);

    let options = AssembleOptions {
        score_policy: ScorePolicy::NoDataIsFailure,
        ..AssembleOptions::default()
    };
    let failed = assemble(job(), &tables, 0, &options);
    assert_eq!(failed.score, 0);
    assert_eq!(failed.total_issues, 0);
}

#[test]
fn test_failure_policy_does_not_affect_runs_with_pages() {
    let (tables, page_count) = sample_tables();
    let options = AssembleOptions {
        score_policy: ScorePolicy::NoDataIsFailure,
        ..AssembleOptions::default()
    };

    let report = assemble(job(), &tables, page_count, &options);
    assert_eq!(report.score, compute_score(report.total_issues));
}

#[test]
fn test_score_policy_names() {
    assert_eq!(ScorePolicy::from_str("clean"), Some(ScorePolicy::NoDataIsClean));
    assert_eq!(ScorePolicy::from_str("failure"), Some(ScorePolicy::NoDataIsFailure));
    assert_eq!(ScorePolicy::from_str("lenient"), None);
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::Text.extension(), "txt");
}

// ============================================================================
// Assembly
// ============================================================================

#[test]
fn test_sections_follow_fixed_order() {
    let report = assemble(job(), &AuditTables::default(), 0, &AssembleOptions::default());

    let order: Vec<Dimension> = report.sections.iter().map(|s| s.dimension).collect();
    assert_eq!(order, Dimension::ALL.to_vec());
    assert!(report.sections.iter().all(|s| s.preview.is_none()));
    assert!(
        report
            .sections
            .iter()
            .all(|s| s.insight.summary.starts_with("No data was collected"))
    );
}

#[test]
fn test_preview_is_bounded() {
    let pages = PageStore::new(
        (0..12)
            .map(|i| PageRecord::new(format!("https://a.com/{}", i)))
            .collect(),
    );
    let tables = AuditTables {
        meta: report_meta(&pages),
        ..AuditTables::default()
    };
    let options = AssembleOptions {
        preview_rows: 3,
        ..AssembleOptions::default()
    };

    let report = assemble(job(), &tables, pages.len(), &options);
    let preview = report
        .section(Dimension::Meta)
        .and_then(|s| s.preview.as_ref())
        .unwrap();

    assert_eq!(preview.rows.len(), 3);
    assert_eq!(preview.total_rows, 12);
    assert!(preview.is_truncated());
}

#[test]
fn test_unavailable_reason_is_carried() {
    let tables = AuditTables {
        robots: ReportTable::unavailable("robots.txt unavailable"),
        ..AuditTables::default()
    };

    let report = assemble(job(), &tables, 0, &AssembleOptions::default());
    let robots = report.section(Dimension::Robots).unwrap();

    assert_eq!(robots.unavailable.as_deref(), Some("robots.txt unavailable"));
    assert!(robots.insight.red_flags.is_empty());
}

#[test]
fn test_overview_and_severity_counts() {
    let (tables, page_count) = sample_tables();
    let report = assemble(job(), &tables, page_count, &AssembleOptions::default());

    assert_eq!(report.overview.total_crawled, 2);
    assert_eq!(report.overview.missing_titles, 1);
    assert_eq!(report.overview.uncatalogued_pages, 2);

    let counts = report.severity_counts();
    assert_eq!(
        counts.critical + counts.high + counts.medium + counts.low + counts.info,
        report.total_issues
    );
    assert!(
        report
            .section(Dimension::Status)
            .unwrap()
            .insight
            .red_flags
            .iter()
            .any(|f| f.severity == Severity::High)
    );
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_text_report_contents() {
    let (tables, page_count) = sample_tables();
    let report = assemble(job(), &tables, page_count, &AssembleOptions::default());
    let text = generate_text_report(&report);

    assert!(text.contains("SITELENS SEO AUDIT REPORT"));
    assert!(text.contains("Job ID:       job-1"));
    assert!(text.contains(&format!("Score:        {}/100", report.score)));
    assert!(text.contains("SITEMAP VS CRAWL"));
    assert!(text.contains("[HIGH] Presence of 4xx errors (broken links)."));
    assert!(text.contains("End of Report"));
}

#[test]
fn test_json_report_structure() {
    let (tables, page_count) = sample_tables();
    let report = assemble(job(), &tables, page_count, &AssembleOptions::default());

    let json = generate_json_report(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["report"]["summary"]["score"], report.score);
    assert_eq!(value["report"]["job"]["customer"], "Acme");
    assert_eq!(value["report"]["sections"].as_array().unwrap().len(), 14);
    assert_eq!(value["report"]["sections"][0]["dimension"], "RenderingMode");
}

#[test]
fn test_save_report() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.txt");

    save_report("hello", &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
}
