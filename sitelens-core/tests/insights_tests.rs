// Tests for the insight rule engine

use regex::Regex;
use sitelens_core::AuditError;
use sitelens_core::entry_page::check_rendering_mode;
use sitelens_core::insights::{
    Dimension, InsightContext, InsightRecord, Severity, interpret, interpret_internal_links,
    interpret_meta, interpret_ngrams, interpret_redirects, interpret_rendering_mode,
    interpret_robots, interpret_sitemap_vs_crawl, interpret_status, interpret_url_structure,
};
use sitelens_core::link_graph::build_graph;
use sitelens_core::model::{
    OutboundLink, PageRecord, PageStore, RobotsRecord, SitemapStore,
};
use sitelens_core::ngrams::NgramRow;
use sitelens_core::reconcile::reconcile;
use sitelens_core::reporters::{
    MetaRow, report_meta, report_redirects, report_status_codes, report_url_structure,
};
use sitelens_core::table::ReportTable;

fn messages(insight: &InsightRecord) -> Vec<&str> {
    insight.red_flags.iter().map(|f| f.message.as_str()).collect()
}

fn ngram(phrase: &str, freq: usize) -> NgramRow {
    NgramRow {
        ngram: phrase.to_string(),
        abs_freq: freq,
    }
}

// ============================================================================
// Neutral fallbacks
// ============================================================================

#[test]
fn test_empty_table_gives_no_data_insight() {
    let table: ReportTable<MetaRow> = ReportTable::empty();
    let insight = interpret(Dimension::Meta, &table, interpret_meta);

    assert_eq!(insight.summary, "No data was collected for Meta.");
    assert!(insight.red_flags.is_empty());
}

#[test]
fn test_rule_error_gives_not_generated_insight() {
    let table = report_meta(&PageStore::new(vec![PageRecord::new("https://a.com/")]));
    let insight = interpret(Dimension::Meta, &table, |_| {
        Err(AuditError::Rule("division by zero".to_string()))
    });

    assert_eq!(insight.summary, "Meta insights could not be generated.");
    assert!(insight.red_flags.is_empty());
}

#[test]
fn test_rule_panic_gives_not_generated_insight() {
    let table = report_meta(&PageStore::new(vec![PageRecord::new("https://a.com/")]));
    let insight = interpret(Dimension::Headings, &table, |_| panic!("bad rule"));

    assert_eq!(insight.summary, "Headings insights could not be generated.");
}

// ============================================================================
// Page-level rules
// ============================================================================

#[test]
fn test_single_page_with_empty_title() {
    let mut page = PageRecord::new("https://a.com/");
    page.title = Some(String::new());
    page.status = Some(200);
    let pages = PageStore::new(vec![page]);

    let meta = interpret(Dimension::Meta, &report_meta(&pages), interpret_meta);
    assert!(meta.summary.contains("1 missing titles"));
    assert!(messages(&meta).contains(&"1 pages missing titles (should be 0)."));
    assert_eq!(meta.red_flags[0].severity, Severity::High);

    let reconciliation = reconcile(&pages, &SitemapStore::default());
    let sitemap = interpret(
        Dimension::SitemapVsCrawl,
        &reconciliation,
        interpret_sitemap_vs_crawl,
    );
    assert!(sitemap.summary.contains("0 orphaned, 1 uncatalogued"));
    assert_eq!(messages(&sitemap), vec!["1 uncatalogued pages found."]);
}

#[test]
fn test_status_flags_client_and_server_errors() {
    let pages = PageStore::new(
        [(1, 200), (2, 200), (3, 404), (4, 503)]
            .into_iter()
            .map(|(i, code)| {
                let mut page = PageRecord::new(format!("https://a.com/{}", i));
                page.status = Some(code);
                page
            })
            .collect(),
    );

    let insight = interpret(Dimension::Status, &report_status_codes(&pages), interpret_status);

    assert!(insight.summary.contains("200: 2"));
    let severities: Vec<Severity> = insight.red_flags.iter().map(|f| f.severity).collect();
    assert_eq!(severities, vec![Severity::High, Severity::Critical]);
}

#[test]
fn test_url_structure_flags_deep_and_long_urls() {
    let deep = format!("https://a.com/a/b/c/d/e/f/{}", "x".repeat(90));
    let pages = PageStore::new(vec![PageRecord::new(deep)]);

    let insight = interpret(
        Dimension::UrlStructure,
        &report_url_structure(&pages),
        interpret_url_structure,
    );

    assert_eq!(insight.red_flags.len(), 2);
}

#[test]
fn test_long_redirect_chain_is_flagged() {
    let mut page = PageRecord::new("https://a.com/c");
    page.redirect_urls = Some(vec![
        "https://a.com/a".to_string(),
        "https://a.com/b".to_string(),
    ]);
    let table = report_redirects(&PageStore::new(vec![page]));

    let insight = interpret(Dimension::Redirects, &table, interpret_redirects);

    assert_eq!(
        messages(&insight),
        vec!["Long redirect chain detected (length 3)."]
    );
}

#[test]
fn test_short_redirect_chain_is_not_flagged() {
    let mut page = PageRecord::new("https://a.com/b");
    page.redirect_urls = Some(vec!["https://a.com/a".to_string()]);
    let table = report_redirects(&PageStore::new(vec![page]));

    let insight = interpret(Dimension::Redirects, &table, interpret_redirects);

    assert!(insight.red_flags.is_empty());
}

// ============================================================================
// Site-level rules
// ============================================================================

#[test]
fn test_poorly_connected_graph_is_flagged() {
    let mut a = PageRecord::new("https://a.com/a");
    a.outbound_links = vec![OutboundLink {
        target: "/b".to_string(),
        anchor_text: None,
        nofollow: false,
    }];
    let mut b = PageRecord::new("https://a.com/b");
    b.outbound_links = vec![OutboundLink {
        target: "/a".to_string(),
        anchor_text: None,
        nofollow: true,
    }];
    let pattern = Regex::new(r"a\.com").unwrap();
    let graph = build_graph(&PageStore::new(vec![a, b]), &pattern, None).unwrap();

    let insight = interpret(Dimension::InternalLinks, &graph.nodes, |nodes| {
        interpret_internal_links(nodes, &graph.edges)
    });

    assert!(insight.summary.contains("2 pages, 2 links"));
    assert_eq!(
        messages(&insight),
        vec!["Low average internal links per page (site may be poorly connected)."]
    );
}

#[test]
fn test_robots_without_user_agent_or_sitemap() {
    let table = ReportTable::new(vec![RobotsRecord::new("Disallow", "/admin")]);
    let insight = interpret(Dimension::Robots, &table, interpret_robots);
    assert_eq!(insight.red_flags.len(), 2);

    let table = ReportTable::new(vec![
        RobotsRecord::new("User-agent", "*"),
        RobotsRecord::new("Sitemap", "https://a.com/sitemap.xml"),
    ]);
    let insight = interpret(Dimension::Robots, &table, interpret_robots);
    assert!(insight.red_flags.is_empty());
}

#[test]
fn test_client_rendered_entry_page_is_flagged() {
    let html = format!(
        "<html><body>{}</body></html>",
        "<script src=\"/chunk.js\"></script>".repeat(30)
    );
    let table = check_rendering_mode("https://a.com/", &html).unwrap();

    let insight = interpret(Dimension::RenderingMode, &table, interpret_rendering_mode);

    assert_eq!(insight.red_flags.len(), 1);
    assert_eq!(insight.red_flags[0].severity, Severity::High);
}

#[test]
fn test_noscript_entry_page_is_flagged_as_possibly_client_rendered() {
    let html = r#"<html><body><noscript>Please enable JavaScript.</noscript><div id="app"></div></body></html>"#;
    let table = check_rendering_mode("https://a.com/", html).unwrap();

    let insight = interpret(Dimension::RenderingMode, &table, interpret_rendering_mode);

    assert!(insight.summary.contains("Possibly Client-Side Rendered"));
    assert_eq!(insight.red_flags.len(), 1);
    assert_eq!(insight.red_flags[0].severity, Severity::Medium);
}

#[test]
fn test_server_rendered_entry_page_has_no_flag() {
    let html = format!("<html><body><p>{}</p></body></html>", "Plenty of text. ".repeat(30));
    let table = check_rendering_mode("https://a.com/", &html).unwrap();

    let insight = interpret(Dimension::RenderingMode, &table, interpret_rendering_mode);

    assert!(insight.red_flags.is_empty());
}

// ============================================================================
// N-gram rules
// ============================================================================

#[test]
fn test_brand_dominance_is_flagged() {
    let table = ReportTable::new(vec![
        ngram("brandx", 40),
        ngram("shoes", 20),
        ngram("boots", 20),
        ngram("socks", 20),
    ]);
    let context = InsightContext {
        brand_token: Some("brandx".to_string()),
        ..InsightContext::default()
    };

    let insight = interpret(Dimension::Ngrams1, &table, |t| interpret_ngrams(t, 1, &context));

    assert!(
        messages(&insight).contains(&"Brand name dominates content: topical variety is limited.")
    );
}

#[test]
fn test_brand_falls_back_to_top_unigram() {
    let table = ReportTable::new(vec![ngram("acme", 5), ngram("tools", 3), ngram("garden", 2)]);

    let insight = interpret(Dimension::Ngrams1, &table, |t| {
        interpret_ngrams(t, 1, &InsightContext::default())
    });

    assert!(insight.red_flags.iter().any(|f| f.message.starts_with("Brand name dominates")));
}

#[test]
fn test_symbol_noise_and_legal_boilerplate() {
    let table = ReportTable::new(vec![
        ngram("shoes | acme", 3),
        ngram("privacy policy", 2),
        ngram("running shoes", 5),
        ngram("trail shoes", 5),
        ngram("road shoes", 5),
    ]);
    let context = InsightContext {
        brand_token: Some("zzz".to_string()),
        ..InsightContext::default()
    };

    let insight = interpret(Dimension::Ngrams2, &table, |t| interpret_ngrams(t, 2, &context));
    let severities: Vec<Severity> = insight.red_flags.iter().map(|f| f.severity).collect();

    assert_eq!(severities, vec![Severity::Low, Severity::Info]);
}

#[test]
fn test_balanced_ngrams_have_no_flags() {
    let table = ReportTable::new(
        (0..10)
            .map(|i| ngram(&format!("topic{}", i), 10))
            .collect(),
    );
    let context = InsightContext {
        brand_token: Some("acme".to_string()),
        ..InsightContext::default()
    };

    let insight = interpret(Dimension::Ngrams1, &table, |t| interpret_ngrams(t, 1, &context));

    assert!(insight.red_flags.is_empty());
}

#[test]
fn test_brand_matches_whole_tokens_only() {
    let table = ReportTable::new(vec![
        ngram("learn gardening", 4),
        ngram("planting seasons", 3),
        ngram("watering plants", 3),
    ]);
    let context = InsightContext {
        brand_token: Some("a".to_string()),
        ..InsightContext::default()
    };

    let insight = interpret(Dimension::Ngrams2, &table, |t| interpret_ngrams(t, 2, &context));

    assert!(insight.red_flags.is_empty());
}

#[test]
fn test_any_separator_symbol_counts_as_noise() {
    let table = ReportTable::new(vec![
        ngram("shoes - acme", 2),
        ngram("boots / acme", 2),
        ngram("running shoes", 5),
        ngram("trail boots", 5),
        ngram("road socks", 5),
    ]);
    let context = InsightContext {
        brand_token: Some("zzz".to_string()),
        ..InsightContext::default()
    };

    let insight = interpret(Dimension::Ngrams3, &table, |t| interpret_ngrams(t, 3, &context));

    assert_eq!(
        insight.red_flags.iter().map(|f| f.severity).collect::<Vec<_>>(),
        vec![Severity::Low]
    );
}
