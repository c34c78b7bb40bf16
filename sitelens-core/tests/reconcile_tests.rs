// Tests for sitemap vs crawl reconciliation

use sitelens_core::model::{PageRecord, PageStore, SitemapRecord, SitemapStore};
use sitelens_core::reconcile::{ReconciliationRow, reconcile};
use std::collections::HashSet;

fn pages(urls: &[&str]) -> PageStore {
    PageStore::new(urls.iter().map(|u| PageRecord::new(*u)).collect())
}

fn sitemap(locs: &[&str]) -> SitemapStore {
    SitemapStore::new(locs.iter().map(|l| SitemapRecord::new(*l)).collect())
}

fn find<'a>(rows: &'a [ReconciliationRow], url: &str) -> &'a ReconciliationRow {
    rows.iter()
        .find(|r| r.url == url)
        .unwrap_or_else(|| panic!("no row for {}", url))
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_single_page_without_sitemap_is_uncatalogued() {
    let table = reconcile(&pages(&["https://a.com/"]), &sitemap(&[]));

    assert_eq!(table.len(), 1);
    let row = &table.rows()[0];
    assert!(row.in_crawl);
    assert!(!row.in_sitemap);
    assert!(row.uncatalogued);
    assert!(!row.orphaned);
}

#[test]
fn test_empty_crawl_makes_every_sitemap_url_orphaned() {
    let table = reconcile(
        &pages(&[]),
        &sitemap(&["https://a.com/", "https://a.com/blog"]),
    );

    assert_eq!(table.len(), 2);
    assert!(table.rows().iter().all(|r| r.orphaned && !r.uncatalogued));
}

#[test]
fn test_mixed_membership() {
    let table = reconcile(
        &pages(&["https://a.com/", "https://a.com/about", "https://a.com/hidden"]),
        &sitemap(&["https://a.com/", "https://a.com/about/", "https://a.com/old"]),
    );
    let rows = table.rows();

    assert_eq!(rows.len(), 4);
    let about = find(rows, "https://a.com/about");
    assert!(about.in_crawl && about.in_sitemap);
    assert!(!about.orphaned && !about.uncatalogued);
    assert!(find(rows, "https://a.com/hidden").uncatalogued);
    assert!(find(rows, "https://a.com/old").orphaned);
}

#[test]
fn test_normalization_ignores_case_and_trailing_slash_only() {
    let table = reconcile(
        &pages(&["HTTPS://A.com/Shop/", "https://a.com/shop?page=2"]),
        &sitemap(&["https://a.com/shop"]),
    );
    let rows = table.rows();

    assert_eq!(rows.len(), 2);
    assert!(find(rows, "https://a.com/shop").in_sitemap);
    assert!(find(rows, "https://a.com/shop?page=2").uncatalogued);
}

#[test]
fn test_sitemap_metadata_comes_from_first_occurrence() {
    let mut first = SitemapRecord::new("https://a.com/post");
    first.lastmod = Some("2024-01-01".to_string());
    first.source_sitemap = Some("posts.xml".to_string());
    let mut second = SitemapRecord::new("https://a.com/post/");
    second.lastmod = Some("2025-06-30".to_string());
    second.source_sitemap = Some("archive.xml".to_string());

    let table = reconcile(&pages(&[]), &SitemapStore::new(vec![first, second]));

    assert_eq!(table.len(), 1);
    let row = &table.rows()[0];
    assert_eq!(row.lastmod.as_deref(), Some("2024-01-01"));
    assert_eq!(row.source_sitemap.as_deref(), Some("posts.xml"));
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_orphaned_and_uncatalogued_are_disjoint() {
    let table = reconcile(
        &pages(&["https://a.com/1", "https://a.com/2", "https://a.com/3"]),
        &sitemap(&["https://a.com/2", "https://a.com/4"]),
    );

    for row in table.rows() {
        assert!(!(row.orphaned && row.uncatalogued), "{} is both", row.url);
        assert!(row.in_crawl || row.in_sitemap, "{} is in neither", row.url);
    }
}

#[test]
fn test_reconcile_is_idempotent() {
    let crawl = pages(&["https://a.com/", "https://a.com/x", "https://a.com/y"]);
    let map = sitemap(&["https://a.com/y", "https://a.com/z"]);

    let first: HashSet<ReconciliationRow> = reconcile(&crawl, &map).into_rows().into_iter().collect();
    let second: HashSet<ReconciliationRow> = reconcile(&crawl, &map).into_rows().into_iter().collect();
    assert_eq!(first, second);
}

#[test]
fn test_column_schema_is_fixed_when_empty() {
    let table = reconcile(&pages(&[]), &sitemap(&[]));

    assert!(table.is_empty());
    assert!(!table.is_unavailable());
    assert_eq!(
        table.column_names(),
        vec!["url", "in_crawl", "in_sitemap", "orphaned", "uncatalogued", "lastmod", "sitemap"]
    );
}
