// Sitemap vs crawl reconciliation

use crate::model::{PageStore, SitemapStore, normalize_url};
use crate::table::{Cell, Column, ReportTable, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReconciliationRow {
    pub url: String,
    pub in_crawl: bool,
    pub in_sitemap: bool,
    pub orphaned: bool,
    pub uncatalogued: bool,
    pub lastmod: Option<String>,
    pub source_sitemap: Option<String>,
}

impl Row for ReconciliationRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::boolean("in_crawl"),
        Column::boolean("in_sitemap"),
        Column::boolean("orphaned"),
        Column::boolean("uncatalogued"),
        Column::text("lastmod"),
        Column::text("sitemap"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::Boolean(self.in_crawl),
            Cell::Boolean(self.in_sitemap),
            Cell::Boolean(self.orphaned),
            Cell::Boolean(self.uncatalogued),
            Cell::opt_text(self.lastmod.as_deref()),
            Cell::opt_text(self.source_sitemap.as_deref()),
        ]
    }
}

/// Classify every URL in the union of crawl and sitemap.
///
/// Rows are sorted by normalized URL. Sitemap metadata comes from the first
/// matching entry in ingestion order.
pub fn reconcile(pages: &PageStore, sitemap: &SitemapStore) -> ReportTable<ReconciliationRow> {
    let crawl_urls: HashSet<String> = pages.normalized_urls().into_iter().collect();

    let mut sitemap_meta: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();
    for record in sitemap.deduplicated() {
        sitemap_meta.insert(
            normalize_url(&record.loc),
            (record.lastmod.clone(), record.source_sitemap.clone()),
        );
    }

    let all_urls: BTreeSet<&String> = crawl_urls.iter().chain(sitemap_meta.keys()).collect();

    let rows: Vec<ReconciliationRow> = all_urls
        .into_iter()
        .map(|url| {
            let in_crawl = crawl_urls.contains(url);
            let meta = sitemap_meta.get(url);
            let in_sitemap = meta.is_some();
            let (lastmod, source_sitemap) = meta.cloned().unwrap_or((None, None));
            ReconciliationRow {
                url: url.clone(),
                in_crawl,
                in_sitemap,
                orphaned: in_sitemap && !in_crawl,
                uncatalogued: in_crawl && !in_sitemap,
                lastmod,
                source_sitemap,
            }
        })
        .collect();

    info!(
        "Sitemap vs crawl comparison generated with {} rows ({} crawled, {} in sitemap)",
        rows.len(),
        crawl_urls.len(),
        sitemap_meta.len()
    );

    ReportTable::new(rows)
}
