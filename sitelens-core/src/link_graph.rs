// Internal link graph with in/out degree and PageRank importance

use crate::error::Result;
use crate::model::{PageStore, normalize_url};
use crate::reporters::StatusRow;
use crate::table::{Cell, Column, ReportTable, Row};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use url::Url;

pub const DAMPING_FACTOR: f64 = 0.85;
pub const MAX_ITERATIONS: usize = 100;
/// Per-node convergence tolerance; the total L1 change must drop below `n * TOLERANCE`.
pub const TOLERANCE: f64 = 1.0e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkNodeRow {
    pub url: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub pagerank: f64,
}

impl Row for LinkNodeRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::integer("in_degree"),
        Column::integer("out_degree"),
        Column::float("pagerank"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::Integer(self.in_degree as i64),
            Cell::Integer(self.out_degree as i64),
            Cell::Float(self.pagerank),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEdgeRow {
    pub source: String,
    pub target: String,
    pub anchor_text: Option<String>,
    pub nofollow: bool,
}

impl Row for LinkEdgeRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("source"),
        Column::text("target"),
        Column::text("anchor_text"),
        Column::boolean("nofollow"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.source.clone()),
            Cell::Text(self.target.clone()),
            Cell::opt_text(self.anchor_text.as_deref()),
            Cell::Boolean(self.nofollow),
        ]
    }
}

/// Node and edge tables produced by [`build_graph`].
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    pub nodes: ReportTable<LinkNodeRow>,
    pub edges: ReportTable<LinkEdgeRow>,
}

impl LinkGraph {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            nodes: ReportTable::unavailable(reason.clone()),
            edges: ReportTable::unavailable(reason),
        }
    }
}

/// Hop-to-next-hop map keyed by normalized URL.
#[derive(Debug, Clone, Default)]
pub struct RedirectMap {
    next: HashMap<String, String>,
}

impl RedirectMap {
    /// Build from the status table's chain columns.
    ///
    /// A page reached through `[h0, h1]` contributes `h0 -> h1` and `h1 -> url`.
    pub fn from_status(status: &ReportTable<StatusRow>) -> Self {
        let mut next = HashMap::new();
        for row in status.rows() {
            let Some(hops) = row.redirect_urls.as_ref().filter(|h| !h.is_empty()) else {
                continue;
            };
            let chain: Vec<String> = hops
                .iter()
                .chain(std::iter::once(&row.url))
                .map(|u| normalize_url(u))
                .collect();
            for pair in chain.windows(2) {
                if pair[0] != pair[1] {
                    next.entry(pair[0].clone()).or_insert_with(|| pair[1].clone());
                }
            }
        }
        Self { next }
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    /// Follow redirects from `url` to a terminal URL.
    ///
    /// Stops before revisiting a URL and returns the last distinct one reached.
    pub fn resolve(&self, url: &str) -> String {
        let mut current = normalize_url(url);
        let mut seen = HashSet::from([current.clone()]);
        while let Some(next) = self.next.get(&current) {
            if !seen.insert(next.clone()) {
                debug!("Redirect cycle detected at {}", next);
                break;
            }
            current = next.clone();
        }
        current
    }
}

/// Absolute form of `href` relative to `base`, skipping non-navigational links.
pub fn resolve_link(base: &str, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(href).ok()?;
    resolved.set_fragment(None);

    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

fn host_matches(url: &str, pattern: &Regex) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| pattern.is_match(h)))
        .unwrap_or(false)
}

/// PageRank by power iteration.
///
/// Parallel edges count once each toward the source's out-degree. Rank held by
/// nodes without outgoing edges is spread uniformly over all nodes, so the
/// scores always sum to one.
pub fn pagerank<N, E>(graph: &DiGraph<N, E>, damping: f64) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    let n_f = n as f64;
    let out_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.edges_directed(idx, Direction::Outgoing).count())
        .collect();

    let mut rank = vec![1.0 / n_f; n];
    for iteration in 0..MAX_ITERATIONS {
        let dangling: f64 = rank
            .iter()
            .zip(&out_degree)
            .filter(|(_, deg)| **deg == 0)
            .map(|(r, _)| r)
            .sum();
        let base = (1.0 - damping) / n_f + damping * dangling / n_f;
        let mut next = vec![base; n];
        for edge in graph.edge_references() {
            let source = edge.source().index();
            next[edge.target().index()] += damping * rank[source] / out_degree[source] as f64;
        }

        let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if delta < n_f * TOLERANCE {
            debug!("PageRank converged after {} iterations", iteration + 1);
            break;
        }
    }
    rank
}

/// Build the internal link graph from page records.
///
/// A link is internal when its resolved target host matches `domain_pattern`.
/// With `resolve_redirects`, both ends are followed through the redirect map
/// first. No internal edges yields two empty tables.
pub fn build_graph(
    pages: &PageStore,
    domain_pattern: &Regex,
    redirects: Option<&RedirectMap>,
) -> Result<LinkGraph> {
    info!("Generating internal link analysis...");
    let resolve = |url: &str| match redirects {
        Some(map) => map.resolve(url),
        None => normalize_url(url),
    };

    let mut edges = Vec::new();
    for page in pages.pages() {
        let source = resolve(&page.url);
        for link in &page.outbound_links {
            let Some(target_url) = resolve_link(&page.url, &link.target) else {
                continue;
            };
            if !host_matches(target_url.as_str(), domain_pattern) {
                continue;
            }
            let target = resolve(target_url.as_str());
            if !host_matches(&target, domain_pattern) {
                debug!("Dropping edge to {}: redirected off-site", target);
                continue;
            }
            edges.push(LinkEdgeRow {
                source: source.clone(),
                target,
                anchor_text: link.anchor_text.clone(),
                nofollow: link.nofollow,
            });
        }
    }

    if edges.is_empty() {
        warn!("No internal edges remain after optional resolution/filtering.");
        return Ok(LinkGraph::default());
    }

    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();
    for edge in &edges {
        let s = *index
            .entry(edge.source.clone())
            .or_insert_with(|| graph.add_node(edge.source.clone()));
        let t = *index
            .entry(edge.target.clone())
            .or_insert_with(|| graph.add_node(edge.target.clone()));
        graph.add_edge(s, t, ());
    }

    let scores = pagerank(&graph, DAMPING_FACTOR);
    let mut nodes: Vec<LinkNodeRow> = graph
        .node_indices()
        .map(|idx| LinkNodeRow {
            url: graph[idx].clone(),
            in_degree: graph.edges_directed(idx, Direction::Incoming).count(),
            out_degree: graph.edges_directed(idx, Direction::Outgoing).count(),
            pagerank: scores[idx.index()],
        })
        .collect();
    nodes.sort_by(|a, b| {
        b.pagerank
            .total_cmp(&a.pagerank)
            .then_with(|| a.url.cmp(&b.url))
    });

    info!(
        "Internal link analysis produced {} nodes and {} edges",
        nodes.len(),
        edges.len()
    );

    Ok(LinkGraph {
        nodes: ReportTable::new(nodes),
        edges: ReportTable::new(edges),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_link_skips_non_navigational() {
        assert!(resolve_link("https://a.com/", "mailto:x@a.com").is_none());
        assert!(resolve_link("https://a.com/", "#top").is_none());
        assert_eq!(
            resolve_link("https://a.com/blog/", "post#c").map(|u| u.to_string()),
            Some("https://a.com/blog/post".to_string())
        );
    }

    #[test]
    fn test_pagerank_sums_to_one_with_dangling_node() {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        graph.add_edge(a, b, ());
        graph.add_edge(a, c, ());
        let scores = pagerank(&graph, DAMPING_FACTOR);
        let total: f64 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(scores[b.index()] > scores[a.index()]);
    }
}
