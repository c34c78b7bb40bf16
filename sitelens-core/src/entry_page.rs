// Rendering mode and structured data probes over the entry page HTML

use crate::error::{AuditError, Result};
use crate::table::{Cell, Column, ReportTable, Row};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Below this much visible text the page is a client-rendering candidate.
pub const CSR_TEXT_THRESHOLD: usize = 200;
/// More script tags than this, combined with little text, means client-rendered.
pub const CSR_SCRIPT_THRESHOLD: usize = 20;

const NON_VISIBLE_ELEMENTS: [&str; 3] = ["script", "style", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingMode {
    ClientSide,
    PossiblyClientSide,
    ServerSide,
}

impl RenderingMode {
    pub fn label(&self) -> &'static str {
        match self {
            RenderingMode::ClientSide => "Likely Client-Side Rendered (CSR)",
            RenderingMode::PossiblyClientSide => {
                "Possibly Client-Side Rendered (noscript fallback present)"
            }
            RenderingMode::ServerSide => "Likely Server-Side Rendered (SSR)",
        }
    }

    /// Classify from the three signals measured on the page.
    pub fn classify(text_length: usize, script_count: usize, noscript_present: bool) -> Self {
        if text_length < CSR_TEXT_THRESHOLD && script_count > CSR_SCRIPT_THRESHOLD {
            RenderingMode::ClientSide
        } else if noscript_present {
            RenderingMode::PossiblyClientSide
        } else {
            RenderingMode::ServerSide
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderingRow {
    pub url: String,
    pub rendering_mode: RenderingMode,
    pub text_length: usize,
    pub script_count: usize,
    pub noscript_present: bool,
}

impl Row for RenderingRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::text("rendering_mode"),
        Column::integer("text_length"),
        Column::integer("script_count"),
        Column::boolean("noscript_present"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::Text(self.rendering_mode.label().to_string()),
            Cell::Integer(self.text_length as i64),
            Cell::Integer(self.script_count as i64),
            Cell::Boolean(self.noscript_present),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRow {
    pub url: String,
    pub schema_present: bool,
    pub schema_types: Vec<String>,
}

impl Row for SchemaRow {
    const COLUMNS: &'static [Column] = &[
        Column::text("url"),
        Column::boolean("schema_present"),
        Column::text("schema_types"),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.url.clone()),
            Cell::Boolean(self.schema_present),
            Cell::Text(self.schema_types.join(", ")),
        ]
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AuditError::Selector(format!("{}: {}", css, e)))
}

/// Total length of trimmed text outside script, style and template elements.
fn visible_text_length(document: &Html) -> usize {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| NON_VISIBLE_ELEMENTS.contains(&el.name()))
            });
            if hidden {
                None
            } else {
                Some(text.trim().chars().count())
            }
        })
        .sum()
}

/// Single-row client/server rendering heuristic for the entry page.
pub fn check_rendering_mode(url: &str, html: &str) -> Result<ReportTable<RenderingRow>> {
    info!("Checking rendering mode for {}", url);
    let document = Html::parse_document(html);

    let script_count = document.select(&selector("script")?).count();
    let noscript_present = document.select(&selector("noscript")?).next().is_some();
    let text_length = visible_text_length(&document);
    let rendering_mode = RenderingMode::classify(text_length, script_count, noscript_present);

    info!(
        "Rendering mode: {} (text length {}, {} scripts)",
        rendering_mode.label(),
        text_length,
        script_count
    );

    Ok(ReportTable::new(vec![RenderingRow {
        url: url.to_string(),
        rendering_mode,
        text_length,
        script_count,
        noscript_present,
    }]))
}

fn collect_schema_types(value: &Value, types: &mut BTreeSet<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_schema_types(item, types);
            }
        }
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => {
                    types.insert(t.clone());
                }
                Some(Value::Array(list)) => {
                    types.extend(list.iter().filter_map(Value::as_str).map(String::from));
                }
                _ if !map.contains_key("@graph") => {
                    types.insert("Unknown".to_string());
                }
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_schema_types(graph, types);
            }
        }
        _ => {}
    }
}

fn script_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Structured data presence and the de-duplicated set of declared types.
pub fn check_schema(url: &str, html: &str) -> Result<ReportTable<SchemaRow>> {
    info!("Checking structured data for {}", url);
    let document = Html::parse_document(html);
    let ld_json = selector(r#"script[type="application/ld+json"]"#)?;

    let mut types = BTreeSet::new();
    for block in document.select(&ld_json) {
        match serde_json::from_str::<Value>(script_text(block).trim()) {
            Ok(value) => collect_schema_types(&value, &mut types),
            Err(e) => warn!("Error parsing schema JSON: {}", e),
        }
    }

    let schema_types: Vec<String> = types.into_iter().collect();
    info!("Found {} schema types", schema_types.len());

    Ok(ReportTable::new(vec![SchemaRow {
        url: url.to_string(),
        schema_present: !schema_types.is_empty(),
        schema_types,
    }]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(RenderingMode::classify(199, 21, false), RenderingMode::ClientSide);
        assert_eq!(RenderingMode::classify(200, 21, false), RenderingMode::ServerSide);
        assert_eq!(RenderingMode::classify(10, 20, true), RenderingMode::PossiblyClientSide);
        assert_eq!(RenderingMode::classify(10, 20, false), RenderingMode::ServerSide);
    }

    #[test]
    fn test_visible_text_ignores_scripts() {
        let html = "<html><body><p> hello </p><script>var x = 'ignored';</script><style>p{}</style></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(visible_text_length(&document), 5);
    }

    #[test]
    fn test_collect_types_from_graph() {
        let value: Value = serde_json::from_str(
            r#"{"@context":"https://schema.org","@graph":[{"@type":"Organization"},{"@type":["WebSite","Thing"]}]}"#,
        )
        .unwrap();
        let mut types = BTreeSet::new();
        collect_schema_types(&value, &mut types);
        let types: Vec<_> = types.into_iter().collect();
        assert_eq!(types, vec!["Organization", "Thing", "WebSite"]);
    }
}
