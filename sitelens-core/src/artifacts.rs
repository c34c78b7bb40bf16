// Per-dimension CSV artifacts

use crate::report::AuditTables;
use crate::table::{Cell, ReportTable, Row};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub written: Vec<PathBuf>,
    /// Artifact name and the error that stopped it.
    pub failed: Vec<(String, String)>,
}

impl ArtifactSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        other => escape_field(&other.to_string()),
    }
}

/// Write `table` as CSV, header row included even when empty.
pub fn write_csv<R: Row>(table: &ReportTable<R>, path: &Path) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let header: Vec<String> = table
        .column_names()
        .into_iter()
        .map(escape_field)
        .collect();
    writeln!(writer, "{}", header.join(","))?;
    for row in table.rows() {
        let cells: Vec<String> = row.cells().iter().map(format_cell).collect();
        writeln!(writer, "{}", cells.join(","))?;
    }
    writer.flush()
}

/// Lowercase, filesystem-safe form of a customer name.
pub fn file_prefix(customer: &str) -> String {
    let prefix: String = customer
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if prefix.is_empty() {
        "audit".to_string()
    } else {
        prefix
    }
}

struct ArtifactWriter<'a> {
    dir: &'a Path,
    prefix: &'a str,
    summary: ArtifactSummary,
}

impl ArtifactWriter<'_> {
    fn write<R: Row>(&mut self, name: &str, table: &ReportTable<R>) {
        let path = self.dir.join(format!("{}_{}.csv", self.prefix, name));
        match write_csv(table, &path) {
            Ok(()) => {
                info!("Saved {} ({} rows)", path.display(), table.len());
                self.summary.written.push(path);
            }
            Err(e) => {
                error!("Failed saving {}: {}", path.display(), e);
                self.summary.failed.push((name.to_string(), e.to_string()));
            }
        }
    }
}

/// Write one CSV per table into `dir`.
///
/// Each file is written independently; a failure is recorded in the summary
/// and the remaining files are still attempted.
pub fn write_artifacts(tables: &AuditTables, dir: &Path, customer: &str) -> ArtifactSummary {
    let prefix = file_prefix(customer);
    if let Err(e) = fs::create_dir_all(dir) {
        error!("Could not create output directory {}: {}", dir.display(), e);
    }

    let mut writer = ArtifactWriter {
        dir,
        prefix: &prefix,
        summary: ArtifactSummary::default(),
    };
    writer.write("rendering_mode", &tables.rendering);
    writer.write("robots", &tables.robots);
    writer.write("meta", &tables.meta);
    writer.write("headings", &tables.headings);
    writer.write("schema", &tables.schema);
    writer.write("canonicals", &tables.canonicals);
    writer.write("status", &tables.status);
    writer.write("sitemap_vs_crawl", &tables.reconciliation);
    writer.write("url_structure", &tables.url_structure);
    writer.write("redirects", &tables.redirects);
    writer.write("link_nodes", &tables.link_nodes);
    writer.write("link_edges", &tables.link_edges);
    writer.write("ngrams_1", &tables.ngrams_1);
    writer.write("ngrams_2", &tables.ngrams_2);
    writer.write("ngrams_3", &tables.ngrams_3);
    writer.summary
}
