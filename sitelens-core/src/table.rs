// Typed report tables shared between reporters, the insight engine and the assembler

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Text }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Integer }
    }

    pub const fn float(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Float }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: ColumnType::Boolean }
    }
}

/// A single rendered value, used for previews and CSV artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Cell {
    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(Cell::Null, |v| Cell::Text(v.to_string()))
    }

    pub fn opt_integer(value: Option<i64>) -> Self {
        value.map_or(Cell::Null, Cell::Integer)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A strongly typed row with a fixed column schema.
pub trait Row {
    const COLUMNS: &'static [Column];

    /// Cells in the same order as `COLUMNS`.
    fn cells(&self) -> Vec<Cell>;
}

/// Rows for one report dimension.
///
/// An empty table means "checked, found nothing". When the safe-execution
/// wrapper substitutes a table because the reporter failed or its input was
/// missing, `unavailable` carries the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable<R> {
    rows: Vec<R>,
    unavailable: Option<String>,
}

impl<R: Row> ReportTable<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            unavailable: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            unavailable: Some(reason.into()),
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        R::COLUMNS
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        R::COLUMNS.iter().map(|c| c.name).collect()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.is_some()
    }

    pub fn head(&self, n: usize) -> TablePreview {
        TablePreview {
            columns: self.column_names().into_iter().map(String::from).collect(),
            rows: self.rows.iter().take(n).map(Row::cells).collect(),
            total_rows: self.rows.len(),
        }
    }
}

impl<R: Row> Default for ReportTable<R> {
    fn default() -> Self {
        Self::empty()
    }
}

/// First rows of a table, detached from its row type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub total_rows: usize,
}

impl TablePreview {
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total_rows
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Number of rows for which `pred` holds.
pub fn count_where<R>(rows: &[R], pred: impl Fn(&R) -> bool) -> usize {
    rows.iter().filter(|r| pred(r)).count()
}
