//! Tabular payloads - column-oriented tables read from and written to CSV

use crate::coercion::{format_number, is_truthy};
use crate::error::{RegistryError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;

/// One table cell
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean-like reading of the cell; numbers are true when non-zero
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Null => false,
            Cell::Number(v) => v.is_finite() && *v != 0.0,
            Cell::Text(s) => is_truthy(s),
        }
    }

    /// Non-empty textual rendering, `None` for null and empty text
    pub fn to_display_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(v) => Some(format_number(*v)),
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(v) => write!(f, "{}", format_number(*v)),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Column-named table; every row holds exactly one cell per column
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableData")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Unchecked wire form of a `Table`
#[derive(Deserialize)]
struct TableData {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TryFrom<TableData> for Table {
    type Error = String;

    fn try_from(data: TableData) -> std::result::Result<Self, Self::Error> {
        let width = data.columns.len();
        if let Some(pos) = data.rows.iter().position(|row| row.len() != width) {
            return Err(format!(
                "row {} has {} cells, expected {}",
                pos,
                data.rows[pos].len(),
                width
            ));
        }
        Ok(Self {
            columns: data.columns,
            rows: data.rows,
        })
    }
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a text table from string rows; short rows are padded with
    /// empty cells and extra trailing cells are dropped.
    pub fn from_text_rows<S: AsRef<str>>(columns: &[S], rows: &[Vec<S>]) -> Self {
        let mut table = Self::new(columns.iter().map(|c| c.as_ref().to_string()).collect());
        for row in rows {
            table.push_text_row(row.iter().map(|c| c.as_ref()));
        }
        table
    }

    /// Read a CSV payload with a header row. All cells stay text. A header
    /// name used twice rejects the payload.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect::<Vec<_>>();

        let mut table = Self::new(headers);
        if let Some(name) = table.duplicate_column() {
            return Err(RegistryError::DuplicateColumn(name.to_string()));
        }
        for result in rdr.records() {
            let record = result?;
            table.push_text_row(record.iter());
        }

        Ok(table)
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_csv_reader(text.as_bytes())
    }

    fn push_text_row<'a>(&mut self, cells: impl Iterator<Item = &'a str>) {
        let mut row: Vec<Cell> = cells.take(self.columns.len()).map(Cell::text).collect();
        row.resize(self.columns.len(), Cell::text(""));
        self.rows.push(row);
    }

    /// Append a row, padding or truncating to the column count
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// First column name that appears more than once
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .find(|c| !seen.insert(c.as_str()))
            .map(|c| c.as_str())
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Cell>> {
        &mut self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows restricted to the named columns that exist
    pub fn head(&self, n: usize, columns: &[&str]) -> Table {
        let picked: Vec<(usize, &str)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|idx| (idx, *c)))
            .collect();

        let mut out = Table::new(picked.iter().map(|(_, c)| c.to_string()).collect());
        for row in self.rows.iter().take(n) {
            out.rows.push(
                picked
                    .iter()
                    .map(|(idx, _)| row.get(*idx).cloned().unwrap_or(Cell::Null))
                    .collect(),
            );
        }
        out
    }

    /// Serialize as CSV with a header row. Null cells are written empty.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.to_string()))?;
        }
        wtr.into_inner().map_err(|e| e.into_error().into())
    }
}
