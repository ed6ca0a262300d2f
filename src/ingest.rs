//! Ingestion - schema validation, numeric coercion and row classification
//!
//! `ingest` is pure: it reads a raw text table and returns a new coerced
//! table plus diagnostics. It never touches a registry.

use crate::coercion::coerce_numeric;
use crate::error::{RegistryError, Result};
use crate::schema::{Schema, KEY_COLUMN};
use crate::table::{Cell, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Columns shown to the user next to an invalid row and in upload previews
pub const DIAGNOSTIC_COLUMNS: &[&str] = &["business_name", "invoiced", "quoted", "status", "products"];

/// A row with at least one numeric cell that could not be coerced
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvalidRow {
    /// 0-based position in the input
    pub row: usize,
    pub business_name: String,
    /// Every numeric column of the row with its original text
    pub numeric_cells: Vec<(String, String)>,
    /// Numeric columns that coerced to null
    pub failed_columns: Vec<String>,
    pub status: Option<String>,
    pub products: Option<String>,
}

/// How an upload should be presented
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Every numeric cell coerced
    Clean,
    /// Some rows were dropped from the validated table
    Warnings,
    /// Every row failed; the raw table was kept for inspection
    Degraded,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestResult {
    /// Table to load: coerced rows without invalid ones, or the raw input
    /// when every row was invalid
    pub validated: Table,

    /// Full coerced table, invalid rows included with null numerics
    pub coerced: Table,

    pub invalid_rows: Vec<InvalidRow>,

    pub degraded: bool,

    pub schema_version: String,

    pub input_rows: usize,
}

impl IngestResult {
    pub fn outcome(&self) -> IngestOutcome {
        if self.degraded {
            IngestOutcome::Degraded
        } else if self.invalid_rows.is_empty() {
            IngestOutcome::Clean
        } else {
            IngestOutcome::Warnings
        }
    }

    /// CSV bytes of the cleaned table; `None` when no row survived cleaning
    pub fn cleaned_export(&self) -> Result<Option<Vec<u8>>> {
        if self.degraded {
            return Ok(None);
        }
        self.validated.to_csv_bytes().map(Some)
    }

    /// First `n` coerced rows over the diagnostic columns
    pub fn preview(&self, n: usize) -> Table {
        self.coerced.head(n, DIAGNOSTIC_COLUMNS)
    }
}

/// Columns required by `schema` that `table` lacks, in schema order
pub fn missing_columns(table: &Table, schema: &Schema) -> Vec<String> {
    schema
        .required_columns()
        .iter()
        .filter(|c| !table.has_column(&c.name))
        .map(|c| c.name.clone())
        .collect()
}

/// Coerce a single numeric cell. Text goes through `coerce_numeric`;
/// numbers pass through unless NaN.
pub fn coerce_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(v) if !v.is_nan() => Cell::Number(*v),
        Cell::Text(s) => coerce_numeric(s).map(Cell::Number).unwrap_or(Cell::Null),
        _ => Cell::Null,
    }
}

pub fn ingest(raw: &Table, schema: &Schema) -> Result<IngestResult> {
    if let Some(name) = raw.duplicate_column() {
        warn!("Upload rejected: column '{}' appears more than once", name);
        return Err(RegistryError::DuplicateColumn(name.to_string()));
    }

    let missing = missing_columns(raw, schema);
    if !missing.is_empty() {
        warn!(
            "Upload rejected by schema {}: missing {:?}",
            schema.version, missing
        );
        return Err(RegistryError::SchemaMismatch { missing });
    }

    let numeric: Vec<(String, usize)> = schema
        .numeric_columns()
        .filter_map(|name| raw.column_index(name).map(|idx| (name.to_string(), idx)))
        .collect();

    let mut coerced = raw.clone();
    let mut invalid_rows = Vec::new();
    let mut invalid_mask = vec![false; raw.height()];

    for (row_idx, row) in coerced.rows_mut().iter_mut().enumerate() {
        let mut failed = Vec::new();
        for (name, col_idx) in &numeric {
            let cell = coerce_cell(&row[*col_idx]);
            if cell.is_null() {
                failed.push(name.clone());
            }
            row[*col_idx] = cell;
        }

        if !failed.is_empty() {
            invalid_mask[row_idx] = true;
            invalid_rows.push(invalid_row(raw, row_idx, &numeric, failed));
        }
    }

    let mut validated = Table::new(coerced.columns().to_vec());
    for (row, invalid) in coerced.rows().iter().zip(&invalid_mask) {
        if !invalid {
            validated.push_row(row.clone());
        }
    }

    let degraded = !invalid_rows.is_empty() && validated.is_empty();
    if degraded {
        warn!(
            "All {} rows have invalid numeric values; keeping raw table for inspection",
            raw.height()
        );
        validated = raw.clone();
    } else if !invalid_rows.is_empty() {
        warn!(
            "{} of {} rows have invalid numeric values and were removed",
            invalid_rows.len(),
            raw.height()
        );
    }

    info!(
        "Ingested {} rows against schema {} ({} valid, {} invalid)",
        raw.height(),
        schema.version,
        raw.height() - invalid_rows.len(),
        invalid_rows.len()
    );

    Ok(IngestResult {
        validated,
        coerced,
        invalid_rows,
        degraded,
        schema_version: schema.version.clone(),
        input_rows: raw.height(),
    })
}

fn invalid_row(raw: &Table, row: usize, numeric: &[(String, usize)], failed: Vec<String>) -> InvalidRow {
    let text_at = |column: &str| raw.cell(row, column).and_then(|c| c.to_display_text());

    let numeric_cells = numeric
        .iter()
        .map(|(name, _)| (name.clone(), raw.cell(row, name).map(|c| c.to_string()).unwrap_or_default()))
        .collect();

    debug!("Row {} failed numeric coercion in {:?}", row, failed);

    InvalidRow {
        row,
        business_name: text_at(KEY_COLUMN).unwrap_or_default(),
        numeric_cells,
        failed_columns: failed,
        status: text_at("status"),
        products: text_at("products"),
    }
}
