//! Client records - typed rows built from a validated table

use crate::ingest::coerce_cell;
use crate::schema::{resolve_note_field, SemanticType, Schema};
use crate::table::{Cell, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One client row, keyed by `business_name`.
///
/// Known columns get typed members; optional ones (city/state/zip, the
/// marketing flags) are `None` when the schema version does not carry them.
/// Columns outside the known set land in `extra`, as do `invoiced` and
/// `quoted` when the schema does not declare them numeric. Every
/// numeric-declared column is coerced, whichever member it fills.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub business_name: String,

    pub contact_name: Option<String>,
    pub phone_number: Option<String>,
    pub email_address: Option<String>,
    pub business_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub social_media_links: Option<String>,

    pub invoiced: Option<f64>,
    pub quoted: Option<f64>,
    pub status: Option<String>,
    pub products: Option<String>,
    pub product_line: Option<String>,

    /// Activity flags keep their exported text; read them with `flag`
    pub contacted: Option<String>,
    pub marketed: Option<String>,
    pub emailed: Option<String>,

    /// Every declared note field, empty when the export had no value
    pub notes: BTreeMap<String, String>,

    pub extra: BTreeMap<String, Cell>,
}

impl ClientRecord {
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            ..Default::default()
        }
    }

    /// Label used by name search: "business_name (contact_name)"
    pub fn display_label(&self) -> String {
        format!(
            "{} ({})",
            self.business_name,
            self.contact_name.as_deref().unwrap_or("")
        )
    }

    pub fn note(&self, field: &str) -> Option<&str> {
        self.notes.get(field).map(|s| s.as_str())
    }

    /// Value of a column by name. Columns kept in `extra` win; other known
    /// columns always resolve (to `Null` when empty); unknown names resolve
    /// only through `notes`.
    pub fn value(&self, column: &str) -> Option<Cell> {
        if let Some(cell) = self.extra.get(column) {
            return Some(cell.clone());
        }

        let text = |v: &Option<String>| v.clone().map(Cell::Text).unwrap_or(Cell::Null);
        let number = |v: &Option<f64>| v.map(Cell::Number).unwrap_or(Cell::Null);

        let cell = match column {
            "business_name" => Cell::Text(self.business_name.clone()),
            "contact_name" => text(&self.contact_name),
            "phone_number" => text(&self.phone_number),
            "email_address" => text(&self.email_address),
            "business_address" => text(&self.business_address),
            "city" => text(&self.city),
            "state" => text(&self.state),
            "zip_code" => text(&self.zip_code),
            "social_media_links" => text(&self.social_media_links),
            "invoiced" => number(&self.invoiced),
            "quoted" => number(&self.quoted),
            "status" => text(&self.status),
            "products" => text(&self.products),
            "product_line" => text(&self.product_line),
            "contacted" => text(&self.contacted),
            "marketed" => text(&self.marketed),
            "emailed" => text(&self.emailed),
            other => return self.notes.get(other).map(|note| Cell::Text(note.clone())),
        };
        Some(cell)
    }

    /// Boolean-like reading of a flag column; absent columns read false
    pub fn flag(&self, column: &str) -> bool {
        self.value(column).map(|c| c.is_truthy()).unwrap_or(false)
    }
}

/// Where a table column lands in a `ClientRecord`
#[derive(Clone, Debug, PartialEq)]
enum Slot {
    BusinessName,
    ContactName,
    PhoneNumber,
    EmailAddress,
    BusinessAddress,
    City,
    State,
    ZipCode,
    SocialMediaLinks,
    Invoiced,
    Quoted,
    Status,
    Products,
    ProductLine,
    Contacted,
    Marketed,
    Emailed,
    Note(String),
    Extra(String),
}

/// A column's slot and whether the schema declares it numeric
#[derive(Clone, Debug, PartialEq)]
struct Placement {
    slot: Slot,
    numeric: bool,
}

impl Placement {
    fn for_column(column: &str, schema: &Schema) -> Placement {
        let numeric = schema.semantic_type(column) == Some(SemanticType::Numeric);
        let slot = match column {
            "business_name" => Slot::BusinessName,
            "contact_name" => Slot::ContactName,
            "phone_number" => Slot::PhoneNumber,
            "email_address" => Slot::EmailAddress,
            "business_address" => Slot::BusinessAddress,
            "city" => Slot::City,
            "state" => Slot::State,
            "zip_code" => Slot::ZipCode,
            "social_media_links" => Slot::SocialMediaLinks,
            // amounts only fill the typed members when declared numeric
            "invoiced" if numeric => Slot::Invoiced,
            "quoted" if numeric => Slot::Quoted,
            "status" => Slot::Status,
            "products" => Slot::Products,
            "product_line" => Slot::ProductLine,
            "contacted" => Slot::Contacted,
            "marketed" => Slot::Marketed,
            "emailed" => Slot::Emailed,
            other => match resolve_note_field(schema.note_fields(), other) {
                Some(field) => Slot::Note(field.to_string()),
                None => Slot::Extra(other.to_string()),
            },
        };
        Placement { slot, numeric }
    }
}

/// Converts validated table rows into records. Column placement is decided
/// once per table, not per row. A repeated column name is placed only at
/// its first occurrence.
pub(crate) struct RecordBuilder<'a> {
    placements: Vec<Option<Placement>>,
    note_fields: &'a [String],
}

impl<'a> RecordBuilder<'a> {
    pub(crate) fn new(table: &Table, schema: &'a Schema) -> Self {
        let mut seen = HashSet::new();
        Self {
            placements: table
                .columns()
                .iter()
                .map(|c| seen.insert(c.as_str()).then(|| Placement::for_column(c, schema)))
                .collect(),
            note_fields: schema.note_fields(),
        }
    }

    pub(crate) fn build(&self, row: &[Cell]) -> ClientRecord {
        let mut record = ClientRecord::default();
        for field in self.note_fields {
            record.notes.insert(field.clone(), String::new());
        }

        for (placement, cell) in self.placements.iter().zip(row) {
            let Some(placement) = placement else {
                continue;
            };
            let cell = if placement.numeric { coerce_cell(cell) } else { cell.clone() };
            let text = cell.to_display_text();
            match &placement.slot {
                Slot::BusinessName => record.business_name = cell.to_string(),
                Slot::ContactName => record.contact_name = text,
                Slot::PhoneNumber => record.phone_number = text,
                Slot::EmailAddress => record.email_address = text,
                Slot::BusinessAddress => record.business_address = text,
                Slot::City => record.city = text,
                Slot::State => record.state = text,
                Slot::ZipCode => record.zip_code = text,
                Slot::SocialMediaLinks => record.social_media_links = text,
                Slot::Invoiced => record.invoiced = cell.as_number(),
                Slot::Quoted => record.quoted = cell.as_number(),
                Slot::Status => record.status = text,
                Slot::Products => record.products = text,
                Slot::ProductLine => record.product_line = text,
                Slot::Contacted => record.contacted = text,
                Slot::Marketed => record.marketed = text,
                Slot::Emailed => record.emailed = text,
                Slot::Note(field) => {
                    record.notes.insert(field.clone(), text.unwrap_or_default());
                }
                Slot::Extra(name) => {
                    record.extra.insert(name.clone(), cell);
                }
            }
        }

        record
    }
}
