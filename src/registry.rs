//! Client Registry - the in-memory table of records for one session
//!
//! Records keep input row order. The name index maps every business name to
//! all of its positions; lookups by name resolve to the first one.

use crate::error::{RegistryError, Result};
use crate::ingest::IngestResult;
use crate::record::{ClientRecord, RecordBuilder};
use crate::schema::{resolve_note_field, Schema};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientRegistry {
    schema_version: String,
    note_fields: Vec<String>,
    records: Vec<ClientRecord>,
    index: HashMap<String, Vec<usize>>,
    degraded: bool,
    loaded_at: DateTime<Utc>,
}

impl ClientRegistry {
    /// Build a fresh registry from the validated rows of an ingest pass
    pub fn load(result: &IngestResult, schema: &Schema) -> Self {
        let builder = RecordBuilder::new(&result.validated, schema);
        let records: Vec<ClientRecord> = result
            .validated
            .rows()
            .iter()
            .map(|row| builder.build(row))
            .collect();

        let registry = Self::from_records(records, schema.version.clone(), schema.note_fields().to_vec(), result.degraded);

        let duplicates = registry.duplicate_names();
        if !duplicates.is_empty() {
            warn!(
                "Duplicate business names in upload: {}",
                duplicates.iter().join(", ")
            );
        }
        info!(
            "Loaded {} client records (schema {}, degraded: {})",
            registry.len(),
            registry.schema_version,
            registry.degraded
        );

        registry
    }

    pub fn from_records(
        records: Vec<ClientRecord>,
        schema_version: String,
        note_fields: Vec<String>,
        degraded: bool,
    ) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, record) in records.iter().enumerate() {
            index.entry(record.business_name.clone()).or_default().push(position);
        }

        Self {
            schema_version,
            note_fields,
            records,
            index,
            degraded,
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Declared note fields in display order
    pub fn note_fields(&self) -> &[String] {
        &self.note_fields
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn get(&self, position: usize) -> Result<&ClientRecord> {
        self.records
            .get(position)
            .ok_or_else(|| RegistryError::NotFound(format!("record at position {}", position)))
    }

    /// All positions holding `name`, in input order
    pub fn positions_of(&self, name: &str) -> &[usize] {
        self.index.get(name).map(|p| p.as_slice()).unwrap_or(&[])
    }

    /// Position of the first record named `name`
    pub fn position_of(&self, name: &str) -> Result<usize> {
        self.positions_of(name)
            .first()
            .copied()
            .ok_or_else(|| RegistryError::NotFound(format!("business name '{}'", name)))
    }

    pub fn find_by_name(&self, name: &str) -> Result<&ClientRecord> {
        let position = self.position_of(name)?;
        self.get(position)
    }

    /// Business names held by more than one record
    pub fn duplicate_names(&self) -> BTreeSet<String> {
        self.index
            .iter()
            .filter(|(_, positions)| positions.len() > 1)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Case-insensitive substring search over "business_name (contact_name)".
    ///
    /// An empty term returns every record. Results are ordered by business
    /// name; records sharing a name keep input order. No match is an empty
    /// result, never the full list.
    pub fn search_by_display_name(&self, term: &str) -> Vec<(usize, &ClientRecord)> {
        let needle = term.trim().to_lowercase();
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| needle.is_empty() || record.display_label().to_lowercase().contains(&needle))
            .sorted_by(|(_, a), (_, b)| a.business_name.cmp(&b.business_name))
            .collect()
    }

    /// Overwrite the named note fields of one record.
    ///
    /// Nothing changes unless the position exists and every field name
    /// resolves to a declared note field.
    pub fn update_note_fields<I, K, V>(&mut self, position: usize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        if position >= self.records.len() {
            return Err(RegistryError::NotFound(format!("record at position {}", position)));
        }

        let mut resolved = Vec::new();
        for (name, value) in values {
            let field = resolve_note_field(&self.note_fields, name.as_ref())
                .ok_or_else(|| RegistryError::UnknownNoteField(name.as_ref().to_string()))?;
            resolved.push((field.to_string(), value.into()));
        }

        let record = &mut self.records[position];
        for (field, value) in resolved {
            debug!("Updating note '{}' for '{}'", field, record.business_name);
            record.notes.insert(field, value);
        }

        Ok(())
    }
}
