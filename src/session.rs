//! Session context - owns the schema and the current upload's registry
//!
//! Each interactive session holds its own `ClientSession`; nothing is shared
//! between sessions. A rejected upload leaves the previous registry in place.

use crate::error::{RegistryError, Result};
use crate::fuzzy_matcher::FuzzyMatcher;
use crate::ingest::{ingest, IngestOutcome, InvalidRow};
use crate::query::ClientQueries;
use crate::registry::ClientRegistry;
use crate::schema::Schema;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use tracing::{info, warn};
use uuid::Uuid;

/// Rows shown in an upload preview
pub const PREVIEW_ROWS: usize = 5;

/// What the upload view needs to render after an accepted upload
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadReport {
    pub upload_id: Uuid,
    pub outcome: IngestOutcome,
    pub records_loaded: usize,
    pub invalid_rows: Vec<InvalidRow>,
    pub duplicate_names: BTreeSet<String>,
    /// First coerced rows over the diagnostic columns
    pub preview: Table,
    /// Cleaned CSV offered for download when rows were dropped
    #[serde(skip)]
    pub cleaned_export: Option<Vec<u8>>,
}

pub struct ClientSession {
    id: Uuid,
    schema: Schema,
    matcher: FuzzyMatcher,
    registry: Option<ClientRegistry>,
}

impl ClientSession {
    pub fn new(schema: Schema) -> Self {
        Self::with_matcher(schema, FuzzyMatcher::default())
    }

    pub fn with_matcher(schema: Schema, matcher: FuzzyMatcher) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema,
            matcher,
            registry: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Ingest `table` and, unless it is rejected, replace the registry
    pub fn upload(&mut self, table: &Table) -> Result<UploadReport> {
        let upload_id = Uuid::new_v4();
        let result = match ingest(table, &self.schema) {
            Ok(result) => result,
            Err(e) => {
                warn!("Session {}: upload {} rejected: {}", self.id, upload_id, e);
                return Err(e);
            }
        };

        let cleaned_export = match result.outcome() {
            IngestOutcome::Warnings => result.cleaned_export()?,
            _ => None,
        };

        let preview = result.preview(PREVIEW_ROWS);
        let registry = ClientRegistry::load(&result, &self.schema);
        let report = UploadReport {
            upload_id,
            outcome: result.outcome(),
            records_loaded: registry.len(),
            invalid_rows: result.invalid_rows,
            duplicate_names: registry.duplicate_names(),
            preview,
            cleaned_export,
        };

        info!(
            "Session {}: upload {} accepted ({:?}, {} records)",
            self.id, upload_id, report.outcome, report.records_loaded
        );
        self.registry = Some(registry);
        Ok(report)
    }

    pub fn upload_csv<R: Read>(&mut self, reader: R) -> Result<UploadReport> {
        let table = Table::from_csv_reader(reader)?;
        self.upload(&table)
    }

    pub fn has_data(&self) -> bool {
        self.registry.is_some()
    }

    pub fn registry(&self) -> Result<&ClientRegistry> {
        self.registry.as_ref().ok_or(RegistryError::NoData)
    }

    pub fn registry_mut(&mut self) -> Result<&mut ClientRegistry> {
        self.registry.as_mut().ok_or(RegistryError::NoData)
    }

    pub fn queries(&self) -> Result<ClientQueries<'_>> {
        let registry = self.registry()?;
        Ok(ClientQueries::with_matcher(registry, self.matcher.clone()))
    }

    pub fn save_notes<I, K, V>(&mut self, position: usize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.registry_mut()?.update_note_fields(position, values)
    }

    /// Drop the current registry, as when the hosting session ends
    pub fn clear(&mut self) {
        self.registry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "invoiced,quoted,status,products,product_line,contacted,marketed,emailed,contact_name,business_name,phone_number,email_address,business_address,social_media_links";

    fn csv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_no_data_before_upload() {
        let session = ClientSession::new(Schema::builtin("v1").unwrap());
        assert!(!session.has_data());
        assert!(matches!(session.registry(), Err(RegistryError::NoData)));
        assert!(session.queries().is_err());
    }

    #[test]
    fn test_rejected_upload_keeps_previous_registry() {
        let mut session = ClientSession::new(Schema::builtin("v1").unwrap());
        session
            .upload_csv(csv(&["1,2,Active,Widgets,Tools,Yes,No,No,Wile,Acme,555,a@b.c,1 Road,"]).as_bytes())
            .unwrap();

        let err = session.upload_csv("business_name\nGlobex\n".as_bytes()).unwrap_err();
        assert!(err.is_upload_rejection());
        assert_eq!(session.registry().unwrap().len(), 1);
        assert!(session.registry().unwrap().find_by_name("Acme").is_ok());
    }

    #[test]
    fn test_upload_replaces_registry_in_full() {
        let mut session = ClientSession::new(Schema::builtin("v1").unwrap());
        session
            .upload_csv(csv(&["1,2,Active,W,T,Yes,No,No,Wile,Acme,,,,"]).as_bytes())
            .unwrap();
        session.save_notes(0, [("needs", "rockets")]).unwrap();

        session
            .upload_csv(csv(&["3,4,Lead,W,T,No,No,No,Hank,Globex,,,,"]).as_bytes())
            .unwrap();
        let registry = session.registry().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_name("Acme").is_err());
        assert_eq!(registry.get(0).unwrap().note("needs"), Some(""));
    }

    #[test]
    fn test_cleaned_export_only_for_partial_failures() {
        let mut session = ClientSession::new(Schema::builtin("v1").unwrap());
        let clean = session
            .upload_csv(csv(&["1,2,Active,W,T,Yes,No,No,Wile,Acme,,,,"]).as_bytes())
            .unwrap();
        assert!(clean.cleaned_export.is_none());

        let partial = session
            .upload_csv(csv(&["1,2,Active,W,T,Yes,No,No,Wile,Acme,,,,", "x,2,Lead,W,T,No,No,No,Hank,Globex,,,,"]).as_bytes())
            .unwrap();
        assert_eq!(partial.outcome, IngestOutcome::Warnings);
        assert!(partial.cleaned_export.is_some());
    }

    #[test]
    fn test_clear_drops_registry() {
        let mut session = ClientSession::new(Schema::builtin("v1").unwrap());
        session
            .upload_csv(csv(&["1,2,Active,W,T,Yes,No,No,Wile,Acme,,,,"]).as_bytes())
            .unwrap();
        session.clear();
        assert!(!session.has_data());
        assert!(matches!(session.save_notes(0, [("needs", "x")]), Err(RegistryError::NoData)));
    }
}
