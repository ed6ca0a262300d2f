//! Schema Registry - Versioned column sets for client exports
//!
//! A schema is configuration, not code: the built-in versions are JSON
//! documents embedded at compile time, and any other version can be loaded
//! from a file with the same shape.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const SCHEMA_V1: &str = include_str!("../schemas/v1.json");
const SCHEMA_V2: &str = include_str!("../schemas/v2.json");

/// Version returned for `latest`
pub const LATEST_VERSION: &str = "v2";

/// Column that keys every client record
pub const KEY_COLUMN: &str = "business_name";

/// How a column's text cells are interpreted
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Coerced to f64 or null
    Numeric,
    /// Kept as text, read through the truthiness rule
    BooleanLike,
    /// Free text
    Text,
}

impl SemanticType {
    pub fn type_name(&self) -> &'static str {
        match self {
            SemanticType::Numeric => "numeric",
            SemanticType::BooleanLike => "boolean_like",
            SemanticType::Text => "text",
        }
    }
}

/// A required column and its semantic type
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
        }
    }
}

/// Versioned client export schema
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Required columns, in the order they are reported when missing
    pub columns: Vec<FieldDescriptor>,

    /// Optional free-text note fields, materialized empty when absent
    #[serde(default)]
    pub note_fields: Vec<String>,
}

impl Schema {
    pub fn new(version: impl Into<String>, columns: Vec<FieldDescriptor>, note_fields: Vec<String>) -> Self {
        Self {
            version: version.into(),
            description: None,
            columns,
            note_fields,
        }
    }

    /// Built-in schema by version name (`v1`, `v2` or `latest`)
    pub fn builtin(version: &str) -> Result<Self> {
        let source = match version {
            "v1" => SCHEMA_V1,
            "v2" => SCHEMA_V2,
            "latest" => return Self::builtin(LATEST_VERSION),
            other => return Err(RegistryError::UnknownSchemaVersion(other.to_string())),
        };
        Self::from_json_str(source)
    }

    pub fn builtin_versions() -> &'static [&'static str] {
        &["v1", "v2"]
    }

    /// Parse and structurally validate a schema document
    pub fn from_json_str(source: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(source)
            .map_err(|e| RegistryError::InvalidSchema(format!("malformed schema document: {}", e)))?;
        schema.validate_structure()?;
        Ok(schema)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Resolve either a built-in version name or a path to a schema file
    pub fn resolve(version_or_path: &str) -> Result<Self> {
        if version_or_path == "latest" || Self::builtin_versions().contains(&version_or_path) {
            return Self::builtin(version_or_path);
        }
        let path = Path::new(version_or_path);
        if path.exists() {
            return Self::from_path(path);
        }
        Err(RegistryError::UnknownSchemaVersion(version_or_path.to_string()))
    }

    pub fn validate_structure(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(RegistryError::InvalidSchema(format!(
                "schema '{}' declares no columns",
                self.version
            )));
        }

        if self.column(KEY_COLUMN).is_none() {
            return Err(RegistryError::InvalidSchema(format!(
                "schema '{}' must declare '{}'",
                self.version, KEY_COLUMN
            )));
        }

        let mut seen = HashSet::new();
        for name in self.columns.iter().map(|c| c.name.as_str()).chain(self.note_fields.iter().map(|n| n.as_str())) {
            if !seen.insert(name) {
                return Err(RegistryError::InvalidSchema(format!(
                    "schema '{}' declares '{}' more than once",
                    self.version, name
                )));
            }
        }

        Ok(())
    }

    pub fn required_columns(&self) -> &[FieldDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&FieldDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn semantic_type(&self, name: &str) -> Option<SemanticType> {
        self.column(name).map(|c| c.semantic_type)
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.semantic_type == SemanticType::Numeric)
            .map(|c| c.name.as_str())
    }

    pub fn note_fields(&self) -> &[String] {
        &self.note_fields
    }

    /// Resolve an input column or user-supplied field name to a declared
    /// note field. "current problem" and "current_problem" are the same field.
    pub fn note_field(&self, name: &str) -> Option<&str> {
        resolve_note_field(&self.note_fields, name)
    }
}

/// Match `name` against declared note fields, treating spaces as underscores
pub fn resolve_note_field<'a>(note_fields: &'a [String], name: &str) -> Option<&'a str> {
    let normalized = name.trim().replace(' ', "_");
    note_fields
        .iter()
        .find(|f| **f == normalized)
        .map(|f| f.as_str())
}
