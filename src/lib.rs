//! Client registry - ingestion, validation and in-memory lookup of client
//! CSV exports.
//!
//! Pipeline: a raw [`Table`] is checked against a [`Schema`] and coerced by
//! [`ingest()`], loaded into a [`ClientRegistry`], and read through
//! [`ClientQueries`]. [`ClientSession`] ties these together for one user.

pub mod coercion;
pub mod config;
pub mod error;
pub mod fuzzy_matcher;
pub mod ingest;
pub mod query;
pub mod record;
pub mod registry;
pub mod schema;
pub mod session;
pub mod table;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use fuzzy_matcher::FuzzyMatcher;
pub use ingest::{ingest, IngestOutcome, IngestResult, InvalidRow};
pub use query::{CategoryCount, ClientQueries, NumericSummary};
pub use record::ClientRecord;
pub use registry::ClientRegistry;
pub use schema::{FieldDescriptor, Schema, SemanticType};
pub use session::{ClientSession, UploadReport};
pub use table::{Cell, Table};
