//! Runtime configuration from environment variables
//!
//! - `CLIENT_REGISTRY_SCHEMA`: built-in version (`v1`, `v2`, `latest`) or a
//!   path to a schema JSON file. Defaults to `v1`.
//! - `CLIENT_REGISTRY_SUGGEST_THRESHOLD`: name suggestion similarity
//!   threshold between 0 and 1. Defaults to 0.85.

use crate::error::{RegistryError, Result};
use crate::fuzzy_matcher::FuzzyMatcher;
use crate::schema::Schema;
use crate::session::ClientSession;
use serde::{Deserialize, Serialize};

pub const SCHEMA_ENV: &str = "CLIENT_REGISTRY_SCHEMA";
pub const SUGGEST_THRESHOLD_ENV: &str = "CLIENT_REGISTRY_SUGGEST_THRESHOLD";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Built-in schema version or path to a schema file
    pub schema: String,
    pub suggest_threshold: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            schema: "v1".to_string(),
            suggest_threshold: 0.85,
        }
    }
}

impl RegistryConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(schema) = lookup(SCHEMA_ENV).filter(|s| !s.trim().is_empty()) {
            config.schema = schema.trim().to_string();
        }

        if let Some(raw) = lookup(SUGGEST_THRESHOLD_ENV) {
            let threshold: f64 = raw.trim().parse().map_err(|_| {
                RegistryError::Config(format!("{} must be a number, got '{}'", SUGGEST_THRESHOLD_ENV, raw))
            })?;
            config.suggest_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.suggest_threshold) {
            return Err(RegistryError::Config(format!(
                "suggest threshold must be between 0 and 1, got {}",
                self.suggest_threshold
            )));
        }
        Ok(())
    }

    pub fn load_schema(&self) -> Result<Schema> {
        Schema::resolve(&self.schema)
    }

    pub fn matcher(&self) -> FuzzyMatcher {
        FuzzyMatcher::new(self.suggest_threshold)
    }

    /// New session using the configured schema and matcher
    pub fn session(&self) -> Result<ClientSession> {
        Ok(ClientSession::with_matcher(self.load_schema()?, self.matcher()))
    }
}
