//! Query/Aggregation facade - read-only views for detail, search and chart
//! consumers

use crate::fuzzy_matcher::FuzzyMatcher;
use crate::record::ClientRecord;
use crate::registry::ClientRegistry;
use crate::table::Cell;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Activity flag columns across schema versions
pub const ACTIVITY_FLAGS: &[&str] = &["contacted", "marketed", "emailed"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

pub struct ClientQueries<'a> {
    registry: &'a ClientRegistry,
    matcher: FuzzyMatcher,
}

impl<'a> ClientQueries<'a> {
    pub fn new(registry: &'a ClientRegistry) -> Self {
        Self {
            registry,
            matcher: FuzzyMatcher::default(),
        }
    }

    pub fn with_matcher(registry: &'a ClientRegistry, matcher: FuzzyMatcher) -> Self {
        Self { registry, matcher }
    }

    pub fn registry(&self) -> &'a ClientRegistry {
        self.registry
    }

    pub fn duplicate_names(&self) -> BTreeSet<String> {
        self.registry.duplicate_names()
    }

    /// Every record whose business name is shared, in input order
    pub fn duplicate_records(&self) -> Vec<(usize, &'a ClientRecord)> {
        let duplicates = self.registry.duplicate_names();
        self.registry
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| duplicates.contains(&r.business_name))
            .collect()
    }

    /// Distinct business names, sorted
    pub fn client_names(&self) -> Vec<&'a str> {
        self.registry
            .records()
            .iter()
            .map(|r| r.business_name.as_str())
            .unique()
            .sorted()
            .collect()
    }

    /// Count of records whose flag reads true, per requested flag. Numeric
    /// (`1`/`0`) and text (`Yes`/`no`) encodings are read the same way; a
    /// column the registry does not carry counts zero.
    pub fn boolean_flag_counts<S: AsRef<str>>(&self, flags: &[S]) -> BTreeMap<String, usize> {
        flags
            .iter()
            .map(|flag| {
                let flag = flag.as_ref();
                let count = self.registry.records().iter().filter(|r| r.flag(flag)).count();
                (flag.to_string(), count)
            })
            .collect()
    }

    /// Non-null numeric values of a column in record order. Text columns
    /// are read with the numeric coercion rule.
    pub fn numeric_distribution(&self, column: &str) -> Vec<f64> {
        self.registry
            .records()
            .iter()
            .filter_map(|r| r.value(column))
            .filter_map(|cell| match cell {
                Cell::Number(v) => Some(v),
                Cell::Text(s) => crate::coercion::coerce_numeric(&s),
                Cell::Null => None,
            })
            .collect()
    }

    pub fn numeric_summary(&self, column: &str) -> Option<NumericSummary> {
        let values = self.numeric_distribution(column);
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(NumericSummary {
            count: values.len(),
            min,
            max,
            mean,
        })
    }

    /// Value counts of a column, largest first. Ties keep the order in
    /// which categories first appear; null and empty cells are skipped.
    pub fn categorical_counts(&self, column: &str) -> Vec<CategoryCount> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for record in self.registry.records() {
            let Some(category) = record.value(column).and_then(|c| c.to_display_text()) else {
                continue;
            };
            let entry = counts.entry(category.clone()).or_insert(0);
            if *entry == 0 {
                order.push(category);
            }
            *entry += 1;
        }

        let mut out: Vec<CategoryCount> = order
            .into_iter()
            .map(|category| {
                let count = counts[&category];
                CategoryCount { category, count }
            })
            .collect();
        // stable: equal counts stay in first-seen order
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }

    /// Business names resembling `term`, best first. Separate from search so
    /// that "no results" is never replaced by guesses.
    pub fn suggest_names(&self, term: &str, limit: usize) -> Vec<&'a str> {
        self.matcher
            .suggest(
                term,
                self.registry.records().iter().map(|r| r.business_name.as_str()),
                limit,
            )
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }
}
