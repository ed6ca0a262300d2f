use lazy_static::lazy_static;
use regex::Regex;
use strsim::jaro_winkler;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
    static ref LEADING_ARTICLE: Regex = Regex::new(r"^the\s+").expect("valid article pattern");
    static ref COMPANY_SUFFIX: Regex =
        Regex::new(r"\s+(inc|llc|ltd|co|corp|corporation|company|limited)$").expect("valid suffix pattern");
}

/// Fuzzy matcher for business names with spelling and suffix variations
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    /// Similarity threshold (0.0-1.0) for considering two names a match
    pub similarity_threshold: f64,
    /// Whether to normalize names before comparison
    pub normalize: bool,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            normalize: true,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            similarity_threshold: threshold,
            normalize: true,
        }
    }

    /// Normalize a business name for fuzzy matching
    /// - Converts to lowercase
    /// - Removes punctuation
    /// - Normalizes whitespace
    /// - Drops a leading "the" and a trailing company suffix (Inc, LLC, ...)
    pub fn normalize_string(&self, s: &str) -> String {
        if !self.normalize {
            return s.to_lowercase();
        }

        // Punctuation first so "Acme, Inc." ends in a bare "inc"
        let stripped: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
        let without_article = LEADING_ARTICLE.replace(&collapsed, "");
        let without_suffix = COMPANY_SUFFIX.replace(&without_article, "");

        without_suffix.trim().to_string()
    }

    /// Similarity between two names, 0.0 to 1.0 (higher = more similar)
    pub fn similarity(&self, s1: &str, s2: &str) -> f64 {
        let norm1 = self.normalize_string(s1);
        let norm2 = self.normalize_string(s2);

        let jw_score = jaro_winkler(&norm1, &norm2);

        // Substring bonus for "Acme" vs "Acme Rockets", scaled down as the
        // length difference grows
        let is_substring = norm1.contains(&norm2) || norm2.contains(&norm1);
        let substring_bonus = if is_substring && !norm1.is_empty() && !norm2.is_empty() {
            let len_diff = (norm1.len() as f64 - norm2.len() as f64).abs();
            let max_len = norm1.len().max(norm2.len()) as f64;
            (1.0 - (len_diff / max_len)) * 0.1
        } else {
            0.0
        };

        (jw_score + substring_bonus).min(1.0)
    }

    pub fn is_match(&self, s1: &str, s2: &str) -> bool {
        self.similarity(s1, s2) >= self.similarity_threshold
    }

    /// Candidates at or above the threshold, best first; equal scores keep
    /// candidate order. Repeated candidates are reported once.
    pub fn suggest<'a, I>(&self, term: &str, candidates: I, limit: usize) -> Vec<(&'a str, f64)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut scored: Vec<(&'a str, f64)> = Vec::new();
        for candidate in candidates {
            if scored.iter().any(|(seen, _)| *seen == candidate) {
                continue;
            }
            let score = self.similarity(term, candidate);
            if score >= self.similarity_threshold {
                scored.push((candidate, score));
            }
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }
}
