//! Rule configuration document (the persisted, hot-reloadable form of the rule store).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CreaseError, Field, FieldType, SourceId};

/// Extraction rules for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRules {
    /// Human-readable source name.
    pub name: String,
    /// Base URL match pages are resolved against.
    pub base_url: String,
    /// Primary rule per field.
    pub selectors: BTreeMap<Field, String>,
    /// Ordered per-source fallbacks per field.
    #[serde(default)]
    pub fallback_selectors: BTreeMap<Field, Vec<String>>,
}

/// Settings for rule auto-repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoDetection {
    /// Master switch for auto-repair.
    pub enabled: bool,
    /// Minimum similarity in `[0, 1]` for a variant to be ranked ahead of generic guesses.
    pub fuzzy_match_threshold: f64,
    /// Maximum variants tested per repair attempt.
    pub max_attempts: usize,
    /// Generic rule patterns per field type, tried as repair candidates.
    #[serde(default)]
    pub search_patterns: BTreeMap<FieldType, Vec<String>>,
}

impl Default for AutoDetection {
    fn default() -> Self {
        Self {
            enabled: true,
            fuzzy_match_threshold: 0.6,
            max_attempts: 20,
            search_patterns: BTreeMap::new(),
        }
    }
}

/// Complete rule configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    /// Monotonic version id.
    pub version: u64,
    /// Time of the last change.
    pub last_updated: DateTime<Utc>,
    /// Rules per source.
    pub sources: BTreeMap<SourceId, SourceRules>,
    /// Store-wide fallbacks per field type.
    #[serde(default)]
    pub global_fallbacks: BTreeMap<FieldType, Vec<String>>,
    /// Auto-repair settings.
    #[serde(default)]
    pub auto_detection: AutoDetection,
}

impl Default for RuleDocument {
    fn default() -> Self {
        Self {
            version: 1,
            last_updated: Utc::now(),
            sources: BTreeMap::new(),
            global_fallbacks: BTreeMap::new(),
            auto_detection: AutoDetection::default(),
        }
    }
}

impl RuleDocument {
    /// Parse a document from JSON and validate it.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when the JSON is malformed or the document fails [`validate`](Self::validate).
    pub fn from_json(text: &str) -> Result<Self, CreaseError> {
        let doc: Self = serde_json::from_str(text)
            .map_err(|e| CreaseError::InvalidConfig(format!("rule document: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if serialization fails.
    pub fn to_json(&self) -> Result<String, CreaseError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CreaseError::InvalidConfig(format!("rule document: {e}")))
    }

    /// Check structural sanity: non-empty base URLs and rules, thresholds in range.
    ///
    /// # Errors
    /// Returns `InvalidConfig` or `InvalidRule` describing the first problem found.
    pub fn validate(&self) -> Result<(), CreaseError> {
        for (id, src) in &self.sources {
            if src.base_url.trim().is_empty() {
                return Err(CreaseError::InvalidConfig(format!(
                    "source {id} has an empty baseUrl"
                )));
            }
            for (field, rule) in &src.selectors {
                check_rule(id, *field, rule)?;
            }
            for (field, rules) in &src.fallback_selectors {
                for rule in rules {
                    check_rule(id, *field, rule)?;
                }
            }
        }
        for (kind, rules) in &self.global_fallbacks {
            if rules.iter().any(|r| r.trim().is_empty()) {
                return Err(CreaseError::InvalidConfig(format!(
                    "empty global fallback rule for {kind}"
                )));
            }
        }
        let t = self.auto_detection.fuzzy_match_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(CreaseError::InvalidConfig(format!(
                "fuzzyMatchThreshold {t} outside [0, 1]"
            )));
        }
        Ok(())
    }
}

fn check_rule(source: &SourceId, field: Field, rule: &str) -> Result<(), CreaseError> {
    if rule.trim().is_empty() {
        return Err(CreaseError::invalid_rule(source.clone(), field, "rule is empty"));
    }
    Ok(())
}
