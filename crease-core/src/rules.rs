//! Versioned extraction rules with atomic hot reload.
//!
//! The store holds one immutable [`RuleSnapshot`] behind a lock and replaces it
//! wholesale on every change. Readers clone the `Arc` and keep a consistent view
//! for the duration of a scrape even if a reload lands concurrently.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::{AutoDetection, CreaseError, Field, FieldType, RuleDocument, SourceId, SourceRules};

/// Immutable, fully-formed rule set at one version.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    document: RuleDocument,
}

impl RuleSnapshot {
    /// Monotonic version id.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.document.version
    }

    /// Time of the last change.
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.document.last_updated
    }

    /// Underlying document.
    #[must_use]
    pub const fn document(&self) -> &RuleDocument {
        &self.document
    }

    /// Rules of one source.
    #[must_use]
    pub fn source(&self, source: &SourceId) -> Option<&SourceRules> {
        self.document.sources.get(source)
    }

    /// Primary rule for a field.
    #[must_use]
    pub fn primary(&self, source: &SourceId, field: Field) -> Option<&str> {
        self.source(source)
            .and_then(|s| s.selectors.get(&field))
            .map(String::as_str)
    }

    /// Full resolution chain for a field: primary, per-source fallbacks, then
    /// global fallbacks for the field's type, without duplicates.
    #[must_use]
    pub fn chain(&self, source: &SourceId, field: Field) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |rule: &String| {
            if !out.iter().any(|r| r == rule) {
                out.push(rule.clone());
            }
        };
        if let Some(src) = self.source(source) {
            if let Some(rule) = src.selectors.get(&field) {
                push(rule);
            }
            for rule in src.fallback_selectors.get(&field).into_iter().flatten() {
                push(rule);
            }
        }
        for rule in self
            .document
            .global_fallbacks
            .get(&field.field_type())
            .into_iter()
            .flatten()
        {
            push(rule);
        }
        out
    }

    /// Auto-repair settings.
    #[must_use]
    pub const fn auto_detection(&self) -> &AutoDetection {
        &self.document.auto_detection
    }

    /// Generic search patterns for a field type.
    #[must_use]
    pub fn search_patterns(&self, kind: FieldType) -> &[String] {
        self.document
            .auto_detection
            .search_patterns
            .get(&kind)
            .map_or(&[], Vec::as_slice)
    }
}

/// Thread-safe holder of the current rule snapshot.
pub struct RuleStore {
    current: RwLock<Arc<RuleSnapshot>>,
    backing_file: Mutex<Option<PathBuf>>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleDocument::default())
    }
}

impl RuleStore {
    /// Create a store from a document. The document is not validated here;
    /// use [`RuleStore::from_json`] or [`RuleStore::load_file`] for untrusted input.
    #[must_use]
    pub fn new(document: RuleDocument) -> Self {
        Self {
            current: RwLock::new(Arc::new(RuleSnapshot { document })),
            backing_file: Mutex::new(None),
        }
    }

    /// Parse and validate a JSON document into a new store.
    ///
    /// # Errors
    /// Returns `InvalidConfig`/`InvalidRule` if the document is malformed.
    pub fn from_json(text: &str) -> Result<Self, CreaseError> {
        Ok(Self::new(RuleDocument::from_json(text)?))
    }

    /// Load a store from a JSON file and remember the path for reloads and saves.
    ///
    /// # Errors
    /// Returns `Io` when the file cannot be read, or a validation error.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CreaseError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CreaseError::Io(format!("{}: {e}", path.display())))?;
        let store = Self::from_json(&text)?;
        *store.backing_file.lock().expect("mutex poisoned") = Some(path.to_path_buf());
        Ok(store)
    }

    /// Current snapshot. Cheap; clones an `Arc`.
    ///
    /// # Panics
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleSnapshot> {
        self.current.read().expect("rwlock poisoned").clone()
    }

    /// Current version id.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Primary rule for a field, if configured.
    #[must_use]
    pub fn rule(&self, source: &SourceId, field: Field) -> Option<String> {
        self.snapshot().primary(source, field).map(str::to_string)
    }

    /// Resolution chain for a field (see [`RuleSnapshot::chain`]).
    #[must_use]
    pub fn chain(&self, source: &SourceId, field: Field) -> Vec<String> {
        self.snapshot().chain(source, field)
    }

    /// Base URL of a source, if configured.
    #[must_use]
    pub fn base_url(&self, source: &SourceId) -> Option<String> {
        self.snapshot().source(source).map(|s| s.base_url.clone())
    }

    /// Replace the whole document after validation.
    ///
    /// The committed version is the larger of the incoming version and the
    /// current version plus one, so versions never go backwards.
    ///
    /// # Errors
    /// Returns a validation error and keeps the current snapshot untouched.
    pub fn replace(&self, mut document: RuleDocument) -> Result<u64, CreaseError> {
        document.validate()?;
        let mut guard = self.current.write().expect("rwlock poisoned");
        document.version = document.version.max(guard.version() + 1);
        let version = document.version;
        *guard = Arc::new(RuleSnapshot { document });
        drop(guard);
        #[cfg(feature = "tracing")]
        tracing::info!(version, "rule store replaced");
        Ok(version)
    }

    /// Validate and commit a single primary rule, producing a new version.
    ///
    /// Passing `probe` additionally requires the rule to produce text on that
    /// page before it is committed.
    ///
    /// # Errors
    /// Returns `UnknownSource` for an unconfigured source or `InvalidRule` when
    /// the rule is malformed or does not match the probe page.
    pub fn update_rule(
        &self,
        source: &SourceId,
        field: Field,
        rule: &str,
        probe: Option<&dyn crate::PageExtractor>,
    ) -> Result<u64, CreaseError> {
        validate_rule_syntax(source, field, rule)?;
        if let Some(page) = probe
            && page.query_text(rule).is_empty()
        {
            return Err(CreaseError::invalid_rule(
                source.clone(),
                field,
                format!("rule matched nothing on {}", page.url()),
            ));
        }

        let mut guard = self.current.write().expect("rwlock poisoned");
        let mut document = guard.document.clone();
        let Some(src) = document.sources.get_mut(source) else {
            return Err(CreaseError::UnknownSource(source.to_string()));
        };
        src.selectors.insert(field, rule.trim().to_string());
        document.version = guard.version() + 1;
        document.last_updated = Utc::now();
        let version = document.version;
        *guard = Arc::new(RuleSnapshot { document });
        drop(guard);

        #[cfg(feature = "tracing")]
        tracing::info!(source = %source, field = %field, rule, version, "rule updated");
        Ok(version)
    }

    /// Re-read the backing file and swap it in.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when no backing file is known, `Io` on read
    /// failure, or a validation error; the current snapshot stays in place.
    pub fn reload(&self) -> Result<u64, CreaseError> {
        let path = self
            .backing_file
            .lock()
            .expect("mutex poisoned")
            .clone()
            .ok_or_else(|| CreaseError::InvalidConfig("rule store has no backing file".into()))?;
        self.reload_from_file(&path)
    }

    /// Read `path` and swap it in.
    ///
    /// # Errors
    /// Returns `Io` on read failure or a validation error.
    pub fn reload_from_file(&self, path: &Path) -> Result<u64, CreaseError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CreaseError::Io(format!("{}: {e}", path.display())))?;
        let document = RuleDocument::from_json(&text)?;
        self.replace(document)
    }

    /// Load `path` into this store and make it the backing file.
    ///
    /// # Errors
    /// Returns `Io` on read failure or a validation error; neither the
    /// snapshot nor the backing file changes then.
    pub fn attach_file(&self, path: impl AsRef<Path>) -> Result<u64, CreaseError> {
        let path = path.as_ref();
        let version = self.reload_from_file(path)?;
        *self.backing_file.lock().expect("mutex poisoned") = Some(path.to_path_buf());
        Ok(version)
    }

    /// Persist the current snapshot to `path` (or the backing file when `None`).
    ///
    /// # Errors
    /// Returns `InvalidConfig` when there is nowhere to write, or `Io` on write failure.
    pub fn save_file(&self, path: Option<&Path>) -> Result<(), CreaseError> {
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => self
                .backing_file
                .lock()
                .expect("mutex poisoned")
                .clone()
                .ok_or_else(|| {
                    CreaseError::InvalidConfig("rule store has no backing file".into())
                })?,
        };
        let json = self.snapshot().document().to_json()?;
        std::fs::write(&target, json)
            .map_err(|e| CreaseError::Io(format!("{}: {e}", target.display())))
    }

    /// Watch `path` and reload the store whenever the file is written.
    ///
    /// Invalid documents are ignored and the previous snapshot stays current.
    /// The watch stops when the returned handle is dropped.
    ///
    /// # Errors
    /// Returns `Io` when the watcher cannot be installed.
    pub fn watch(self: &Arc<Self>, path: impl Into<PathBuf>) -> Result<RuleWatcher, CreaseError> {
        let path: PathBuf = path.into();
        *self.backing_file.lock().expect("mutex poisoned") = Some(path.clone());
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let store = Arc::downgrade(self);
        let target = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let Ok(event) = res else { return };
            if !touches(&event, &target) {
                return;
            }
            if let Some(store) = store.upgrade() {
                let outcome = store.reload_from_file(&target);
                #[cfg(feature = "tracing")]
                match &outcome {
                    Ok(version) => tracing::info!(version, "rule file reloaded"),
                    Err(e) => tracing::warn!(error = %e, "rule file reload rejected"),
                }
                let _ = outcome;
            }
        })
        .map_err(|e| CreaseError::Io(e.to_string()))?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| CreaseError::Io(e.to_string()))?;
        Ok(RuleWatcher { _watcher: watcher })
    }
}

/// Keeps a rule file watch alive.
pub struct RuleWatcher {
    _watcher: RecommendedWatcher,
}

fn touches(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p == target || p.file_name() == target.file_name())
}

/// Reject rules that cannot be a selector: empty, control characters, or
/// unbalanced brackets and quotes.
fn validate_rule_syntax(source: &SourceId, field: Field, rule: &str) -> Result<(), CreaseError> {
    let rule = rule.trim();
    if rule.is_empty() {
        return Err(CreaseError::invalid_rule(source.clone(), field, "rule is empty"));
    }
    if rule.chars().any(char::is_control) {
        return Err(CreaseError::invalid_rule(
            source.clone(),
            field,
            "rule contains control characters",
        ));
    }
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    for c in rule.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | '(' => stack.push(c),
            ']' if stack.pop() != Some('[') => {
                return Err(CreaseError::invalid_rule(source.clone(), field, "unbalanced ']'"));
            }
            ')' if stack.pop() != Some('(') => {
                return Err(CreaseError::invalid_rule(source.clone(), field, "unbalanced ')'"));
            }
            _ => {}
        }
    }
    if quote.is_some() || !stack.is_empty() {
        return Err(CreaseError::invalid_rule(
            source.clone(),
            field,
            "unterminated bracket or quote",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn doc() -> RuleDocument {
        let mut selectors = BTreeMap::new();
        selectors.insert(Field::Team1Name, ".team-1 .name".to_string());
        let mut fallback_selectors = BTreeMap::new();
        fallback_selectors.insert(
            Field::Team1Name,
            vec!["#team1".to_string(), ".team-1 .name".to_string()],
        );
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::new("alpha"),
            SourceRules {
                name: "Alpha".into(),
                base_url: "https://alpha.example".into(),
                selectors,
                fallback_selectors,
            },
        );
        let mut global_fallbacks = BTreeMap::new();
        global_fallbacks.insert(FieldType::TeamName, vec!["[data-team]".to_string()]);
        RuleDocument {
            version: 4,
            sources,
            global_fallbacks,
            ..RuleDocument::default()
        }
    }

    #[test]
    fn chain_orders_primary_fallback_global_without_duplicates() {
        let store = RuleStore::new(doc());
        let chain = store.chain(&SourceId::new("alpha"), Field::Team1Name);
        assert_eq!(chain, vec![".team-1 .name", "#team1", "[data-team]"]);
    }

    #[test]
    fn unknown_field_resolves_to_global_only() {
        let store = RuleStore::new(doc());
        let chain = store.chain(&SourceId::new("alpha"), Field::Team2Name);
        assert_eq!(chain, vec!["[data-team]"]);
        assert!(store.chain(&SourceId::new("alpha"), Field::Commentary).is_empty());
    }

    #[test]
    fn update_rule_bumps_version_and_keeps_old_snapshot_intact() {
        let store = RuleStore::new(doc());
        let before = store.snapshot();
        let v = store
            .update_rule(&SourceId::new("alpha"), Field::Team1Name, ".t1-name", None)
            .unwrap();
        assert_eq!(v, 5);
        assert_eq!(before.primary(&SourceId::new("alpha"), Field::Team1Name), Some(".team-1 .name"));
        assert_eq!(store.rule(&SourceId::new("alpha"), Field::Team1Name).as_deref(), Some(".t1-name"));
    }

    #[test]
    fn update_rule_rejects_bad_syntax_and_unknown_source() {
        let store = RuleStore::new(doc());
        let alpha = SourceId::new("alpha");
        assert!(store.update_rule(&alpha, Field::Team1Name, "div[class='x'", None).is_err());
        assert!(store.update_rule(&alpha, Field::Team1Name, "  ", None).is_err());
        assert!(matches!(
            store.update_rule(&SourceId::new("nope"), Field::Team1Name, ".x", None),
            Err(CreaseError::UnknownSource(_))
        ));
        assert_eq!(store.version(), 4);
    }

    #[test]
    fn replace_never_moves_version_backwards() {
        let store = RuleStore::new(doc());
        let mut older = doc();
        older.version = 1;
        assert_eq!(store.replace(older).unwrap(), 5);
    }

    #[test]
    fn save_and_reload_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let store = RuleStore::new(doc());
        store.save_file(Some(&path)).unwrap();

        let loaded = RuleStore::load_file(&path).unwrap();
        assert_eq!(loaded.version(), 4);

        let mut edited = doc();
        edited.version = 10;
        std::fs::write(&path, edited.to_json().unwrap()).unwrap();
        assert_eq!(loaded.reload().unwrap(), 10);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(loaded.reload().is_err());
        assert_eq!(loaded.version(), 10);
    }

    #[test]
    fn attach_file_loads_into_an_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let store = RuleStore::new(doc());
        assert!(store.attach_file(&path).is_err());
        assert!(store.reload().is_err());

        let mut edited = doc();
        edited.version = 2;
        std::fs::write(&path, edited.to_json().unwrap()).unwrap();
        assert_eq!(store.attach_file(&path).unwrap(), 5);
        assert_eq!(store.reload().unwrap(), 6);
    }
}
