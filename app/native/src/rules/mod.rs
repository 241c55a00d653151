//! Grouping rules and the store they are read from.
//!
//! A rule maps keywords to a group name. Rules live in a single ordered list;
//! the order doubles as priority (see [`crate::grouping`]). The reconciler
//! never edits rules, it only reads the list and reacts to changes.
//!
//! # Rule File Format
//!
//! ```text
//! [
//!   { "id": 1, "groupName": "Team A", "keywords": ["Alpha", "alpha-ops"] },
//!   { "id": 2, "groupName": "Clients", "keywords": ["[C]"], "backgroundColor": "#fff4e5" }
//! ]
//! ```
//!
//! Reading is fail-closed: a missing, unreadable or non-array document yields
//! an empty list. Individual entries that are not rule objects are dropped.

mod watcher;

use std::fs;
use std::path::Path;

use eyeball::{SharedObservable, Subscriber};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use watcher::{FileWatcher, watch_file, watch_rules_file};

use crate::constants::colors;

// ============================================================================
// Rule
// ============================================================================

/// Keywords of a rule as found in storage.
///
/// Anything other than a list of strings is kept as [`Keywords::Malformed`]
/// so the rest of the rule list still loads; malformed rules match nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    /// Well-formed keyword list.
    List(Vec<String>),
    /// Any other JSON value.
    Malformed(serde_json::Value),
}

impl Default for Keywords {
    fn default() -> Self { Self::Malformed(serde_json::Value::Null) }
}

impl Keywords {
    /// Returns the keywords if well-formed.
    #[must_use]
    pub fn as_slice(&self) -> Option<&[String]> {
        match self {
            Self::List(list) => Some(list),
            Self::Malformed(_) => None,
        }
    }
}

/// A keyword-to-group rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique identifier assigned by the rule editor.
    #[serde(default)]
    pub id: i64,

    /// Name shown in the group header. Also keys the open/closed state.
    pub group_name: String,

    /// Substrings matched against room names (case-sensitive, any of).
    #[serde(default)]
    #[schemars(with = "Vec<String>")]
    pub keywords: Keywords,

    /// Header background color (CSS).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    /// Header text color (CSS).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

impl Rule {
    /// Creates a rule with default colors.
    #[must_use]
    pub fn new(id: i64, group_name: &str, keywords: &[&str]) -> Self {
        Self {
            id,
            group_name: group_name.to_string(),
            keywords: Keywords::List(keywords.iter().map(|kw| (*kw).to_string()).collect()),
            background_color: None,
            text_color: None,
        }
    }

    /// Returns `true` if the keywords are not a list of strings.
    #[must_use]
    pub const fn is_malformed(&self) -> bool { matches!(self.keywords, Keywords::Malformed(_)) }

    /// Returns `true` if `name` contains any keyword. Malformed rules match nothing.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.keywords.as_slice().is_some_and(|keywords| keywords.iter().any(|kw| name.contains(kw.as_str())))
    }

    /// Header background, falling back to the default.
    #[must_use]
    pub fn background_color(&self) -> &str {
        self.background_color.as_deref().unwrap_or(colors::DEFAULT_BACKGROUND)
    }

    /// Header text color, falling back to the default.
    #[must_use]
    pub fn text_color(&self) -> &str { self.text_color.as_deref().unwrap_or(colors::DEFAULT_TEXT) }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a JSON/JSONC rule list, dropping anything that is not a rule.
///
/// Never fails: a document that is not an array yields an empty list.
#[must_use]
pub fn parse_rules(text: &str) -> Vec<Rule> {
    let reader = json_comments::StripComments::new(text.as_bytes());
    let value: serde_json::Value = match serde_json::from_reader(reader) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "rule list is not valid JSON, treating as empty");
            return Vec::new();
        }
    };

    let serde_json::Value::Array(entries) = value else {
        tracing::warn!("rule list is not an array, treating as empty");
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Rule>(entry) {
            Ok(rule) => Some(rule),
            Err(err) => {
                tracing::warn!(index, error = %err, "dropping invalid rule entry");
                None
            }
        })
        .collect()
}

/// A problem found by [`check_rules`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleIssue {
    /// Position of the entry, `None` for document-level problems.
    pub index: Option<usize>,
    /// What is wrong.
    pub message: String,
}

/// Reports every entry that [`parse_rules`] would drop or that would never match.
#[must_use]
pub fn check_rules(text: &str) -> Vec<RuleIssue> {
    let document = |message: String| vec![RuleIssue { index: None, message }];

    let reader = json_comments::StripComments::new(text.as_bytes());
    let value: serde_json::Value = match serde_json::from_reader(reader) {
        Ok(value) => value,
        Err(err) => return document(format!("not valid JSON: {err}")),
    };
    let serde_json::Value::Array(entries) = value else {
        return document("top level is not an array".to_string());
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let message = match serde_json::from_value::<Rule>(entry) {
                Err(err) => format!("dropped: {err}"),
                Ok(rule) if rule.is_malformed() => {
                    format!("\"{}\": keywords must be a list of strings", rule.group_name)
                }
                Ok(_) => return None,
            };
            Some(RuleIssue { index: Some(index), message })
        })
        .collect()
}

/// Reads a rule file. Missing or unreadable files yield an empty list.
#[must_use]
pub fn load_rules(path: &Path) -> Vec<Rule> {
    match fs::read_to_string(path) {
        Ok(text) => parse_rules(&text),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "rule file unavailable");
            Vec::new()
        }
    }
}

/// Creates the rule file with an empty list if it does not exist.
///
/// Returns `true` if a file was created.
///
/// # Errors
///
/// Returns an error if the parent directory or the file cannot be created.
pub fn ensure_rules_file(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, "[]\n")?;
    tracing::info!(path = %path.display(), "created empty rule file");
    Ok(true)
}

// ============================================================================
// Rule Source
// ============================================================================

/// Read access to the persisted rule list.
pub trait RuleSource: Send + Sync {
    /// Returns the current rules in priority order. Never fails.
    fn rules(&self) -> Vec<Rule>;

    /// Subscribes to every change of the rule list.
    fn subscribe(&self) -> Subscriber<Vec<Rule>>;
}

/// Observable rule list with get/set/subscribe semantics.
#[derive(Debug, Clone)]
pub struct RuleStore {
    rules: SharedObservable<Vec<Rule>>,
}

impl Default for RuleStore {
    fn default() -> Self { Self::new(Vec::new()) }
}

impl RuleStore {
    /// Creates a store holding `rules`.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self { Self { rules: SharedObservable::new(rules) } }

    /// Creates a store loaded from a rule file.
    #[must_use]
    pub fn from_file(path: &Path) -> Self { Self::new(load_rules(path)) }

    /// Returns a copy of the current rules.
    #[must_use]
    pub fn get(&self) -> Vec<Rule> { self.rules.get() }

    /// Replaces the rule list and notifies subscribers.
    pub fn set(&self, rules: Vec<Rule>) {
        tracing::debug!(count = rules.len(), "rule list replaced");
        self.rules.set(rules);
    }

    /// Replaces the rule list only if it differs. Returns `true` if it changed.
    pub fn set_if_changed(&self, rules: Vec<Rule>) -> bool {
        self.rules.set_if_not_eq(rules).is_some()
    }

    /// Reloads from a rule file, notifying subscribers if the list changed.
    pub fn reload(&self, path: &Path) -> bool {
        let changed = self.set_if_changed(load_rules(path));
        if changed {
            tracing::info!(path = %path.display(), "rule file changed");
        }
        changed
    }
}

impl RuleSource for RuleStore {
    fn rules(&self) -> Vec<Rule> { self.get() }

    fn subscribe(&self) -> Subscriber<Vec<Rule>> { self.rules.subscribe() }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Rule
    // ========================================================================

    #[test]
    fn test_rule_matches_any_keyword() {
        let rule = Rule::new(1, "Team A", &["Alpha", "Gamma"]);

        assert!(rule.matches("Alpha Chat"));
        assert!(rule.matches("the Gamma room"));
        assert!(!rule.matches("Beta Chat"));
    }

    #[test]
    fn test_rule_match_is_case_sensitive() {
        let rule = Rule::new(1, "Team A", &["Alpha"]);

        assert!(!rule.matches("alpha chat"));
    }

    #[test]
    fn test_rule_without_keywords_matches_nothing() {
        let rule = Rule::new(1, "Empty", &[]);

        assert!(!rule.matches("anything"));
    }

    #[test]
    fn test_malformed_keywords_match_nothing() {
        let json = r#"{ "id": 1, "groupName": "Broken", "keywords": "Alpha" }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();

        assert!(rule.is_malformed());
        assert!(!rule.matches("Alpha Chat"));
    }

    #[test]
    fn test_missing_keywords_are_malformed() {
        let rule: Rule = serde_json::from_str(r#"{ "groupName": "NoKeywords" }"#).unwrap();

        assert!(rule.is_malformed());
        assert_eq!(rule.id, 0);
    }

    #[test]
    fn test_mixed_keyword_types_are_malformed() {
        let rule: Rule =
            serde_json::from_str(r#"{ "groupName": "Mixed", "keywords": ["ok", 3] }"#).unwrap();

        assert!(rule.is_malformed());
    }

    #[test]
    fn test_rule_colors_default() {
        let mut rule = Rule::new(1, "Team A", &["Alpha"]);
        assert_eq!(rule.background_color(), "#f6f8fa");
        assert_eq!(rule.text_color(), "#24292e");

        rule.background_color = Some("#ffeeee".to_string());
        assert_eq!(rule.background_color(), "#ffeeee");
    }

    #[test]
    fn test_rule_serializes_camel_case() {
        let rule = Rule::new(7, "Team A", &["Alpha"]);
        let json = serde_json::to_value(&rule).unwrap();

        assert_eq!(json["groupName"], "Team A");
        assert_eq!(json["keywords"][0], "Alpha");
        assert!(json.get("backgroundColor").is_none());
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_rules_keeps_order() {
        let rules = parse_rules(
            r#"[
                { "id": 1, "groupName": "X", "keywords": ["foo"] },
                { "id": 2, "groupName": "Y", "keywords": ["foo"] }
            ]"#,
        );

        let names: Vec<_> = rules.iter().map(|r| r.group_name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }

    #[test]
    fn test_parse_rules_accepts_comments() {
        let rules = parse_rules(
            r#"[
                // work
                { "id": 1, "groupName": "Work", "keywords": ["dev"] }
            ]"#,
        );

        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_parse_rules_fails_closed() {
        assert!(parse_rules("not json").is_empty());
        assert!(parse_rules(r#"{ "rules": [] }"#).is_empty());
        assert!(parse_rules("").is_empty());
    }

    #[test]
    fn test_parse_rules_drops_invalid_entries() {
        let rules = parse_rules(
            r#"[
                42,
                { "keywords": ["no name"] },
                { "groupName": "Kept", "keywords": ["x"] }
            ]"#,
        );

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].group_name, "Kept");
    }

    #[test]
    fn test_check_rules_reports_problems() {
        let issues = check_rules(
            r#"[
                { "groupName": "Ok", "keywords": ["x"] },
                "nope",
                { "groupName": "Broken", "keywords": "x" }
            ]"#,
        );

        let indices: Vec<_> = issues.iter().map(|issue| issue.index).collect();
        assert_eq!(indices, vec![Some(1), Some(2)]);
        assert!(issues[1].message.contains("Broken"));
    }

    #[test]
    fn test_check_rules_document_level() {
        assert_eq!(check_rules("{}")[0].index, None);
        assert!(check_rules("[]").is_empty());
    }

    #[test]
    fn test_load_rules_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(load_rules(&dir.path().join("rules.json")).is_empty());
    }

    #[test]
    fn test_ensure_rules_file_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rules.json");

        assert!(ensure_rules_file(&path).unwrap());
        assert!(!ensure_rules_file(&path).unwrap());
        assert!(load_rules(&path).is_empty());
    }

    // ========================================================================
    // Store
    // ========================================================================

    #[test]
    fn test_store_get_set() {
        let store = RuleStore::default();
        assert!(store.rules().is_empty());

        store.set(vec![Rule::new(1, "Team A", &["Alpha"])]);

        assert_eq!(store.rules().len(), 1);
    }

    #[test]
    fn test_store_set_if_changed() {
        let store = RuleStore::new(vec![Rule::new(1, "Team A", &["Alpha"])]);

        assert!(!store.set_if_changed(vec![Rule::new(1, "Team A", &["Alpha"])]));
        assert!(store.set_if_changed(Vec::new()));
    }

    #[test]
    fn test_store_reload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, r#"[{ "groupName": "Team A", "keywords": ["Alpha"] }]"#).unwrap();
        let store = RuleStore::default();

        assert!(store.reload(&path));
        assert!(!store.reload(&path));
        assert_eq!(store.get()[0].group_name, "Team A");
    }

    #[tokio::test]
    async fn test_store_subscriber_sees_updates() {
        let store = RuleStore::default();
        let mut subscriber = store.subscribe();

        store.set(vec![Rule::new(1, "Team A", &["Alpha"])]);

        let rules = subscriber.next().await.unwrap();
        assert_eq!(rules[0].group_name, "Team A");
    }
}
