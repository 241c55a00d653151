//! Configuration types for Groupy.
//!
//! The configuration file is JSONC (JSON with comments) and every field is
//! optional; missing fields fall back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{colors, host, timing};
use crate::dom::ElementMatcher;

// ============================================================================
// Host contract
// ============================================================================

/// How the room list and its entries are located in the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DomContract {
    /// `id` attribute of the monitored room list.
    pub list_id: String,

    /// Matcher selecting room entries inside the list.
    pub room: ElementMatcher,

    /// Attribute holding a room's display name.
    pub label_attribute: String,

    /// Matcher selecting a room's plain unread badge.
    pub unread_badge: ElementMatcher,

    /// Matcher selecting a room's mention badge.
    pub mention_badge: ElementMatcher,
}

impl Default for DomContract {
    fn default() -> Self {
        Self {
            list_id: host::ROOM_LIST_ID.to_string(),
            room: ElementMatcher::tag(host::ROOM_TAG).with_attribute("role", host::ROOM_ROLE),
            label_attribute: host::LABEL_ATTRIBUTE.to_string(),
            unread_badge: ElementMatcher::tag("li")
                .with_attribute("data-testid", host::UNREAD_BADGE_TEST_ID),
            mention_badge: ElementMatcher::tag("li")
                .with_attribute("data-testid", host::MENTION_BADGE_TEST_ID),
        }
    }
}

// ============================================================================
// Root configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupyConfig {
    /// Path of the rule list file. Supports `~` expansion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<String>,

    /// Quiet period after the last room list mutation before regrouping (ms).
    pub debounce_ms: u64,

    /// Retry interval while the room list is not present (ms).
    pub poll_interval_ms: u64,

    /// Header background when a rule has none.
    pub default_background_color: String,

    /// Header text color when a rule has none.
    pub default_text_color: String,

    /// Host page contract.
    pub dom: DomContract,
}

impl Default for GroupyConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            debounce_ms: timing::MUTATION_DEBOUNCE_MS,
            poll_interval_ms: timing::LIST_POLL_INTERVAL_MS,
            default_background_color: colors::DEFAULT_BACKGROUND.to_string(),
            default_text_color: colors::DEFAULT_TEXT.to_string(),
            dom: DomContract::default(),
        }
    }
}

impl GroupyConfig {
    /// Debounce delay as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }

    /// Resolves the rule file path, expanding a leading `~`.
    ///
    /// Falls back to `~/.config/groupy/rules.json` when no path is configured.
    #[must_use]
    pub fn resolved_rules_path(&self) -> Option<PathBuf> {
        self.rules_path.as_deref().map(expand_home).or_else(|| {
            dirs::home_dir().map(|home| home.join(".config").join("groupy").join(RULES_FILE_NAME))
        })
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

// ============================================================================
// Loading
// ============================================================================

/// Errors that can occur when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/groupy/config.json, \
         the platform config directory, or ~/.groupy.json"
    )]
    NotFound,

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Configuration file names in the home directory.
const HOME_CONFIG_FILE_NAMES: &[&str] = &[".groupy.jsonc", ".groupy.json"];

/// Default rule file name, next to the configuration file.
pub const RULES_FILE_NAME: &str = "rules.json";

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/groupy/config.jsonc` or `config.json`
/// 2. `~/.config/groupy/config.jsonc` or `config.json`
/// 3. `<platform config dir>/groupy/config.jsonc` or `config.json`
/// 4. `~/.groupy.jsonc` or `~/.groupy.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut push_dir = |dir: PathBuf| {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    };

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(PathBuf::from(xdg_config).join("groupy"));
    }
    if let Some(home) = dirs::home_dir() {
        push_dir(home.join(".config").join("groupy"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        push_dir(config_dir.join("groupy"));
    }

    if let Some(home) = dirs::home_dir() {
        for filename in HOME_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads the configuration from a specific path.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist,
/// `ConfigError::IoError` if it cannot be read, and
/// `ConfigError::ParseError` if it is not valid JSONC.
pub fn load_config_from_path(path: &Path) -> Result<(GroupyConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: GroupyConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from the first existing default location.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists, or the
/// error of the first file that exists but fails to load.
pub fn load_config() -> Result<(GroupyConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = GroupyConfig::default();

        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.default_background_color, "#f6f8fa");
        assert_eq!(config.default_text_color, "#24292e");
        assert_eq!(config.dom.list_id, "RoomList");
        assert_eq!(config.dom.label_attribute, "aria-label");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{ "debounceMs": 250, "dom": { "listId": "Rooms" } }"#;
        let config: GroupyConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.dom.list_id, "Rooms");
        assert_eq!(config.dom.room, DomContract::default().room);
    }

    #[test]
    fn test_load_config_from_path_strips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                // shorter debounce for a fast machine
                "debounceMs": 100,
                /* rule file */
                "rulesPath": "/tmp/rules.json"
            }}"#
        )
        .unwrap();

        let (config, path) = load_config_from_path(file.path()).unwrap();

        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.resolved_rules_path(), Some(PathBuf::from("/tmp/rules.json")));
        assert_eq!(path, file.path());
    }

    #[test]
    fn test_load_config_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_from_path(&dir.path().join("missing.json"));

        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_load_config_from_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let result = load_config_from_path(file.path());

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_paths_end_with_home_files() {
        let paths = config_paths();

        if dirs::home_dir().is_some() {
            let last = paths.last().unwrap();
            assert!(last.ends_with(".groupy.json"));
        }
    }

    #[test]
    fn test_default_rules_path() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                GroupyConfig::default().resolved_rules_path(),
                Some(home.join(".config/groupy/rules.json"))
            );
        }
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/rules.json"), PathBuf::from("/abs/rules.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/rules.json"), home.join("rules.json"));
        }
    }
}
