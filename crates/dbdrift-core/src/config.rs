//! Configuration schema (dbdrift.toml)
//!
//! The configuration is loaded once at startup and passed by reference to
//! the engine and the adapters.

use crate::hasher::DEFAULT_DIGEST_THRESHOLD;
use crate::model::ObjectType;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Default cap on sequence length before an object is skip-marked
pub const DEFAULT_SEQUENCE_COMPARISON_LIMIT: usize = 10_000;

/// Default cap on value nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

fn default_sequence_comparison_limit() -> usize {
    DEFAULT_SEQUENCE_COMPARISON_LIMIT
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_definition_digest_threshold() -> usize {
    DEFAULT_DIGEST_THRESHOLD
}

/// Options consumed by the diff engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Object types to compare; when unset, the types present in both snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_object_types: Option<BTreeSet<ObjectType>>,

    /// Sequences longer than this abort the object's comparison
    #[serde(default = "default_sequence_comparison_limit")]
    pub sequence_comparison_limit: usize,

    /// Attribute path patterns compared by index instead of as multisets
    ///
    /// `*` matches within one path segment, `**` across segments,
    /// e.g. `columns`, `*.key_columns`, `args[*].modes`.
    #[serde(default)]
    pub ordered_attribute_paths: Vec<String>,

    /// Values nested deeper than this abort the object's comparison
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Optional wall-clock budget per object, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_time_budget_ms: Option<u64>,

    /// Strings at least this long are compared through the digest gate
    #[serde(default = "default_definition_digest_threshold")]
    pub definition_digest_threshold: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            enabled_object_types: None,
            sequence_comparison_limit: DEFAULT_SEQUENCE_COMPARISON_LIMIT,
            ordered_attribute_paths: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            object_time_budget_ms: None,
            definition_digest_threshold: DEFAULT_DIGEST_THRESHOLD,
        }
    }
}

impl CompareConfig {
    /// Restrict the comparison to these object types
    pub fn with_enabled_types(mut self, types: impl IntoIterator<Item = ObjectType>) -> Self {
        self.enabled_object_types = Some(types.into_iter().collect());
        self
    }

    /// Compare attributes matching this pattern by index
    pub fn with_ordered_path(mut self, pattern: impl Into<String>) -> Self {
        self.ordered_attribute_paths.push(pattern.into());
        self
    }

    /// Set the sequence length limit
    pub fn with_sequence_limit(mut self, limit: usize) -> Self {
        self.sequence_comparison_limit = limit;
        self
    }

    /// Set the nesting depth limit
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the per-object wall-clock budget
    pub fn with_time_budget_ms(mut self, budget_ms: u64) -> Self {
        self.object_time_budget_ms = Some(budget_ms);
        self
    }
}

/// Connection settings for one side of the comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Adapter type (postgres, snapshot, mock)
    #[serde(rename = "type")]
    pub adapter_type: String,

    /// Schemas to extract
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Adapter-specific settings (host, port, database, user, path, ...)
    #[serde(flatten, deserialize_with = "scalar_settings")]
    pub settings: BTreeMap<String, String>,
}

/// A setting as written in TOML
#[derive(Deserialize)]
#[serde(untagged)]
enum SettingScalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<SettingScalar> for String {
    fn from(value: SettingScalar) -> Self {
        match value {
            SettingScalar::Text(text) => text,
            SettingScalar::Integer(n) => n.to_string(),
            SettingScalar::Float(n) => n.to_string(),
            SettingScalar::Bool(b) => b.to_string(),
        }
    }
}

/// Settings accept bare numbers and booleans (`port = 5432`) and keep them as text
fn scalar_settings<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, SettingScalar>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(key, value)| (key, value.into())).collect())
}

impl EndpointConfig {
    /// Create an endpoint with no settings
    pub fn new(adapter_type: impl Into<String>) -> Self {
        Self {
            adapter_type: adapter_type.into(),
            schemas: Vec::new(),
            settings: BTreeMap::new(),
        }
    }

    /// Add a setting
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Add schemas to extract
    pub fn with_schemas<S: Into<String>>(mut self, schemas: impl IntoIterator<Item = S>) -> Self {
        self.schemas.extend(schemas.into_iter().map(Into::into));
        self
    }

    /// Look up a plain setting
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Look up a secret setting
    ///
    /// `password = "..."` is used as is; `password_env = "VAR"` reads the
    /// value from the environment variable `VAR`.
    pub fn secret(&self, key: &str) -> Option<String> {
        if let Some(value) = self.settings.get(key) {
            return Some(value.clone());
        }
        self.settings
            .get(&format!("{}_env", key))
            .and_then(|var| std::env::var(var).ok())
    }

    /// Short human-readable label, e.g. `postgres://db1.internal/app`
    pub fn label(&self) -> String {
        let host = self
            .setting("host")
            .or_else(|| self.setting("path"))
            .unwrap_or("local");
        match self.setting("database") {
            Some(db) => format!("{}://{}/{}", self.adapter_type, host, db),
            None => format!("{}://{}", self.adapter_type, host),
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where to write the JSON report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<PathBuf>,

    /// Where to write the Markdown report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<PathBuf>,

    /// Exit with a failure status when differences are found
    #[serde(default)]
    pub fail_on_diff: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: Some(PathBuf::from("reports/dbdrift-report.json")),
            markdown: None,
            fail_on_diff: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Diff engine options
    #[serde(default)]
    pub compare: CompareConfig,

    /// Source database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EndpointConfig>,

    /// Destination database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<EndpointConfig>,

    /// Report output
    #[serde(default)]
    pub output: OutputConfig,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compare: CompareConfig::default(),
            source: None,
            destination: None,
            output: OutputConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Both endpoints, or an error naming the missing section
    pub fn endpoints(&self) -> Result<(&EndpointConfig, &EndpointConfig), ConfigError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("missing [source] section".to_string()))?;
        let destination = self
            .destination
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("missing [destination] section".to_string()))?;
        Ok((source, destination))
    }

    /// Resolve a path against the project root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
