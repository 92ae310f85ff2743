//! Configuration management for ngram_regex
//!
//! Supports loading configuration from TOML files with CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::index::IndexOptions;
use crate::search::Settings;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Regex planning and recheck settings
    #[serde(default)]
    pub regex: Settings,

    #[serde(default)]
    pub index: IndexConfig,
}

/// Indexing-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Glob patterns to exclude from indexing
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Maximum file size to index in bytes (default 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Number of shards searched in parallel (default: 4)
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Documents per segment before a new one is started (default: 10000)
    #[serde(default = "default_max_docs_per_segment")]
    pub max_docs_per_segment: usize,

    /// Build the n-gram field used to accelerate searches (default: true)
    #[serde(default = "default_true")]
    pub build_ngrams: bool,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/.git/**".to_string(),
        "**/build/**".to_string(),
        "**/dist/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/venv/**".to_string(),
        "**/.venv/**".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_shards() -> usize {
    4
}

fn default_max_docs_per_segment() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
            max_file_size: default_max_file_size(),
            shards: default_shards(),
            max_docs_per_segment: default_max_docs_per_segment(),
            build_ngrams: true,
        }
    }
}

impl IndexConfig {
    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            shards: self.shards,
            max_docs_per_segment: self.max_docs_per_segment,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from default locations
    ///
    /// Search order:
    /// 1. NGRAM_REGEX_CONFIG environment variable
    /// 2. ./ngram_regex.toml (current directory)
    /// 3. ~/.config/ngram_regex/config.toml (user config)
    pub fn from_default_locations() -> Result<Option<(Self, PathBuf)>> {
        if let Ok(env_path) = std::env::var("NGRAM_REGEX_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                let config = Self::from_file(&path)?;
                return Ok(Some((config, path)));
            }
        }

        let local_path = PathBuf::from("ngram_regex.toml");
        if local_path.exists() {
            let config = Self::from_file(&local_path)?;
            return Ok(Some((config, local_path)));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("ngram_regex").join("config.toml");
            if user_path.exists() {
                let config = Self::from_file(&user_path)?;
                return Ok(Some((config, user_path)));
            }
        }

        Ok(None)
    }

    /// Generate a template configuration file
    pub fn generate_template() -> String {
        r#"# ngram_regex configuration
# Generated template - customize as needed

[regex]
# Length of the indexed n-grams
gram_size = 3

# Widest character class expanded into separate n-grams
max_expand = 4

# Bound on automaton states traced while extracting n-grams
# 0 accelerates only plain literal sequences
max_states_traced = 10000

# Bound on states when determinizing a regex
max_determinized_states = 20000

# Bound on distinct n-grams extracted from one regex
max_ngrams_extracted = 100

# Bound on term clauses in the n-gram query
max_ngram_clauses = 1024

case_sensitive = false

# Lowercasing rules for case-insensitive search: root, tr, az, ga, el, ...
locale = "root"

# Fail instead of scanning every file when a regex cannot be accelerated
reject_unaccelerated = false

# Time budget for rechecking candidates in milliseconds (0 = unbounded)
timeout_ms = 0

[index]
# Patterns to exclude from indexing
exclude_patterns = [
    "**/node_modules/**",
    "**/target/**",
    "**/.git/**",
    "**/build/**",
    "**/dist/**",
    "**/__pycache__/**",
    "**/venv/**",
    "**/.venv/**",
]

# Maximum file size to index in bytes (default: 10MB)
max_file_size = 10485760

# Shards are searched in parallel
shards = 4
max_docs_per_segment = 10000

# Set to false to always scan every file
build_ngrams = true
"#
        .to_string()
    }

    /// Write template config to the specified path
    pub fn write_template(path: &Path) -> Result<()> {
        let template = Self::generate_template();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, template)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
