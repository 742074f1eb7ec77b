use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::SearchResult;

/// Cap applied when a query leaves `max_results` unset or zero.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Engine configuration shared by every query run through one
/// [`SearchEngine`](crate::search::SearchEngine).
///
/// # Configuration Locations
///
/// Loaded from the following locations, later entries overriding earlier ones:
/// 1. Global `$HOME/.config/linescout/config.yaml`
/// 2. Local `.linescout.yaml` in the current directory
/// 3. Custom config file passed with `--config`
///
/// # Configuration Format
///
/// ```yaml
/// # Worker pool size (default: CPU cores)
/// thread_count: 8
///
/// # Only search files with these extensions (default: all files)
/// file_extensions:
///   - "go"
///
/// # Glob patterns to skip
/// ignore_patterns:
///   - "**/vendor/**"
///
/// # Invalid UTF-8 handling (failfast|lossy)
/// encoding_mode: failfast
///
/// default_max_results: 100
/// pattern_cache_capacity: 256
/// log_level: "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of scanner workers in the pool
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Optional list of file extensions to include (e.g., ["go", "rs"])
    /// If None, all file extensions are included
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Patterns to ignore (glob syntax)
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Skip hidden files and directories
    #[serde(default)]
    pub skip_hidden: bool,

    /// Honor .gitignore / .ignore files found while walking
    #[serde(default)]
    pub respect_gitignore: bool,

    /// Follow symbolic links while walking
    #[serde(default)]
    pub follow_links: bool,

    /// How to handle invalid UTF-8 sequences
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Cap used when a query does not supply one
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Number of compiled patterns kept across queries
    #[serde(default = "default_pattern_cache_capacity")]
    pub pattern_cache_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// How the scanner treats bytes that are not valid UTF-8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// The file is treated as unreadable and skipped
    #[default]
    FailFast,
    /// Invalid sequences are replaced with U+FFFD and scanning continues
    Lossy,
}

impl std::str::FromStr for EncodingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "failfast" => Ok(Self::FailFast),
            "lossy" => Ok(Self::Lossy),
            other => Err(format!("unknown encoding mode '{other}' (expected failfast|lossy)")),
        }
    }
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_pattern_cache_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            file_extensions: None,
            ignore_patterns: Vec::new(),
            skip_hidden: false,
            respect_gitignore: false,
            follow_links: false,
            encoding_mode: EncodingMode::default(),
            default_max_results: default_max_results(),
            pattern_cache_capacity: default_pattern_cache_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("linescout/config.yaml")),
            Some(PathBuf::from(".linescout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit path must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Applies command-line overrides; CLI values win when they are set
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(threads) = cli.thread_count {
            self.thread_count = threads;
        }
        if cli.file_extensions.is_some() {
            self.file_extensions = cli.file_extensions;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }
}

/// Values supplied on the command line; `None`/empty means "not given"
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub thread_count: Option<NonZeroUsize>,
    pub file_extensions: Option<Vec<String>>,
    pub ignore_patterns: Vec<String>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}
