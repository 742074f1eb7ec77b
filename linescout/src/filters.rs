//! File eligibility rules used by the tree walker.
//!
//! Eligibility is configuration, not policy: the engine builds one
//! [`FileFilter`] from its [`SearchConfig`] and the walker consults it for
//! every non-directory entry it encounters.
use glob::Pattern;
use std::path::Path;
use tracing::warn;

use crate::config::SearchConfig;

/// Common binary file extensions that are never worth scanning line-by-line
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "obj", "o", "a", "class", "jar", "war", "ear", "png",
    "jpg", "jpeg", "gif", "bmp", "ico", "pdf", "doc", "docx", "xls", "xlsx", "zip", "tar", "gz",
    "7z", "rar", "wasm",
];

/// Checks if a file should be included in the search based on its extension
pub fn has_valid_extension(path: &Path, extensions: &Option<Vec<String>>) -> bool {
    match extensions {
        None => true,
        Some(exts) => path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                exts.iter()
                    .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
            }),
    }
}

/// Checks if a file is likely to be binary
pub fn is_likely_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|bin_ext| bin_ext.eq_ignore_ascii_case(ext))
        })
}

/// Decides which discovered files are handed to the scanner
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    extensions: Option<Vec<String>>,
    ignore: Vec<Pattern>,
}

impl FileFilter {
    pub fn new(extensions: Option<Vec<String>>, ignore_patterns: &[String]) -> Self {
        let ignore = ignore_patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring invalid glob '{}': {}", p, e);
                    None
                }
            })
            .collect();

        Self { extensions, ignore }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.file_extensions.clone(), &config.ignore_patterns)
    }

    /// Checks if a path matches one of the ignore globs
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.ignore.iter().any(|p| p.matches(&normalized))
    }

    /// Determines if a file should be searched.
    ///
    /// Binary extensions are skipped unless an explicit extension list names
    /// them.
    pub fn should_include(&self, path: &Path) -> bool {
        let allowed = match self.extensions {
            Some(_) => has_valid_extension(path, &self.extensions),
            None => !is_likely_binary(path),
        };
        allowed && !self.is_ignored(path)
    }
}
