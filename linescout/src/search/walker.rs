use ignore::{DirEntry, Walk, WalkBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::config::SearchConfig;
use crate::errors::SearchError;
use crate::filters::FileFilter;
use crate::metrics::SearchMetrics;

/// Enumerates the files a query should scan.
///
/// Roots are visited in the order given and each root is traversed
/// depth-first with entries sorted by file name, so the sequence of yielded
/// paths is a stable function of the file tree.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    filter: FileFilter,
    skip_hidden: bool,
    respect_gitignore: bool,
    follow_links: bool,
    metrics: SearchMetrics,
}

impl TreeWalker {
    pub fn new(filter: FileFilter) -> Self {
        Self {
            filter,
            skip_hidden: false,
            respect_gitignore: false,
            follow_links: false,
            metrics: SearchMetrics::new(),
        }
    }

    pub fn from_config(config: &SearchConfig, metrics: SearchMetrics) -> Self {
        Self {
            filter: FileFilter::from_config(config),
            skip_hidden: config.skip_hidden,
            respect_gitignore: config.respect_gitignore,
            follow_links: config.follow_links,
            metrics,
        }
    }

    pub fn skip_hidden(mut self, yes: bool) -> Self {
        self.skip_hidden = yes;
        self
    }

    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.respect_gitignore = yes;
        self
    }

    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Lazily yields every eligible file under `roots`.
    ///
    /// Any entry that is not a directory is a candidate; a symlink is resolved
    /// and kept unless it points at a directory. Errors on individual entries
    /// (dangling symlinks, permission denied, a missing root) are logged and
    /// skipped; they never end the traversal.
    pub fn walk<'a>(&'a self, roots: &'a [String]) -> impl Iterator<Item = PathBuf> + 'a {
        roots.iter().flat_map(move |root| {
            debug!("Walking root: {}", root);
            self.build(Path::new(root)).filter_map(move |entry| match entry {
                Ok(entry) => {
                    if self.filter.should_include(entry.path()) && self.is_scannable(&entry) {
                        trace!("Eligible file: {}", entry.path().display());
                        Some(entry.into_path())
                    } else {
                        None
                    }
                }
                Err(err) => {
                    let err = SearchError::walk(err.to_string());
                    warn!("Skipping entry under {}: {}", root, err);
                    self.metrics.record_walk_error();
                    None
                }
            })
        })
    }

    fn is_scannable(&self, entry: &DirEntry) -> bool {
        match entry.file_type() {
            Some(ft) if ft.is_dir() => false,
            Some(ft) if ft.is_symlink() => match std::fs::metadata(entry.path()) {
                Ok(target) => !target.is_dir(),
                Err(e) => {
                    let err = SearchError::walk(format!("{}: {}", entry.path().display(), e));
                    warn!("Skipping dangling symlink: {}", err);
                    self.metrics.record_walk_error();
                    false
                }
            },
            Some(_) => true,
            // stdin
            None => false,
        }
    }

    fn build(&self, root: &Path) -> Walk {
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .hidden(self.skip_hidden)
            .ignore(self.respect_gitignore)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .require_git(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b));

        // Prune ignored directories instead of descending into them
        let filter = self.filter.clone();
        builder.filter_entry(move |entry| entry.depth() == 0 || !filter.is_ignored(entry.path()));

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(paths: &[PathBuf], base: &Path) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(base).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_walk_is_sorted_and_recursive() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("c.go"), "").unwrap();
        fs::write(dir.path().join("a.go"), "").unwrap();
        fs::write(dir.path().join("b/nested/d.go"), "").unwrap();
        fs::write(dir.path().join("b/readme.md"), "").unwrap();

        let walker = TreeWalker::new(FileFilter::new(Some(vec!["go".to_string()]), &[]));
        let roots = vec![dir.path().to_string_lossy().into_owned()];
        let found: Vec<PathBuf> = walker.walk(&roots).collect();

        assert_eq!(names(&found, dir.path()), vec!["a.go", "b/nested/d.go", "c.go"]);
    }

    #[test]
    fn test_roots_visited_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("first")).unwrap();
        fs::create_dir_all(dir.path().join("second")).unwrap();
        fs::write(dir.path().join("first/z.txt"), "").unwrap();
        fs::write(dir.path().join("second/a.txt"), "").unwrap();

        let walker = TreeWalker::new(FileFilter::default());
        let roots = vec![
            dir.path().join("second").to_string_lossy().into_owned(),
            dir.path().join("first").to_string_lossy().into_owned(),
        ];
        let found: Vec<PathBuf> = walker.walk(&roots).collect();

        assert_eq!(names(&found, dir.path()), vec!["second/a.txt", "first/z.txt"]);
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();

        let metrics = SearchMetrics::new();
        let walker = TreeWalker::from_config(&SearchConfig::default(), metrics.clone());
        let roots = vec![
            dir.path().join("does-not-exist").to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
        ];
        let found: Vec<PathBuf> = walker.walk(&roots).collect();

        assert_eq!(found.len(), 1);
        assert_eq!(metrics.get_stats().walk_errors, 1);
    }

    #[test]
    fn test_hidden_and_ignored() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join(".hidden/a.txt"), "").unwrap();
        fs::write(dir.path().join("vendor/b.txt"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();

        let roots = vec![dir.path().to_string_lossy().into_owned()];

        let all = TreeWalker::new(FileFilter::default());
        assert_eq!(all.walk(&roots).count(), 3);

        let pruned = TreeWalker::new(FileFilter::new(None, &["**/vendor".to_string()]))
            .skip_hidden(true);
        let found: Vec<PathBuf> = pruned.walk(&roots).collect();
        assert_eq!(names(&found, dir.path()), vec!["c.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_resolved() {
        use std::os::unix::fs::symlink;

        let outside = tempdir().unwrap();
        fs::write(outside.path().join("real.go"), "func Real() {}\n").unwrap();

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.go"), "func A() {}\n").unwrap();
        symlink(outside.path().join("real.go"), dir.path().join("link.go")).unwrap();
        symlink(dir.path().join("gone.go"), dir.path().join("dangling.go")).unwrap();
        symlink(outside.path(), dir.path().join("linked_dir.go")).unwrap();

        let config = SearchConfig {
            file_extensions: Some(vec!["go".to_string()]),
            ..SearchConfig::default()
        };
        let metrics = SearchMetrics::new();
        let walker = TreeWalker::from_config(&config, metrics.clone());
        let roots = vec![dir.path().to_string_lossy().into_owned()];
        let found: Vec<PathBuf> = walker.walk(&roots).collect();

        // The directory link is neither scanned nor descended
        assert_eq!(names(&found, dir.path()), vec!["a.go", "link.go"]);
        assert_eq!(metrics.get_stats().walk_errors, 1);
    }

    #[test]
    fn test_gitignore_respected_when_enabled() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "generated.txt\n").unwrap();
        fs::write(dir.path().join("generated.txt"), "").unwrap();
        fs::write(dir.path().join("kept.txt"), "").unwrap();

        let roots = vec![dir.path().to_string_lossy().into_owned()];
        let filter = FileFilter::new(Some(vec!["txt".to_string()]), &[]);

        let plain = TreeWalker::new(filter.clone());
        assert_eq!(plain.walk(&roots).count(), 2);

        let respecting = TreeWalker::new(filter).respect_gitignore(true);
        let found: Vec<PathBuf> = respecting.walk(&roots).collect();
        assert_eq!(names(&found, dir.path()), vec!["kept.txt"]);
    }
}
