use crate::config::WalkerConfig;
use crate::error::{Result, WalkError};
use crate::rules::IgnoreRules;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Counters for one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories_visited: usize,
    pub files_scanned: usize,
    pub files_matched: usize,
    pub files_ignored: usize,
    pub errors: usize,
}

/// Recursive file enumerator for source trees
pub struct Walker {
    config: WalkerConfig,
    extensions: Vec<String>,
    rules: IgnoreRules,
    stats: WalkStats,
}

impl Walker {
    pub fn new(config: WalkerConfig) -> Result<Self> {
        let rules = IgnoreRules::new(&config.extra_ignores)?;
        let extensions = config.normalized_extensions();
        Ok(Self {
            config,
            extensions,
            rules,
            stats: WalkStats::default(),
        })
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Statistics of the most recent walk; reset when the next walk starts
    pub fn last_stats(&self) -> WalkStats {
        self.stats
    }

    /// Walk `root`, calling `visit` for every file that passes the filters.
    ///
    /// Entries are visited in file-name order within each directory.
    /// Unreadable directories and broken entries are counted in
    /// [`WalkStats::errors`] and skipped. Only a root that is missing or not a
    /// directory fails the walk.
    pub fn walk<F>(&mut self, root: &Path, mut visit: F) -> Result<WalkStats>
    where
        F: FnMut(&Path),
    {
        self.stats = WalkStats::default();

        let meta = std::fs::metadata(root).map_err(|source| WalkError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(WalkError::RootNotDirectory(root.to_path_buf()));
        }
        if self.config.respect_gitignore {
            self.rules.load_gitignore(root);
        }

        let max_depth = self.config.max_depth;
        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if max_depth > 0 {
            walker = walker.max_depth(max_depth);
        }

        let mut stats = WalkStats::default();
        let mut last_opened: Option<PathBuf> = None;
        let mut entries = walker.into_iter();
        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    // a directory that was counted but could not be opened
                    if err.path().is_some() && err.path() == last_opened.as_deref() {
                        stats.directories_visited = stats.directories_visited.saturating_sub(1);
                    }
                    stats.errors += 1;
                    log::warn!("Walk error under {}: {}", root.display(), err);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if entry.depth() == 0 {
                stats.directories_visited += 1;
                last_opened = Some(entry.path().to_path_buf());
                continue;
            }

            if self
                .rules
                .is_ignored(entry.file_name(), entry.path(), file_type.is_dir())
            {
                stats.files_ignored += 1;
                if file_type.is_dir() {
                    entries.skip_current_dir();
                }
                continue;
            }

            if file_type.is_dir() {
                if max_depth == 0 || entry.depth() < max_depth {
                    stats.directories_visited += 1;
                    last_opened = Some(entry.path().to_path_buf());
                }
                continue;
            }
            if !file_type.is_file() {
                // unfollowed symlinks, sockets, fifos
                continue;
            }

            stats.files_scanned += 1;
            if !self.matches_extension(entry.path()) {
                continue;
            }
            stats.files_matched += 1;
            visit(entry.path());
        }

        self.stats = stats;
        log::debug!(
            "Walked {}: {} dirs, {} files scanned, {} matched, {} ignored, {} errors",
            root.display(),
            stats.directories_visited,
            stats.files_scanned,
            stats.files_matched,
            stats.files_ignored,
            stats.errors
        );
        Ok(stats)
    }

    /// Pull-style variant of [`Walker::walk`]
    pub fn collect(&mut self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.walk(root, |path| files.push(path.to_path_buf()))?;
        Ok(files)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }
}
