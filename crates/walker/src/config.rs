use serde::{Deserialize, Serialize};

/// Configuration for a directory walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Traverse symbolic links (cycles are reported as errors, not followed forever)
    pub follow_symlinks: bool,

    /// Apply `<root>/.gitignore` on top of the built-in ignore list
    pub respect_gitignore: bool,

    /// Maximum depth below the root (0 = unlimited). Files directly in the
    /// root are at depth 1.
    pub max_depth: usize,

    /// Extension allow-list without the leading dot (empty = accept all)
    pub extensions: Vec<String>,

    /// Extra file-name glob patterns to ignore
    pub extra_ignores: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            respect_gitignore: true,
            max_depth: 0,
            extensions: vec![],
            extra_ignores: vec![],
        }
    }
}

impl WalkerConfig {
    /// Builder-style extension allow-list; leading dots are dropped
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}
