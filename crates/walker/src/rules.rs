use crate::error::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::ffi::OsStr;
use std::path::Path;

/// Names never worth descending into or parsing
pub const BUILTIN_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "venv",
    ".venv",
    "env",
    ".env",
    "build",
    "dist",
    ".DS_Store",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "*.so",
    "*.dylib",
];

/// File-name globs plus an optional root `.gitignore`
pub(crate) struct IgnoreRules {
    names: GlobSet,
    gitignore: Option<Gitignore>,
}

impl IgnoreRules {
    pub(crate) fn new(extra: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in BUILTIN_IGNORE_PATTERNS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str))
        {
            builder.add(
                GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .case_insensitive(false)
                    .build()?,
            );
        }
        Ok(Self {
            names: builder.build()?,
            gitignore: None,
        })
    }

    /// Pick up `<root>/.gitignore` if there is one. Bad lines are logged and skipped.
    pub(crate) fn load_gitignore(&mut self, root: &Path) {
        let file = root.join(".gitignore");
        if !file.is_file() {
            self.gitignore = None;
            return;
        }
        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(&file) {
            log::warn!("Partially applied {}: {}", file.display(), err);
        }
        self.gitignore = match builder.build() {
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Ignoring {}: {}", file.display(), e);
                None
            }
        };
    }

    pub(crate) fn is_ignored(&self, name: &OsStr, path: &Path, is_dir: bool) -> bool {
        if self.names.is_match(Path::new(name)) {
            return true;
        }
        self.gitignore
            .as_ref()
            .is_some_and(|gitignore| gitignore.matched(path, is_dir).is_ignore())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignored(rules: &IgnoreRules, name: &str) -> bool {
        rules.is_ignored(OsStr::new(name), Path::new(name), false)
    }

    #[test]
    fn builtin_patterns_match_whole_names_only() {
        let rules = IgnoreRules::new(&[]).unwrap();
        assert!(ignored(&rules, ".git"));
        assert!(ignored(&rules, "node_modules"));
        assert!(ignored(&rules, "module.pyc"));
        assert!(ignored(&rules, "libfoo.so"));
        assert!(!ignored(&rules, ".github"));
        assert!(!ignored(&rules, "environment.py"));
        assert!(!ignored(&rules, "build.py"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let rules = IgnoreRules::new(&[]).unwrap();
        assert!(!ignored(&rules, "Build"));
        assert!(!ignored(&rules, "NODE_MODULES"));
    }

    #[test]
    fn extra_patterns_support_question_mark() {
        let rules = IgnoreRules::new(&["tmp?".to_string(), "*.log".to_string()]).unwrap();
        assert!(ignored(&rules, "tmp1"));
        assert!(!ignored(&rules, "tmp12"));
        assert!(ignored(&rules, "server.log"));
    }

    #[test]
    fn invalid_extra_pattern_is_an_error() {
        assert!(IgnoreRules::new(&["[unclosed".to_string()]).is_err());
    }
}
