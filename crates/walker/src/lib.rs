//! # Archmap Walker
//!
//! Enumerates candidate source files under a repository root.
//!
//! Each entry is checked against a built-in ignore list (VCS metadata,
//! dependency and build directories, compiled artifacts), any extra patterns
//! from configuration and, optionally, the root `.gitignore`. Ignored
//! directories are not descended into. Surviving files are filtered by an
//! extension allow-list before being handed to the caller.
//!
//! ```rust
//! use archmap_walker::{Walker, WalkerConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
//! std::fs::write(dir.path().join("node_modules/pkg/index.py"), "").unwrap();
//! std::fs::write(dir.path().join("app.py"), "").unwrap();
//!
//! let mut walker = Walker::new(WalkerConfig::default().with_extensions(["py"])).unwrap();
//! let files = walker.collect(dir.path()).unwrap();
//! assert_eq!(files, vec![dir.path().join("app.py")]);
//! assert_eq!(walker.last_stats().files_ignored, 1);
//! ```

mod config;
mod error;
mod rules;
mod walker;

pub use config::WalkerConfig;
pub use error::{Result, WalkError};
pub use rules::BUILTIN_IGNORE_PATTERNS;
pub use walker::{WalkStats, Walker};
