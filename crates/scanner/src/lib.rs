//! # Archmap Scanner
//!
//! Incremental repository scan: walk, detect changes, extract, merge, persist.
//!
//! ## Pipeline
//!
//! ```text
//! root ──> Walker ──> file ──> PluginRegistry::for_file ──(none)──> unsupported
//!                                   │
//!                                   ▼
//!                     ChangeCache::is_changed ──(no)──> unchanged, keep entities
//!                                   │ (yes)
//!                                   ▼
//!        Manifest::remove_file ──> LanguagePlugin::parse_file ──> merge_parse_result
//!                                   │
//!                                   ▼
//!                           ChangeCache::update
//!
//! after the walk: files known before but not seen ──> remove_file + cache.remove
//!                 manifest ──> write_json, cache ──> save
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use archmap_scanner::{ScanConfig, ScanSession};
//! use std::path::Path;
//!
//! # fn main() -> archmap_scanner::Result<()> {
//! let root = Path::new("./services");
//! let config = ScanConfig::discover(root)?;
//! let mut session = ScanSession::new(root, config)?;
//! let report = session.run()?;
//! println!("{} endpoints in {}", report.endpoints, report.output.display());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod session;

pub use config::{ScanConfig, CONFIG_FILE_NAME, DEFAULT_CACHE_FILE, DEFAULT_OUTPUT, STATE_DIR};
pub use error::{Result, ScanError};
pub use session::{ScanReport, ScanSession};
