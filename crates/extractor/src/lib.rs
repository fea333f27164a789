//! # Archmap Extractor
//!
//! Turns source files into architectural entities by running tree-sitter
//! queries over their syntax trees.
//!
//! ## Pipeline
//!
//! ```text
//! path ──> PluginRegistry::for_file ──> LanguagePlugin
//!                                          │
//!                 read source (≤ 10 MiB) ──┤
//!                                          │
//!          ParserPool::acquire(grammar) ───┤──> syntax tree (partial on errors)
//!                                          │
//!          QuerySet (routes/calls/imports) ┤──> matches ──> captures
//!                                          │
//!                                          └──> ParseResult {service, endpoints, edges, imports}
//! ```
//!
//! Route matches become endpoints, HTTP-client matches become `http-call`
//! edges carrying the configured confidence, and import matches feed the
//! result's import list.
//!
//! ## Example
//!
//! ```rust
//! use archmap_extractor::{ExtractorConfig, ParserPool, PluginRegistry};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = dir.path().join("users").join("app.py");
//! std::fs::create_dir_all(file.parent().unwrap()).unwrap();
//! std::fs::write(&file, "@app.get('/me')\ndef me():\n    pass\n").unwrap();
//!
//! let pool = Arc::new(ParserPool::new(4).unwrap());
//! let registry = PluginRegistry::with_defaults(pool, &ExtractorConfig::default()).unwrap();
//! let result = registry.parse_file(&file).unwrap();
//! assert_eq!(result.endpoints[0].path, "/me");
//! assert_eq!(result.service.unwrap().name, "users");
//! ```

mod config;
mod ecmascript;
mod error;
mod grammar;
mod plugin;
mod pool;
mod python;
mod query;
mod registry;

pub use config::{ExtractorConfig, DEFAULT_HTTP_CALL_CONFIDENCE};
pub use ecmascript::EcmaScriptPlugin;
pub use error::{ExtractError, Result};
pub use grammar::Grammar;
pub use plugin::{read_source, url_host, LanguagePlugin, MAX_SOURCE_BYTES, UNKNOWN_SERVICE};
pub use pool::{ParserPool, PoolStats, PooledParser, DEFAULT_MAX_PARSERS};
pub use python::PythonPlugin;
pub use query::{for_each_match, strip_quotes, BuiltinQueries, Captures, QueryKind, QuerySet};
pub use registry::{PluginInfo, PluginRegistry};
