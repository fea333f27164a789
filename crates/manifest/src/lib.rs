//! # Archmap Manifest
//!
//! Typed architectural entities and the manifest that aggregates them.
//!
//! ## Model
//!
//! ```text
//! ParseResult (one per source file)
//!     │
//!     ├──> Service   (name, language, path, files)
//!     ├──> Endpoint  (service, path, method, handler?, file?, line?)
//!     ├──> Edge      (from, to, type, method?, endpoint?, file?, line?, confidence)
//!     └──> imports
//!              │
//!              ▼
//!     Manifest::merge_parse_result ──> Manifest ──> write_json
//!              ▲                          │
//!              └── Manifest::remove_file ◄┘ (stale or deleted files)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use archmap_manifest::{Endpoint, HttpMethod, Manifest, ParseResult, Service};
//!
//! let mut result = ParseResult::new("users/app.py", "python");
//! result.service = Some(Service::new("users", "python", "users").with_file("users/app.py"));
//! result.endpoints.push(Endpoint::new("users", "/health", HttpMethod::Get).at("users/app.py", 4));
//!
//! let mut manifest = Manifest::new("shop");
//! manifest.merge_parse_result(result).unwrap();
//! assert_eq!(manifest.endpoints().len(), 1);
//!
//! manifest.remove_file("users/app.py").unwrap();
//! assert!(manifest.endpoints().is_empty());
//! ```

mod error;
mod manifest;
mod types;

pub use error::{ManifestError, Result};
pub use manifest::{utc_timestamp, Manifest, Removal, ScanMetadata, CRAWLER_VERSION, SCHEMA_VERSION};
pub use types::{
    clamp_confidence, Edge, EdgeType, Endpoint, HttpMethod, ParseResult, Service,
    DEFAULT_CONFIDENCE,
};
