use crate::error::{ManifestError, Result};
use crate::types::{Edge, Endpoint, ParseResult, Service};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

pub const SCHEMA_VERSION: &str = "1.0";
pub const CRAWLER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Facts about the scan that produced a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// ISO-8601 UTC, second precision
    pub timestamp: String,
    pub crawler_version: String,
    #[serde(default)]
    pub scan_duration_ms: u64,
    #[serde(default)]
    pub files_analyzed: usize,
    #[serde(default)]
    pub files_skipped: usize,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            timestamp: utc_timestamp(),
            crawler_version: CRAWLER_VERSION.to_string(),
            scan_duration_ms: 0,
            files_analyzed: 0,
            files_skipped: 0,
        }
    }
}

pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// What [`Manifest::remove_file`] took out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub endpoints: usize,
    pub edges: usize,
    pub services: usize,
}

impl Removal {
    pub fn is_noop(&self) -> bool {
        self.endpoints == 0 && self.edges == 0 && self.services == 0
    }
}

/// Aggregate of every service, endpoint and edge found in a repository
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub schema_version: String,
    pub scan_metadata: ScanMetadata,
    pub repo: String,
    languages: Vec<String>,
    services: Vec<Service>,
    endpoints: Vec<Endpoint>,
    edges: Vec<Edge>,
}

impl Manifest {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            scan_metadata: ScanMetadata::default(),
            repo: repo.into(),
            languages: Vec::new(),
            services: Vec::new(),
            endpoints: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn find_service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }

    /// Fold one file's extraction result into the manifest.
    ///
    /// A service that already exists absorbs the result's files and the
    /// incoming `Service` is dropped; an unseen one is adopted as-is.
    /// Endpoints and edges are appended without deduplication.
    pub fn merge_parse_result(&mut self, result: ParseResult) -> Result<()> {
        if let Some(service) = &result.service {
            if service.name.is_empty() {
                return Err(ManifestError::invalid_argument(format!(
                    "parse result for {} carries a service with an empty name",
                    result.file
                )));
            }
        }

        if let Some(incoming) = result.service {
            match self
                .services
                .iter_mut()
                .find(|existing| existing.name == incoming.name)
            {
                Some(existing) => {
                    for file in incoming.files() {
                        existing.add_file(file.as_str());
                    }
                }
                None => {
                    self.note_language(&incoming.language);
                    self.services.push(incoming);
                }
            }
        }

        self.endpoints.extend(result.endpoints);
        self.edges.extend(result.edges);
        Ok(())
    }

    /// Drop every entity attributed to `file`.
    ///
    /// Surviving entities keep their relative order. Services are never
    /// pruned, only their file lists shrink. Removing the same file twice is
    /// a no-op the second time.
    pub fn remove_file(&mut self, file: &str) -> Result<Removal> {
        if file.is_empty() {
            return Err(ManifestError::invalid_argument("empty file path"));
        }

        let endpoints_before = self.endpoints.len();
        self.endpoints.retain(|endpoint| !endpoint.is_from_file(file));
        let edges_before = self.edges.len();
        self.edges.retain(|edge| !edge.is_from_file(file));

        let mut services = 0;
        for service in &mut self.services {
            if service.remove_file(file) {
                services += 1;
            }
        }

        let removal = Removal {
            endpoints: endpoints_before - self.endpoints.len(),
            edges: edges_before - self.edges.len(),
            services,
        };
        if !removal.is_noop() {
            log::debug!(
                "Removed {} endpoints, {} edges for {}",
                removal.endpoints,
                removal.edges,
                file
            );
        }
        Ok(removal)
    }

    /// True if any service lists the file or any entity came from it
    pub fn contains_file(&self, file: &str) -> bool {
        self.services.iter().any(|service| service.contains_file(file))
            || self.endpoints.iter().any(|endpoint| endpoint.is_from_file(file))
            || self.edges.iter().any(|edge| edge.is_from_file(file))
    }

    /// Every file path the manifest knows about
    pub fn tracked_files(&self) -> BTreeSet<String> {
        let mut files: BTreeSet<String> = self
            .services
            .iter()
            .flat_map(|service| service.files().iter().cloned())
            .collect();
        files.extend(self.endpoints.iter().filter_map(|e| e.file.clone()));
        files.extend(self.edges.iter().filter_map(|e| e.file.clone()));
        files
    }

    /// Stamp the metadata of the scan that is about to be written
    pub fn set_stats(&mut self, files_analyzed: usize, files_skipped: usize, duration: Duration) {
        self.scan_metadata = ScanMetadata {
            timestamp: utc_timestamp(),
            crawler_version: CRAWLER_VERSION.to_string(),
            scan_duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            files_analyzed,
            files_skipped,
        };
    }

    /// Rebuild the language list from the current services, first-seen order
    pub fn refresh_languages(&mut self) {
        let languages: Vec<String> = self.services.iter().map(|s| s.language.clone()).collect();
        self.languages.clear();
        for language in languages {
            self.note_language(&language);
        }
    }

    fn note_language(&mut self, language: &str) {
        if !language.is_empty() && !self.languages.iter().any(|known| known == language) {
            self.languages.push(language.to_string());
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the manifest as pretty JSON, replacing any existing file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        log::info!(
            "Wrote manifest with {} services, {} endpoints, {} edges to {}",
            self.services.len(),
            self.endpoints.len(),
            self.edges.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a manifest written by a previous scan.
    ///
    /// Returns `Ok(None)` when the file does not exist. Entity records that
    /// cannot be decoded are skipped with a warning rather than failing the
    /// whole load.
    pub fn load_json(path: &Path) -> Result<Option<Manifest>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        let root: Value = serde_json::from_slice(&bytes)?;
        let Value::Object(mut root) = root else {
            return Err(ManifestError::malformed(format!(
                "{} does not contain a JSON object",
                path.display()
            )));
        };

        let repo = root
            .get("repo")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let mut manifest = Manifest::new(repo);

        if let Some(version) = root.get("schema_version").and_then(Value::as_str) {
            if version != SCHEMA_VERSION {
                log::warn!(
                    "Manifest {} has schema {}, expected {}",
                    path.display(),
                    version,
                    SCHEMA_VERSION
                );
            }
        }
        if let Some(metadata) = root.remove("scan_metadata") {
            match serde_json::from_value::<ScanMetadata>(metadata) {
                Ok(metadata) => manifest.scan_metadata = metadata,
                Err(e) => log::warn!("Ignoring malformed scan_metadata: {e}"),
            }
        }

        manifest.services = decode_records(&mut root, "services");
        manifest.endpoints = decode_records(&mut root, "endpoints");
        manifest.edges = decode_records(&mut root, "edges");
        manifest.refresh_languages();

        log::debug!(
            "Loaded manifest {} ({} services, {} endpoints, {} edges)",
            path.display(),
            manifest.services.len(),
            manifest.endpoints.len(),
            manifest.edges.len()
        );
        Ok(Some(manifest))
    }
}

fn decode_records<T: DeserializeOwned>(root: &mut serde_json::Map<String, Value>, key: &str) -> Vec<T> {
    let Some(Value::Array(items)) = root.remove(key) else {
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping malformed {key}[{idx}]: {e}");
                None
            }
        })
        .collect()
}
