use crate::error::{Result, ScanError};
use archmap_cache::CacheLimits;
use archmap_extractor::ExtractorConfig;
use archmap_walker::WalkerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up at the scan root when no config path is given
pub const CONFIG_FILE_NAME: &str = "archmap.toml";

pub const DEFAULT_OUTPUT: &str = "archmap-manifest.json";
/// Directory holding the default cache; never scanned
pub const STATE_DIR: &str = ".archmap";
pub const DEFAULT_CACHE_FILE: &str = ".archmap/cache.bin";

/// Everything a scan needs besides the root directory.
///
/// Relative `output` and `cache_file` paths are resolved against the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Repository name recorded in the manifest (default: root directory name)
    pub repo_name: Option<String>,

    /// Where the manifest is written
    pub output: PathBuf,

    /// Change-cache snapshot; `None` disables persistence
    pub cache_file: Option<PathBuf>,

    /// Reuse the previous manifest and cache to skip unchanged files
    pub incremental: bool,

    pub walker: WalkerConfig,

    pub cache: CacheLimits,

    pub extractor: ExtractorConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            repo_name: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            cache_file: Some(PathBuf::from(DEFAULT_CACHE_FILE)),
            incremental: true,
            walker: WalkerConfig {
                extra_ignores: vec![STATE_DIR.to_string()],
                ..WalkerConfig::default()
            },
            cache: CacheLimits::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Parse a TOML config file; unspecified fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ScanConfig = toml::from_str(&text).map_err(|source| ScanError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `<root>/archmap.toml` if present, defaults otherwise
    pub fn discover(root: &Path) -> Result<Self> {
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.as_os_str().is_empty() {
            return Err(ScanError::invalid_config("output path is empty"));
        }
        if let Some(cache_file) = &self.cache_file {
            if cache_file.as_os_str().is_empty() {
                return Err(ScanError::invalid_config("cache_file is empty"));
            }
        }
        if let Some(name) = &self.repo_name {
            if name.trim().is_empty() {
                return Err(ScanError::invalid_config("repo_name is empty"));
            }
        }
        self.extractor.validate()?;
        Ok(())
    }
}
