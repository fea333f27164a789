use crate::config::{ScanConfig, STATE_DIR};
use crate::error::Result;
use archmap_cache::{CacheStats, ChangeCache};
use archmap_extractor::{ParserPool, PluginRegistry};
use archmap_manifest::Manifest;
use archmap_walker::{WalkStats, Walker};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one [`ScanSession::run`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub walk: WalkStats,
    /// Files parsed and merged this run
    pub files_analyzed: usize,
    /// Supported files skipped because the cache says they did not change
    pub files_unchanged: usize,
    /// Files no plugin claims
    pub files_unsupported: usize,
    /// Files whose extraction failed
    pub files_failed: usize,
    /// Previously tracked files that no longer exist (or are now filtered out)
    pub files_removed: usize,
    /// Analyzed files whose trees contained syntax errors
    pub syntax_error_files: usize,
    pub services: usize,
    pub endpoints: usize,
    pub edges: usize,
    pub cache: CacheStats,
    pub duration: Duration,
    pub output: PathBuf,
}

impl ScanReport {
    pub fn files_skipped(&self) -> usize {
        self.files_unchanged + self.files_unsupported + self.files_failed
    }
}

/// One repository scan with its own parser pool, plugins, cache and manifest.
///
/// Sessions share no state, so several can run side by side (in tests, or
/// over different repositories).
pub struct ScanSession {
    root: PathBuf,
    config: ScanConfig,
    pool: Arc<ParserPool>,
    registry: PluginRegistry,
    walker: Walker,
    cache: ChangeCache,
    manifest: Manifest,
}

impl ScanSession {
    pub fn new(root: impl Into<PathBuf>, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let root = root.into();
        let pool = Arc::new(ParserPool::new(config.extractor.max_parsers_per_grammar)?);
        let registry = PluginRegistry::with_defaults(pool.clone(), &config.extractor)?;
        let mut walker_config = config.walker.clone();
        if !walker_config.extra_ignores.iter().any(|p| p == STATE_DIR) {
            walker_config.extra_ignores.push(STATE_DIR.to_string());
        }
        let walker = Walker::new(walker_config)?;
        let cache = ChangeCache::with_limits(config.cache);
        let manifest = Manifest::new(repo_name(&root, &config));

        Ok(Self {
            root,
            config,
            pool,
            registry,
            walker,
            cache,
            manifest,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Register extra plugins before running
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn pool(&self) -> &ParserPool {
        &self.pool
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.config.output)
    }

    pub fn cache_path(&self) -> Option<PathBuf> {
        self.config.cache_file.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Restore the previous manifest and cache, or start empty
    fn load_previous_state(&mut self) {
        let repo = self.manifest.repo.clone();
        self.manifest = Manifest::new(repo.clone());
        self.cache = ChangeCache::with_limits(self.config.cache);
        if !self.config.incremental {
            log::info!("Full scan requested, ignoring previous results");
            return;
        }

        let output = self.output_path();
        match Manifest::load_json(&output) {
            Ok(Some(mut previous)) => {
                previous.repo = repo;
                log::info!(
                    "Loaded previous manifest with {} services",
                    previous.services().len()
                );
                self.manifest = previous;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring previous manifest {}: {}", output.display(), e),
        }

        if let Some(cache_path) = self.cache_path() {
            match ChangeCache::load(&cache_path, self.config.cache) {
                Ok(cache) => self.cache = cache,
                Err(e) => log::warn!("Ignoring cache {}: {}", cache_path.display(), e),
            }
        }
    }

    /// Walk the root, re-extract changed files, drop deleted ones, then write
    /// the manifest and cache snapshot.
    pub fn run(&mut self) -> Result<ScanReport> {
        let started = Instant::now();
        self.load_previous_state();

        // a file is only skipped when both the cache and the manifest know it
        let previously_tracked = self.manifest.tracked_files();
        let mut report = ScanReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let outputs: Vec<PathBuf> = std::iter::once(self.output_path())
            .chain(self.cache_path())
            .collect();

        let Self {
            root,
            registry,
            walker,
            cache,
            manifest,
            ..
        } = self;

        let walk = walker.walk(root, |path| {
            if outputs.iter().any(|own| own == path) {
                return;
            }
            let key = path.to_string_lossy().into_owned();
            seen.insert(key.clone());

            let Some(plugin) = registry.for_file(path) else {
                report.files_unsupported += 1;
                return;
            };
            if !cache.is_changed(path) && previously_tracked.contains(&key) {
                report.files_unchanged += 1;
                return;
            }

            if let Err(e) = manifest.remove_file(&key) {
                log::warn!("Cannot drop stale entities for {key}: {e}");
            }
            let service = plugin.infer_service_name(path);
            match plugin.parse_file(path, &service) {
                Ok(result) => {
                    if result.syntax_errors {
                        report.syntax_error_files += 1;
                    }
                    if let Err(e) = manifest.merge_parse_result(result) {
                        log::warn!("Skipping {key}: {e}");
                        report.files_failed += 1;
                        cache.remove(path);
                        return;
                    }
                    report.files_analyzed += 1;
                    if let Err(e) = cache.update(path) {
                        log::warn!("Not caching {key}: {e}");
                        cache.remove(path);
                    }
                }
                Err(e) => {
                    log::warn!("Skipping {key}: {e}");
                    report.files_failed += 1;
                    cache.remove(path);
                }
            }
        })?;
        report.walk = walk;

        report.files_removed = self.remove_vanished(&previously_tracked, &seen);

        let elapsed = started.elapsed();
        self.manifest
            .set_stats(report.files_analyzed, report.files_skipped(), elapsed);
        self.manifest.refresh_languages();

        let output = self.output_path();
        self.manifest.write_json(&output)?;
        if let Some(cache_path) = self.cache_path() {
            self.cache.save(&cache_path)?;
        }

        report.services = self.manifest.services().len();
        report.endpoints = self.manifest.endpoints().len();
        report.edges = self.manifest.edges().len();
        report.cache = self.cache.stats();
        report.duration = started.elapsed();
        report.output = output;

        log::info!(
            "Scan finished in {:?}: {} analyzed, {} unchanged, {} removed, {} failed",
            report.duration,
            report.files_analyzed,
            report.files_unchanged,
            report.files_removed,
            report.files_failed
        );
        Ok(report)
    }

    /// Forget files known from the previous run or the cache that the walk
    /// did not see. Returns how many were dropped.
    fn remove_vanished(
        &mut self,
        previously_tracked: &BTreeSet<String>,
        seen: &HashSet<String>,
    ) -> usize {
        let mut vanished: BTreeSet<String> = previously_tracked
            .iter()
            .filter(|file| !seen.contains(*file))
            .cloned()
            .collect();
        vanished.extend(self.cache.paths().into_iter().filter(|file| !seen.contains(file)));

        for file in &vanished {
            if let Err(e) = self.manifest.remove_file(file) {
                log::warn!("Cannot drop entities for {file}: {e}");
            }
            self.cache.remove(Path::new(file));
            log::debug!("Removed vanished file {file}");
        }
        vanished.len()
    }
}

fn repo_name(root: &Path, config: &ScanConfig) -> String {
    if let Some(name) = &config.repo_name {
        return name.clone();
    }
    root.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("root", &self.root)
            .field("plugins", &self.registry.len())
            .field("cache", &self.cache)
            .finish()
    }
}

impl From<ScanSession> for Manifest {
    fn from(session: ScanSession) -> Self {
        session.manifest
    }
}
