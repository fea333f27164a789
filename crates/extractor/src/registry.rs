use crate::config::ExtractorConfig;
use crate::ecmascript::EcmaScriptPlugin;
use crate::error::{ExtractError, Result};
use crate::plugin::LanguagePlugin;
use crate::pool::ParserPool;
use crate::python::PythonPlugin;
use archmap_manifest::ParseResult;
use std::path::Path;
use std::sync::Arc;

/// Name, version and extensions of a registered plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub extensions: Vec<String>,
}

/// Ordered set of language plugins, unique by name.
///
/// When extensions overlap, the plugin registered first claims the file.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn LanguagePlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled Python, JavaScript and TypeScript plugins
    pub fn with_defaults(pool: Arc<ParserPool>, config: &ExtractorConfig) -> Result<Self> {
        config.validate()?;
        let mut registry = Self::new();
        registry.register(Box::new(PythonPlugin::new(pool.clone(), config)?))?;
        registry.register(Box::new(EcmaScriptPlugin::javascript(pool.clone(), config)?))?;
        registry.register(Box::new(EcmaScriptPlugin::typescript(pool, config)?))?;
        Ok(registry)
    }

    pub fn register(&mut self, plugin: Box<dyn LanguagePlugin>) -> Result<()> {
        if plugin.name().is_empty() {
            return Err(ExtractError::InvalidArgument("plugin without a name".into()));
        }
        if self.get(plugin.name()).is_some() {
            return Err(ExtractError::DuplicatePlugin(plugin.name().to_string()));
        }
        log::debug!(
            "Registered plugin {} v{} ({})",
            plugin.name(),
            plugin.version(),
            plugin.extensions().join(", ")
        );
        self.plugins.push(plugin);
        Ok(())
    }

    /// Case-insensitive lookup by name
    pub fn get(&self, name: &str) -> Option<&dyn LanguagePlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.name().eq_ignore_ascii_case(name))
            .map(|plugin| plugin.as_ref())
    }

    /// First registered plugin that supports `path`
    pub fn for_file(&self, path: &Path) -> Option<&dyn LanguagePlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.supports_file(path))
            .map(|plugin| plugin.as_ref())
    }

    /// Parse `path` with its plugin, inferring the service name
    pub fn parse_file(&self, path: &Path) -> Result<ParseResult> {
        let plugin = self
            .for_file(path)
            .ok_or_else(|| ExtractError::Unsupported(path.to_path_buf()))?;
        let service = plugin.infer_service_name(path);
        plugin.parse_file(path, &service)
    }

    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .iter()
            .map(|plugin| PluginInfo {
                name: plugin.name().to_string(),
                version: plugin.version().to_string(),
                extensions: plugin.extensions().iter().map(|e| e.to_string()).collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
