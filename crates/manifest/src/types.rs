use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// HTTP method attached to an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Unknown,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Parse a method name, ignoring case. Unrecognized names map to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(HttpMethod::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_name(&raw))
    }
}

/// Kind of dependency an edge represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeType {
    HttpCall,
    Import,
    Rpc,
    Database,
    MessageQueue,
    #[default]
    Unknown,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::HttpCall => "http-call",
            EdgeType::Import => "import",
            EdgeType::Rpc => "rpc",
            EdgeType::Database => "database",
            EdgeType::MessageQueue => "message-queue",
            EdgeType::Unknown => "unknown",
        }
    }

    /// Parse an edge type name. Accepts the canonical kebab-case names as well
    /// as upper-case and snake-case spellings (`HTTP`, `HTTP_CALL`, `DB`, `MQ`).
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "http-call" | "http" => EdgeType::HttpCall,
            "import" => EdgeType::Import,
            "rpc" | "grpc" => EdgeType::Rpc,
            "database" | "db" => EdgeType::Database,
            "message-queue" | "mq" | "queue" => EdgeType::MessageQueue,
            _ => EdgeType::Unknown,
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EdgeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EdgeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_name(&raw))
    }
}

/// A deployable unit that owns a set of source files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Service {
    pub name: String,
    pub language: String,
    pub path: String,
    #[serde(default)]
    files: Vec<String>,
}

impl Service {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            path: path.into(),
            files: Vec::new(),
        }
    }

    /// Builder-style variant of [`Service::add_file`]
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.add_file(file);
        self
    }

    /// Add a file to the service. Returns false if it was already present.
    pub fn add_file(&mut self, file: impl Into<String>) -> bool {
        let file = file.into();
        if self.contains_file(&file) {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Remove a file from the service. Returns false if it was not present.
    pub fn remove_file(&mut self, file: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|existing| existing != file);
        self.files.len() != before
    }

    pub fn contains_file(&self, file: &str) -> bool {
        self.files.iter().any(|existing| existing == file)
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl Serialize for Service {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Service", 5)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("language", &self.language)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("file_count", &self.files.len())?;
        state.serialize_field("files", &self.files)?;
        state.end()
    }
}

/// An HTTP route exposed by a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub service: String,
    pub path: String,
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Endpoint {
    pub fn new(service: impl Into<String>, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            service: service.into(),
            path: path.into(),
            method,
            handler: None,
            file: None,
            line: None,
        }
    }

    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Record where the endpoint was declared
    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn is_from_file(&self, file: &str) -> bool {
        self.file.as_deref() == Some(file)
    }
}

/// A directed dependency between two services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(
        default = "default_confidence",
        deserialize_with = "deserialize_confidence"
    )]
    confidence: f64,
}

pub const DEFAULT_CONFIDENCE: f64 = 1.0;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn deserialize_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(clamp_confidence)
}

/// Clamp into `[0.0, 1.0]`; NaN collapses to 0.0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type,
            method: None,
            endpoint: None,
            file: None,
            line: None,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.set_confidence(confidence);
        self
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp_confidence(confidence);
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn is_from_file(&self, file: &str) -> bool {
        self.file.as_deref() == Some(file)
    }
}

/// Everything extracted from a single source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    pub file: String,
    pub language: String,
    pub service: Option<Service>,
    pub endpoints: Vec<Endpoint>,
    pub edges: Vec<Edge>,
    /// Imported module names, kept for later resolution into edges
    pub imports: Vec<String>,
    /// The tree contained syntax errors; extraction ran on the partial tree
    pub syntax_errors: bool,
}

impl ParseResult {
    pub fn new(file: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            language: language.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty() && self.edges.is_empty() && self.imports.is_empty()
    }
}
