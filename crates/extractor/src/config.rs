use crate::error::{ExtractError, Result};
use crate::pool::DEFAULT_MAX_PARSERS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Confidence given to edges inferred from HTTP-client call patterns
pub const DEFAULT_HTTP_CALL_CONFIDENCE: f64 = 0.8;

/// Settings shared by the bundled language plugins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Directory with `<plugin>/<kind>.scm` query overrides
    pub query_dir: Option<PathBuf>,

    /// Hard cap on parsers per grammar
    pub max_parsers_per_grammar: usize,

    /// Confidence assigned to heuristic HTTP-call edges
    pub http_call_confidence: f64,

    /// Identifiers treated as HTTP clients in Python (`requests.get(...)`)
    pub python_http_clients: Vec<String>,

    /// Identifiers treated as HTTP clients in JavaScript/TypeScript
    pub javascript_http_clients: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            query_dir: None,
            max_parsers_per_grammar: DEFAULT_MAX_PARSERS,
            http_call_confidence: DEFAULT_HTTP_CALL_CONFIDENCE,
            python_http_clients: vec!["requests".into(), "httpx".into()],
            javascript_http_clients: vec![
                "axios".into(),
                "fetch".into(),
                "superagent".into(),
                "got".into(),
                "ky".into(),
            ],
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.http_call_confidence) {
            return Err(ExtractError::invalid_config(format!(
                "http_call_confidence must be within [0, 1], got {}",
                self.http_call_confidence
            )));
        }
        if self.max_parsers_per_grammar == 0 {
            return Err(ExtractError::invalid_config(
                "max_parsers_per_grammar must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        for bad in [1.5, -0.1, f64::NAN] {
            let config = ExtractorConfig {
                http_call_confidence: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad} accepted");
        }
    }
}
