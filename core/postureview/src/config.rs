use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, ConfigError};
use crate::retry::RetryPolicy;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted by [`AnalyzerConfig::from_env`], in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Shortest credential accepted before a request is attempted.
const MIN_API_KEY_LEN: usize = 5;

/// API credential. Never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Reject keys that cannot be real: empty, too short, or the literal
    /// `"undefined"` that bundlers substitute for an unset variable.
    pub fn validate(key: Option<&ApiKey>) -> Result<&ApiKey, AnalysisError> {
        match key {
            Some(k) if k.0 != "undefined" && k.0.trim().len() >= MIN_API_KEY_LEN => Ok(k),
            _ => Err(AnalysisError::MissingCredential),
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(***)")
    }
}

/// Everything the analyzer needs, injected at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 120,
            retry: RetryPolicy::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(ApiKey::new(key)),
            ..Self::default()
        }
    }

    /// Defaults plus the first non-empty key from [`API_KEY_VARS`].
    pub fn from_env() -> Self {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .map(ApiKey::new);
        Self {
            api_key,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The credential, or [`AnalysisError::MissingCredential`].
    pub fn credential(&self) -> Result<&ApiKey, AnalysisError> {
        ApiKey::validate(self.api_key.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unusable_keys() {
        for key in ["", "abc", "    ", "undefined"] {
            let config = AnalyzerConfig::with_api_key(key);
            assert_eq!(config.credential(), Err(AnalysisError::MissingCredential), "{key:?}");
        }
        assert_eq!(
            AnalyzerConfig::default().credential(),
            Err(AnalysisError::MissingCredential)
        );
    }

    #[test]
    fn accepts_plausible_key() {
        let config = AnalyzerConfig::with_api_key("AIzaSyExample");
        assert_eq!(config.credential().unwrap().expose(), "AIzaSyExample");
    }

    #[test]
    fn debug_redacts_key() {
        let config = AnalyzerConfig::with_api_key("super-secret-key");
        assert!(!format!("{config:?}").contains("super-secret-key"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            api_key = "AIzaSyExample"
            model = "gemini-2.5-flash"

            [retry]
            max_retries = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.initial_delay_ms, 2000);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            AnalyzerConfig::from_toml_str("model = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
