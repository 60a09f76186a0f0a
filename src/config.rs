use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::engine::{JsonLdEngine, RequestFetcher};
use crate::error::{EngineError, NormalizeError};
use crate::guard::ContentGuard;
use crate::normalizer::RecipeNormalizer;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Extraction engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Content guard configuration
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Configuration for the JSON-LD extraction engine
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// User agent sent when fetching pages
    pub user_agent: Option<String>,
    /// Hosts accepted when extraction is not permissive
    #[serde(default)]
    pub supported_hosts: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: None,
            supported_hosts: Vec::new(),
        }
    }
}

/// Configuration for the content guard
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GuardConfig {
    /// Extra provider name → signature entries, merged over the built-ins
    #[serde(default)]
    pub signatures: HashMap<String, String>,
}

fn default_timeout() -> u64 {
    30
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE__ENGINE__TIMEOUT
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    pub fn guard(&self) -> ContentGuard {
        self.guard
            .signatures
            .iter()
            .fold(ContentGuard::default(), |guard, (provider, signature)| {
                guard.with_signature(provider.as_str(), signature.as_str())
            })
    }

    pub fn engine(&self) -> Result<JsonLdEngine, EngineError> {
        let fetcher = RequestFetcher::new(
            Some(Duration::from_secs(self.engine.timeout)),
            self.engine.user_agent.as_deref(),
        )?;
        Ok(JsonLdEngine::with_fetcher(fetcher)
            .with_supported_hosts(self.engine.supported_hosts.clone()))
    }

    /// Normalizer wired with the configured engine and guard
    pub fn normalizer(&self) -> Result<RecipeNormalizer, NormalizeError> {
        Ok(RecipeNormalizer::new(self.engine()?).with_guard(self.guard()))
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE__ENGINE__TIMEOUT
        .add_source(
            Environment::with_prefix("RECIPE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::Inspection;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.engine.timeout, 30);
        assert!(settings.engine.user_agent.is_none());
        assert!(settings.engine.supported_hosts.is_empty());
        assert!(settings.guard.signatures.is_empty());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(
                r#"
                [engine]
                timeout = 10
                supported_hosts = ["allrecipes.com"]

                [guard.signatures]
                datadome = "geo.captcha-delivery.com"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.engine.timeout, 10);
        assert_eq!(settings.engine.supported_hosts, vec!["allrecipes.com"]);

        let guard = settings.guard();
        assert_eq!(guard.signatures().len(), 2);
        assert_eq!(
            guard.inspect("https://geo.captcha-delivery.com/captcha"),
            Inspection::Blocked {
                provider: "datadome".to_string()
            }
        );
    }

    #[test]
    fn test_load_config_without_file_uses_defaults() {
        // overrides from the environment would change the expected values
        if std::env::vars().any(|(key, _)| key.starts_with("RECIPE__")) {
            return;
        }

        let settings = load_config().unwrap();
        assert_eq!(settings.engine.timeout, 30);
        assert!(settings.engine.user_agent.is_none());
        assert!(settings.engine.supported_hosts.is_empty());
        assert!(settings.guard.signatures.is_empty());
    }

    #[test]
    fn test_settings_build_components() {
        let settings = Settings::default();
        assert!(settings.engine().is_ok());
        assert!(settings.normalizer().is_ok());
    }
}
