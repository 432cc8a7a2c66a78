//! Service configuration: YAML file plus environment overrides
use cms_core::{CmsError, Language};
use cms_section::CachePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/cms.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub addr: String,
    /// Website snapshot served by the section source
    pub snapshot: String,
    /// Mapping registry file
    pub mappings: String,
    pub languages: Vec<Language>,
    pub default_language: String,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub stale_time_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8787".to_string(),
            snapshot: "testing/fixtures/website.json".to_string(),
            mappings: "testing/fixtures/mappings.yaml".to_string(),
            languages: vec![Language::ltr("en")],
            default_language: "en".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: 300,
            max_retries: 2,
            retry_delay_ms: 200,
        }
    }
}

impl ServiceConfig {
    /// Reads `CMS_CONFIG` (or the default path) and applies env overrides.
    /// A missing default file yields the built-in defaults.
    pub fn load() -> Result<Self, CmsError> {
        let explicit = std::env::var("CMS_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let config = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml(&content)?,
            Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path, "no config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(CmsError::Config(format!("{}: {}", path, e))),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, CmsError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| CmsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `CMS_ADDR`, `CMS_SNAPSHOT` and `CMS_MAPPINGS` win over the file
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CMS_ADDR") {
            self.addr = addr;
        }
        if let Some(snapshot) = lookup("CMS_SNAPSHOT") {
            self.snapshot = snapshot;
        }
        if let Some(mappings) = lookup("CMS_MAPPINGS") {
            self.mappings = mappings;
        }
        self
    }

    fn validate(&self) -> Result<(), CmsError> {
        if self.default_language.is_empty() {
            return Err(CmsError::Config("default_language is empty".into()));
        }
        Ok(())
    }

    /// The requested language when configured, else the default one
    pub fn language(&self, code: Option<&str>) -> Language {
        code.and_then(|c| self.languages.iter().find(|l| l.code == c))
            .or_else(|| self.languages.iter().find(|l| l.code == self.default_language))
            .cloned()
            .unwrap_or_else(|| Language::ltr(self.default_language.clone()))
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            stale_time: Duration::from_secs(self.cache.stale_time_secs),
            max_retries: self.cache.max_retries,
            retry_delay: Duration::from_millis(self.cache.retry_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cms_core::Direction;

    const YAML: &str = r#"
addr: "127.0.0.1:9000"
languages:
  - { code: en, direction: ltr }
  - { code: ar, direction: rtl }
default_language: en
cache:
  stale_time_secs: 60
"#;

    #[test]
    fn test_from_yaml_with_defaults() {
        let config = ServiceConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.mappings, "testing/fixtures/mappings.yaml");
        assert_eq!(config.cache.max_retries, 2);
        assert_eq!(config.cache_policy().stale_time, Duration::from_secs(60));
    }

    #[test]
    fn test_language_fallback() {
        let config = ServiceConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.language(Some("ar")).direction, Direction::Rtl);
        assert_eq!(config.language(Some("fr")).code, "en");
        assert_eq!(config.language(None).code, "en");
    }

    #[test]
    fn test_env_overrides() {
        let config = ServiceConfig::default().with_overrides(|key| match key {
            "CMS_ADDR" => Some("0.0.0.0:1".to_string()),
            _ => None,
        });
        assert_eq!(config.addr, "0.0.0.0:1");
        assert_eq!(config.snapshot, "testing/fixtures/website.json");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(ServiceConfig::from_yaml("default_language: \"\""), Err(CmsError::Config(_))));
        assert!(ServiceConfig::from_yaml("cache: [1, 2]").is_err());
    }
}
