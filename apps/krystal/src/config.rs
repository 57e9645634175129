//! # Configuration
//!
//! `KrystalConfig` is read from a TOML file and then overridden from the
//! environment.
//!
//! ## Resolution Order
//!
//! 1. Built-in defaults
//! 2. `--config <path>` if given, otherwise `krystal.toml` when present
//! 3. Environment variables:
//!    - `LITTLESIS_API_KEY`
//!    - `GOOGLE_NEWS_API_KEY` (or `NEWS_API_KEY`)
//!    - `OPENSECRETS_API_KEY`
//!    - `KRYSTAL_CACHE_TIMEOUT` (seconds)
//!    - `KRYSTAL_LOG_LEVEL`
//!
//! ```toml
//! [analysis]
//! min_relationship_strength = 0.1
//! max_network_depth = 3
//!
//! [influence]
//! degree_weight = 0.4
//! betweenness_weight = 0.6
//!
//! [influence.type_multipliers]
//! government = 1.5
//!
//! [sources]
//! cache_timeout_secs = 3600
//! ```

use krystal_core::{AnalysisConfig, InfluenceWeights, KrystalError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "krystal.toml";

/// Maximum accepted config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Upper bound accepted for `max_network_depth`.
const MAX_CONFIGURABLE_DEPTH: usize = 6;

// =============================================================================
// SECTIONS
// =============================================================================

/// Data-source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Lifetime of cached source responses.
    pub cache_timeout_secs: u64,
    /// Per-request timeout for live calls.
    pub request_timeout_secs: u64,
    pub littlesis_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub opensecrets_api_key: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            cache_timeout_secs: 3600,
            request_timeout_secs: 10,
            littlesis_api_key: None,
            news_api_key: None,
            opensecrets_api_key: None,
        }
    }
}

/// Logging settings. `RUST_LOG` wins over `level` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// KRYSTAL CONFIG
// =============================================================================

/// Effective application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KrystalConfig {
    pub analysis: AnalysisConfig,
    pub influence: InfluenceWeights,
    pub sources: SourcesConfig,
    pub log: LogConfig,
}

impl KrystalConfig {
    /// Load the configuration for this process.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, KrystalError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, KrystalError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            KrystalError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(KrystalError::LimitExceeded(format!(
                "Config file size {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| KrystalError::IoError(format!("Read config: {}", e)))?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, KrystalError> {
        toml::from_str(text)
            .map_err(|e| KrystalError::DeserializationError(format!("Invalid config: {}", e)))
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Empty values are ignored. Unparseable numbers are ignored with a
    /// warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("LITTLESIS_API_KEY") {
            self.sources.littlesis_api_key = Some(key);
        }
        if let Some(key) = get("GOOGLE_NEWS_API_KEY").or_else(|| get("NEWS_API_KEY")) {
            self.sources.news_api_key = Some(key);
        }
        if let Some(key) = get("OPENSECRETS_API_KEY") {
            self.sources.opensecrets_api_key = Some(key);
        }
        if let Some(raw) = get("KRYSTAL_CACHE_TIMEOUT") {
            match raw.trim().parse() {
                Ok(secs) => self.sources.cache_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid KRYSTAL_CACHE_TIMEOUT '{}'", raw),
            }
        }
        if let Some(level) = get("KRYSTAL_LOG_LEVEL") {
            self.log.level = level;
        }
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), KrystalError> {
        let strength = self.analysis.min_relationship_strength;
        if !(0.0..=1.0).contains(&strength) {
            return Err(KrystalError::InvalidRelationship(format!(
                "min_relationship_strength must be within [0, 1], got {}",
                strength
            )));
        }
        if self.analysis.max_network_depth == 0
            || self.analysis.max_network_depth > MAX_CONFIGURABLE_DEPTH
        {
            return Err(KrystalError::LimitExceeded(format!(
                "max_network_depth must be within 1..={}, got {}",
                MAX_CONFIGURABLE_DEPTH, self.analysis.max_network_depth
            )));
        }
        if self.analysis.max_entities_per_query == 0 {
            return Err(KrystalError::LimitExceeded(
                "max_entities_per_query must be positive".to_string(),
            ));
        }

        let weights = [
            self.influence.degree_weight,
            self.influence.betweenness_weight,
        ];
        let multipliers = self.influence.type_multipliers.values().copied();
        if weights
            .into_iter()
            .chain(multipliers)
            .any(|w| !w.is_finite() || w < 0.0)
        {
            return Err(KrystalError::InvalidEntity(
                "influence weights and multipliers must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Engine settings with the influence section folded in.
    #[must_use]
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            influence: self.influence.clone(),
            ..self.analysis.clone()
        }
    }

    /// Copy safe to print: API keys are masked.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        for key in [
            &mut copy.sources.littlesis_api_key,
            &mut copy.sources.news_api_key,
            &mut copy.sources.opensecrets_api_key,
        ] {
            *key = key.as_deref().map(mask_key);
        }
        copy
    }
}

/// Keep the last four characters of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = KrystalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sources.cache_timeout_secs, 3600);
        assert_eq!(config.analysis.max_network_depth, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = KrystalConfig::from_toml(
            r#"
            [analysis]
            min_relationship_strength = 0.3

            [influence.type_multipliers]
            government = 1.5
            "#,
        )
        .expect("parse");

        assert_eq!(config.analysis.min_relationship_strength, 0.3);
        assert_eq!(config.analysis.max_network_depth, 3);
        assert_eq!(config.influence.degree_weight, 0.4);
        assert_eq!(
            config.influence.type_multipliers.get("government"),
            Some(&1.5)
        );
    }

    #[test]
    fn invalid_toml_rejected() {
        let result = KrystalConfig::from_toml("[analysis\nmin = ");
        assert!(matches!(
            result,
            Err(KrystalError::DeserializationError(_))
        ));
    }

    #[test]
    fn env_overrides_keys() {
        let mut config = KrystalConfig::default();
        config.apply_env(env(&[
            ("LITTLESIS_API_KEY", "ls-key"),
            ("NEWS_API_KEY", "fallback-news"),
            ("KRYSTAL_CACHE_TIMEOUT", "60"),
        ]));

        assert_eq!(config.sources.littlesis_api_key.as_deref(), Some("ls-key"));
        assert_eq!(config.sources.news_api_key.as_deref(), Some("fallback-news"));
        assert_eq!(config.sources.cache_timeout_secs, 60);
    }

    #[test]
    fn google_news_key_preferred() {
        let mut config = KrystalConfig::default();
        config.apply_env(env(&[
            ("GOOGLE_NEWS_API_KEY", "google"),
            ("NEWS_API_KEY", "fallback"),
        ]));
        assert_eq!(config.sources.news_api_key.as_deref(), Some("google"));
    }

    #[test]
    fn empty_and_invalid_env_ignored() {
        let mut config = KrystalConfig::default();
        config.apply_env(env(&[
            ("OPENSECRETS_API_KEY", "  "),
            ("KRYSTAL_CACHE_TIMEOUT", "soon"),
        ]));
        assert!(config.sources.opensecrets_api_key.is_none());
        assert_eq!(config.sources.cache_timeout_secs, 3600);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut config = KrystalConfig::default();
        config.analysis.min_relationship_strength = 1.5;
        assert!(config.validate().is_err());

        let mut config = KrystalConfig::default();
        config.analysis.max_network_depth = 0;
        assert!(config.validate().is_err());

        let mut config = KrystalConfig::default();
        config.influence.betweenness_weight = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn analysis_config_carries_influence() {
        let mut config = KrystalConfig::default();
        config.influence.degree_weight = 0.9;
        assert_eq!(config.analysis_config().influence.degree_weight, 0.9);
    }

    #[test]
    fn masked_hides_keys() {
        let mut config = KrystalConfig::default();
        config.sources.littlesis_api_key = Some("abcdefghijkl".to_string());
        config.sources.news_api_key = Some("short".to_string());

        let masked = config.masked();
        assert_eq!(masked.sources.littlesis_api_key.as_deref(), Some("****ijkl"));
        assert_eq!(masked.sources.news_api_key.as_deref(), Some("****"));
        assert!(masked.sources.opensecrets_api_key.is_none());
    }

    #[test]
    fn load_explicit_missing_file_fails() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("absent.toml");
        let result = KrystalConfig::load(Some(path.as_path()));
        assert!(result.is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("krystal.toml");
        std::fs::write(&path, "[sources]\ncache_timeout_secs = 120\n").expect("write");

        let config = KrystalConfig::from_file(&path).expect("load");
        assert_eq!(config.sources.cache_timeout_secs, 120);
    }
}
