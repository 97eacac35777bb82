//! Pipeline configuration.
//!
//! [`PipelineConfig`] carries every tunable the core needs. It can be loaded
//! from a YAML file (`--config`), and every field has a default so a partial
//! file (or none at all) is valid. `has_credential` is never read from the
//! file: `main` resolves it once from the API key before the pipeline is built.

use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_RATE_LIMIT: usize = 15;
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;
pub const DEFAULT_CONCURRENCY: usize = 12;

/// Headline keywords that mark a release as unsuitable without asking the model.
pub const DEFAULT_NEGATIVE_KEYWORDS: &[&str] = &[
    "リコール",
    "回収",
    "撤回",
    "訂正",
    "お詫び",
    "不適合",
    "中止",
    "誤記",
    "決算",
    "人事",
    "株価",
    "recall",
    "withdrawal",
    "correction",
    "apology",
    "non-compliance",
    "suspension",
    "erratum",
    "financial results",
    "personnel",
    "stock price",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rate_limit must be at least 1")]
    InvalidRateLimit,

    #[error("window_seconds must be at least 1")]
    InvalidWindow,

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Remote classification calls allowed per window.
    pub rate_limit: usize,
    /// Length of the sliding window, in seconds.
    pub window_seconds: u64,
    /// Records processed concurrently.
    pub concurrency: usize,
    pub negative_keywords: Vec<String>,
    #[serde(skip)]
    pub has_credential: bool,
    /// Give up on a rate-limit permit after this long. `None` waits forever.
    pub max_permit_wait_seconds: Option<u64>,
    /// Share one profile fetch between records with the same profile URL.
    pub dedup_profiles: bool,
    pub translate: bool,
    /// Target language named in the translation prompt.
    pub translate_to: String,
    pub translate_retries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            concurrency: DEFAULT_CONCURRENCY,
            negative_keywords: DEFAULT_NEGATIVE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            has_credential: false,
            max_permit_wait_seconds: None,
            dedup_profiles: true,
            translate: true,
            translate_to: "Korean".to_string(),
            translate_retries: 3,
        }
    }
}

impl PipelineConfig {
    /// Reject values that would make the pipeline meaningless before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }
        if self.window_seconds == 0 || Instant::now().checked_add(self.window()).is_none() {
            return Err(ConfigError::InvalidWindow);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn max_permit_wait(&self) -> Option<Duration> {
        self.max_permit_wait_seconds.map(Duration::from_secs)
    }
}

/// Load a [`PipelineConfig`] from a YAML file and validate it.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    config.validate()?;
    info!(
        rate_limit = config.rate_limit,
        window_seconds = config.window_seconds,
        concurrency = config.concurrency,
        keywords = config.negative_keywords.len(),
        "Loaded pipeline configuration"
    );
    Ok(config)
}

fn parse_config(text: &str) -> Result<PipelineConfig, serde_yaml::Error> {
    // An empty document means "all defaults".
    if text.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    serde_yaml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.rate_limit, 15);
        assert_eq!(config.window(), Duration::from_secs(60));
        assert!(!config.has_credential);
        assert!(config.negative_keywords.iter().any(|k| k == "リコール"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = parse_config("rate_limit: 5\nconcurrency: 2\n").unwrap();
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.window_seconds, DEFAULT_WINDOW_SECONDS);
        assert!(config.dedup_profiles);
    }

    #[test]
    fn test_has_credential_is_not_read_from_file() {
        let config = parse_config("has_credential: true\n").unwrap();
        assert!(!config.has_credential);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = parse_config("  \n").unwrap();
        assert_eq!(config.rate_limit, DEFAULT_RATE_LIMIT);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = PipelineConfig::default();
        config.rate_limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRateLimit)));

        let mut config = PipelineConfig::default();
        config.window_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow)));

        let mut config = PipelineConfig::default();
        config.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "window_seconds: 30").unwrap();
        writeln!(file, "negative_keywords: [\"訃報\"]").unwrap();
        writeln!(file, "max_permit_wait_seconds: 90").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.window_seconds, 30);
        assert_eq!(config.negative_keywords, vec!["訃報".to_string()]);
        assert_eq!(config.max_permit_wait(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rate_limit: 0").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::InvalidRateLimit)
        ));
    }

    #[test]
    fn test_validate_rejects_unrepresentable_window() {
        let config = parse_config(&format!("window_seconds: {}\nrate_limit: 1\n", u64::MAX)).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "window_seconds: {}", u64::MAX).unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::InvalidWindow)
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/pipeline.yaml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
