use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:4000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_EXPECTED_QUESTIONS: usize = 5;
const DEFAULT_LOG_LEVEL: &str = "transparency_lens=info";

/// Main configuration structure loaded from transparency_lens.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    pub interview: InterviewConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Where the registry and question generator live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Separate host for `/generate-questions`; defaults to `base_url`
    #[serde(default)]
    pub generator_url: Option<String>,
    pub request_timeout_ms: u64,
}

/// Interview behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InterviewConfig {
    /// Question count the progress indicator is measured against
    pub expected_questions: usize,
    pub report_dir: PathBuf,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Token injected through `LENS_TOKEN`; bypasses the token file when set
    pub api_token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            token_file: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            api_token: std::env::var("LENS_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            token_file: std::env::var("LENS_TOKEN_FILE").ok().map(PathBuf::from),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses LENS_CONFIG environment variable or defaults to "transparency_lens.toml"
    pub fn load() -> anyhow::Result<Self> {
        // 1) LENS_ENV_FILE if set, otherwise ./.env
        if let Ok(env_path) = std::env::var("LENS_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = std::env::var("LENS_CONFIG")
            .unwrap_or_else(|_| "transparency_lens.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Env-first overrides for the file-backed sections
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("LENS_API_URL") {
            tracing::debug!("LENS_API_URL env override applied");
            self.api.base_url = url;
        }
        if let Ok(url) = std::env::var("LENS_GENERATOR_URL") {
            tracing::debug!("LENS_GENERATOR_URL env override applied");
            self.api.generator_url = Some(url);
        }
        if let Some(timeout) = std::env::var("LENS_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.api.request_timeout_ms = timeout;
        }
        if let Some(expected) = std::env::var("LENS_EXPECTED_QUESTIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.interview.expected_questions = expected;
        }
        if let Ok(dir) = std::env::var("LENS_REPORT_DIR") {
            self.interview.report_dir = PathBuf::from(dir);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (label, url) in [
            ("api.base_url", Some(self.api.base_url.as_str())),
            ("api.generator_url", self.api.generator_url.as_deref()),
        ] {
            let Some(url) = url else { continue };
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} '{}' must start with http:// or https://", label, url);
            }
        }
        if self.api.request_timeout_ms == 0 {
            anyhow::bail!("api.request_timeout_ms must be > 0");
        }
        if self.interview.expected_questions == 0 {
            tracing::warn!("interview.expected_questions is 0; progress will always read complete");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    pub fn generator_url(&self) -> &str {
        self.api
            .generator_url
            .as_deref()
            .unwrap_or(&self.api.base_url)
    }

    /// Token file location: `LENS_TOKEN_FILE`, else the platform config dir
    pub fn token_path(&self) -> Option<PathBuf> {
        self.runtime
            .token_file
            .clone()
            .or_else(crate::token::FileTokenStore::default_path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                generator_url: None,
                request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            },
            interview: InterviewConfig {
                expected_questions: DEFAULT_EXPECTED_QUESTIONS,
                report_dir: PathBuf::from("."),
            },
            runtime: RuntimeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generator_url(), DEFAULT_API_URL);
        assert_eq!(config.request_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn parses_toml_with_separate_generator() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://lens.example"
            generator_url = "https://gen.example"
            request_timeout_ms = 5000

            [interview]
            expected_questions = 8
            report_dir = "reports"
            "#,
        )
        .unwrap();
        assert_eq!(config.generator_url(), "https://gen.example");
        assert_eq!(config.interview.expected_questions, 8);
        assert_eq!(config.runtime.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn rejects_non_http_urls_and_zero_timeout() {
        let mut config = Config::default();
        config.api.base_url = "localhost:4000".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.request_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
