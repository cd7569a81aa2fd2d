use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub finnhub_api_key: Option<String>,
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,
    pub email_api_key: Option<String>,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    /// Six-field cron expression (seconds first), evaluated in UTC.
    #[serde(default = "default_digest_cron")]
    pub digest_cron: String,

    /// How many recipients are fetched and summarized at once. 1 keeps the
    /// stage sequential.
    #[serde(default = "default_summary_concurrency")]
    pub summary_concurrency: usize,

    #[serde(default = "default_news_lookback_days")]
    pub news_lookback_days: i64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("signalist");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("signalist.db").to_string_lossy().to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_email_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_email_from() -> String {
    "Signalist <signalist@example.com>".to_string()
}

fn default_digest_cron() -> String {
    "0 12 0 * * *".to_string()
}

fn default_summary_concurrency() -> usize {
    1
}

fn default_news_lookback_days() -> i64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            finnhub_api_key: None,
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            email_api_url: default_email_api_url(),
            email_api_key: None,
            email_from: default_email_from(),
            digest_cron: default_digest_cron(),
            summary_concurrency: default_summary_concurrency(),
            news_lookback_days: default_news_lookback_days(),
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), writing defaults when the
    /// file does not exist yet. Secrets in the environment win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("signalist")
            .join("config.toml")
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("FINNHUB_API_KEY") {
            self.finnhub_api_key = Some(key);
        }
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(key) = non_empty("EMAIL_API_KEY") {
            self.email_api_key = Some(key);
        }
    }

    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config(format!("{name} is not set")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/test.db"
            finnhub_api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, "/tmp/test.db");
        assert_eq!(config.finnhub_api_key.as_deref(), Some("abc"));
        assert_eq!(config.gemini_model, "gemini-2.5-flash-lite");
        assert_eq!(config.digest_cron, "0 12 0 * * *");
        assert_eq!(config.summary_concurrency, 1);
        assert_eq!(config.news_lookback_days, 5);
    }

    #[test]
    fn env_overrides_replace_file_secrets() {
        let mut config = Config {
            gemini_api_key: Some("from-file".into()),
            ..Config::default()
        };
        config.apply_env_overrides(|key| match key {
            "GEMINI_API_KEY" => Some("from-env".into()),
            "EMAIL_API_KEY" => Some("   ".into()),
            _ => None,
        });

        assert_eq!(config.gemini_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.email_api_key, None);
    }

    #[test]
    fn load_writes_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load(Some(&path)).unwrap();

        assert!(path.exists());
        assert_eq!(config.summary_concurrency, 1);
    }

    #[test]
    fn require_rejects_blank_values() {
        assert!(Config::require(&None, "x").is_err());
        assert!(Config::require(&Some(" ".into()), "x").is_err());
        assert_eq!(Config::require(&Some("k".into()), "x").unwrap(), "k");
    }
}
