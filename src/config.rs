//! YAML configuration.
//!
//! Every field has a default, so an empty file (or no file at all) describes
//! the publisher and wiki this tool was written for. Secrets are normally
//! supplied through the CLI/environment and override anything in the file.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::error::{NewscastError, Result};
use crate::temporal::Normalizer;

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// IANA zone all zone aliases and naive stamps resolve to.
    pub timezone: String,
    /// Abbreviations that name `timezone` (e.g. `PST`, `PDT`).
    pub zone_aliases: Vec<String>,
    /// JSON ledger of every classified article.
    pub ledger_path: PathBuf,
    /// Where raw article and catalog payloads are archived, if anywhere.
    pub archive_dir: Option<PathBuf>,
    pub source: SourceConfig,
    pub http: HttpConfig,
    pub documents: DocumentsConfig,
    pub pages: PagesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            timezone: "America/Los_Angeles".to_string(),
            zone_aliases: vec!["PST".to_string(), "PDT".to_string()],
            ledger_path: PathBuf::from("known.json"),
            archive_dir: None,
            source: SourceConfig::default(),
            http: HttpConfig::default(),
            documents: DocumentsConfig::default(),
            pages: PagesConfig::default(),
        }
    }
}

/// Publisher endpoints. `{id}` is replaced by the article or item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub list_url: String,
    pub article_url: String,
    pub shop_item_url: String,
    /// Public article URL used in rendered news lines.
    pub public_article_url: String,
    pub api_key: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            list_url: "https://g.nexonstatic.com/mabinogi/cms/news".to_string(),
            article_url: "https://g.nexonstatic.com/mabinogi/cms/news/{id}".to_string(),
            shop_item_url: "https://mabinogi.nexon.net/api/shop/itemdetail/cash/{id}".to_string(),
            public_article_url: "https://mabinogi.nexon.net/news/{id}".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Extra attempts after the first; 0 keeps every call single-shot.
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            max_retries: 2,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Wiki,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub backend: Backend,
    /// Directory for the `local` backend.
    pub local_dir: PathBuf,
    pub wiki: WikiConfig,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        DocumentsConfig {
            backend: Backend::Wiki,
            local_dir: PathBuf::from("pages"),
            wiki: WikiConfig::default(),
        }
    }
}

/// MediaWiki action API access (bot password login).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    pub api_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for WikiConfig {
    fn default() -> Self {
        WikiConfig {
            api_url: "https://wiki.mabinogiworld.com/api.php".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Names of the documents the pipeline maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesConfig {
    pub news: String,
    pub maintenance: String,
    pub events: String,
    pub sales: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        PagesConfig {
            news: "Wiki_Home/WikiUpdates".to_string(),
            maintenance: "Wiki_Home/Maintenance_Notice".to_string(),
            events: "Wiki_Home/Current_Events".to_string(),
            sales: "Wiki_Home/Current_Sales".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse YAML text. Empty text yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// The configured zone.
    pub fn zone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| NewscastError::Config(format!("unknown timezone {:?}: {e}", self.timezone)))
    }

    pub fn normalizer(&self) -> Result<Normalizer> {
        Ok(Normalizer::new(self.zone()?, &self.zone_aliases))
    }
}

/// Load the configuration file, falling back to defaults when it does not exist.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_config(path: &Path) -> Result<AppConfig> {
    match fs::read_to_string(path).await {
        Ok(text) => {
            let config = AppConfig::from_yaml(&text)?;
            config.zone()?;
            info!("Loaded configuration");
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Configuration file not found; using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
timezone: Europe/London
zone_aliases: [GMT, BST]
documents:
  backend: local
  local_dir: /tmp/pages
pages:
  news: News
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.zone().unwrap(), chrono_tz::Europe::London);
        assert_eq!(config.documents.backend, Backend::Local);
        assert_eq!(config.documents.local_dir, PathBuf::from("/tmp/pages"));
        assert_eq!(config.pages.news, "News");
        assert_eq!(config.pages.sales, "Wiki_Home/Current_Sales");
        assert_eq!(config.http.max_retries, 2);
    }

    #[test]
    fn test_bad_timezone_is_config_error() {
        let config = AppConfig::from_yaml("timezone: Mars/Olympus").unwrap();
        assert!(matches!(config.zone(), Err(NewscastError::Config(_))));
    }

    #[test]
    fn test_bad_yaml_is_error() {
        assert!(matches!(AppConfig::from_yaml("timezone: [unclosed"), Err(NewscastError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("newscast.yaml");
        std::fs::write(&path, "ledger_path: state/known.json\nhttp:\n  max_retries: 0\n").unwrap();
        let config = load_config(&path).await.unwrap();
        assert_eq!(config.ledger_path, PathBuf::from("state/known.json"));
        assert_eq!(config.http.max_retries, 0);
        assert_eq!(config.http.base_delay_ms, 1000);
    }
}
