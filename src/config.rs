//! Layered configuration.
//!
//! [`AppConfig::load`] layers, lowest first: the embedded defaults below, an
//! optional TOML file (`gov-events.toml` unless a path is given), and
//! `GOVEVENTS__SECTION__KEY` environment variables.

use crate::harvest::registry::SourceRegistry;
use crate::harvest::sources::{build_source, HttpFetcher};
use crate::model::{SourceConfig, SourceProtocol};
use config::{Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = concat!(
    r#"
[database]
path = "gov-events.db"

[harvest]
max_events_per_source = 100
filter_past           = true
request_timeout_secs  = 30
user_agent            = "gov-event-harvester/"#,
    env!("CARGO_PKG_VERSION"),
    r#""
"#
);

pub const DEFAULT_CONFIG_FILE: &str = "gov-events.toml";
const ENV_PREFIX: &str = "GOVEVENTS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("No database path configured (set [database] path or GOVEVENTS__DATABASE__PATH)")]
    MissingDatabase,
}

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub harvest: HarvestConfig,
    /// Extra sources, upserted over the built-in catalog by name
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// `[database]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<String>,
}

/// `[harvest]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    pub max_events_per_source: usize,
    pub filter_past: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub protocol: SourceProtocol,
    #[serde(flatten)]
    pub config: SourceConfig,
}

impl AppConfig {
    /// Loads the layered configuration.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_with(path, env)
    }

    pub(crate) fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };
        let config = config::Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// The built-in defaults alone.
    pub fn defaults() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Database location; absent or blank is a fatal configuration error.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        self.database
            .path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingDatabase)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.harvest.request_timeout_secs)
    }

    /// Built-in catalog with the configured sources upserted over it.
    pub fn source_registry(&self, http: &HttpFetcher) -> SourceRegistry {
        let mut registry = SourceRegistry::with_defaults(http);
        for entry in &self.sources {
            registry.add_source(build_source(entry.protocol, entry.config.clone(), http.clone()));
        }
        registry
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Jurisdiction, SourceType};
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn defaults_load() {
        let cfg = AppConfig::defaults().unwrap();
        assert_eq!(cfg.harvest.max_events_per_source, 100);
        assert!(cfg.harvest.filter_past);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert!(cfg.harvest.user_agent.starts_with("gov-event-harvester/"));
        assert_eq!(cfg.database_path().unwrap(), PathBuf::from("gov-events.db"));
        assert!(cfg.sources.is_empty());
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[harvest]
max_events_per_source = 25

[[sources]]
protocol = "scraper"
name = "oh-columbus-council"
url = "https://columbus.example.gov/meetings"
jurisdiction = "Local"
state = "OH"
source_type = "city-meetings"
agency = "Columbus City Council"
selector = ".event"
"#
        )
        .unwrap();

        let cfg = AppConfig::load_with(
            Some(file.path()),
            env(&[("GOVEVENTS__HARVEST__FILTER_PAST", "false")]),
        )
        .unwrap();

        assert_eq!(cfg.harvest.max_events_per_source, 25);
        assert!(!cfg.harvest.filter_past);
        assert_eq!(cfg.sources.len(), 1);
        let entry = &cfg.sources[0];
        assert_eq!(entry.protocol, SourceProtocol::Scraper);
        assert_eq!(entry.config.jurisdiction, Jurisdiction::Local);
        assert_eq!(entry.config.source_type, SourceType::CityMeetings);
        assert_eq!(entry.config.selector.as_deref(), Some(".event"));
    }

    #[test]
    fn blank_database_path_is_fatal() {
        let cfg = AppConfig::load_with(None, env(&[("GOVEVENTS__DATABASE__PATH", " ")])).unwrap();
        assert!(matches!(cfg.database_path(), Err(ConfigError::MissingDatabase)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = AppConfig::load_with(Some(Path::new("/nonexistent/gov-events.toml")), env(&[]));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn configured_sources_upsert_into_catalog() {
        let mut cfg = AppConfig::defaults().unwrap();
        let mut replacement = SourceConfig::new(
            "wa-ocio-blog",
            "https://ocio.example.gov/feed.xml",
            Jurisdiction::State,
            "WA",
            SourceType::Executive,
            "Washington OCIO",
        );
        replacement.options.insert("note".into(), serde_json::Value::from("mirror"));
        cfg.sources.push(SourceEntry {
            protocol: SourceProtocol::Feed,
            config: replacement,
        });

        let http = HttpFetcher::new(cfg.request_timeout(), &cfg.harvest.user_agent).unwrap();
        let registry = cfg.source_registry(&http);
        assert_eq!(registry.len(), 5);
        let source = &registry.get_all_sources(Some(&["wa-ocio-blog".to_string()]))[0];
        assert_eq!(source.config().url, "https://ocio.example.gov/feed.xml");
    }
}
