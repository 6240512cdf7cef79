//! Application configuration
//!
//! Loaded once from `configuration.json` at startup and passed to whatever
//! needs it. The file is either a flat configuration object or a set of
//! named environments selected by a top-level `environment` key:
//!
//! ```json
//! {
//!   "environment": "development",
//!   "development": { "logging": { "logLevel": 0, "logTarget": "CONSOLE" } }
//! }
//! ```

use crate::search::{StopwordSet, SynonymTable, Vocabulary};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "configuration.json";

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogTarget {
    #[default]
    Console,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Lowest severity written (0 debug, 1 info, 2 warning, 3+ error)
    pub log_level: u8,
    pub log_target: LogTarget,
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: 1,
            log_target: LogTarget::Console,
            log_file: PathBuf::from("kvsearch.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub web_directory: PathBuf,
    pub default_document: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1337,
            web_directory: PathBuf::from("web"),
            default_document: "index.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    /// Alias -> canonical term
    pub synonyms: BTreeMap<String, String>,
    /// Use-case specific stopwords added to the built-in list
    pub stopwords: Vec<String>,
    pub use_default_stopwords: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            synonyms: BTreeMap::new(),
            stopwords: Vec::new(),
            use_default_stopwords: true,
        }
    }
}

impl SearchConfig {
    /// Build the term tables a search engine is constructed with
    pub fn vocabulary(&self) -> Vocabulary {
        let synonyms: SynonymTable = self.synonyms.iter().collect();

        let mut stopwords = if self.use_default_stopwords {
            StopwordSet::english()
        } else {
            StopwordSet::new()
        };
        stopwords.extend(&self.stopwords);

        Vocabulary { synonyms, stopwords }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataConfig {
    /// JSON array of records loaded into the store at startup
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub data: DataConfig,
    /// Environment section the configuration was read from
    #[serde(skip)]
    pub environment: Option<String>,
    /// File the configuration was read from, `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// True when no configuration file was found and built-in defaults apply
    pub fn uses_builtin_defaults(&self) -> bool {
        self.source.is_none()
    }
}

/// Candidate locations when no path is given: the working directory, then
/// the user config directory
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("kvsearch").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, the default locations are
/// tried and built-in defaults are used when none exists. `PORT` (or
/// `port`) in the environment overrides the server port.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => match default_config_paths().into_iter().find(|p| p.exists()) {
            Some(found) => load_config_file(&found)?,
            None => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Read and parse one configuration file
pub fn load_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let mut config = parse_config(&data)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.source = Some(path.to_path_buf());

    Ok(config)
}

/// Parse configuration text, resolving the active environment section
pub fn parse_config(data: &str) -> Result<Config> {
    let raw: Value = serde_json::from_str(data).context("Invalid JSON")?;

    let environment = raw
        .get("environment")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut config: Config = match &environment {
        Some(name) => {
            let section = raw
                .get(name)
                .with_context(|| format!("No configuration section for environment '{}'", name))?;
            if !section.is_object() {
                bail!("Configuration for environment '{}' is not an object", name);
            }
            Config::deserialize(section).context("Invalid configuration values")?
        }
        None => Config::deserialize(&raw).context("Invalid configuration values")?,
    };

    config.environment = environment;
    Ok(config)
}

/// Apply environment variable overrides through `lookup`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").or_else(|| lookup("port")) {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT value '{}'", port))?;
    }
    Ok(())
}
