//! Loads the optional YAML config file and injects secrets from the environment.
//!
//! The file never holds credentials. `NOTION_API_KEY` and `NOTION_DATABASE_ID`
//! are read here and nowhere else; a missing or empty value fails with an
//! error that names the variable.

use anyhow::{anyhow, Result};
use notion_sync_core::config::SyncConfig;
use notion_sync_core::notion::{NotionApiConfig, NotionSettings};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const API_KEY_VAR: &str = "NOTION_API_KEY";
pub const DATABASE_ID_VAR: &str = "NOTION_DATABASE_ID";

/// Static (non-secret) part of the configuration, as written in YAML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub notion: NotionApiConfig,
    pub sync: SyncConfig,
}

/// Fully resolved configuration for one CLI invocation.
#[derive(Debug)]
pub struct CliConfig {
    pub notion: NotionSettings,
    pub sync: SyncConfig,
}

/// Reads `path` when given, otherwise starts from defaults, then injects secrets.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<CliConfig> {
    let file = match path {
        Some(path) => read_file_config(path.as_ref())?,
        None => {
            info!("No config file given, using defaults");
            FileConfig::default()
        }
    };

    let api_key = required_env(API_KEY_VAR)?;
    let database_id = required_env(DATABASE_ID_VAR)?;

    Ok(CliConfig {
        notion: NotionSettings {
            api_key,
            database_id,
            api: file.notion,
        },
        sync: file.sync,
    })
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    let parsed: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow!("Failed to parse config YAML {:?}: {e}", path)
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(parsed)
}

fn required_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => {
            error!(var = name, "Required environment variable is empty");
            Err(anyhow!("Environment variable {name} is set but empty"))
        }
        Err(_) => {
            error!(var = name, "Required environment variable is missing");
            Err(anyhow!("Environment variable {name} must be set"))
        }
    }
}
