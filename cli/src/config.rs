use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::usda::DEFAULT_ENDPOINT;

/// USDA's shared, heavily rate-limited key. Good enough to try things out.
pub const DEMO_API_KEY: &str = "DEMO_KEY";
const API_KEY_ENV: &str = "USDA_API_KEY";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Optional `config.json` in the data directory.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    usda_api_key: Option<String>,
    usda_endpoint: Option<String>,
    log_level: Option<String>,
}

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub usda_api_key: String,
    pub usda_endpoint: String,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "nutrilog").context("Could not determine home directory")?;
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::from_data_dir(proj_dirs.data_dir(), env_key)
    }

    /// Build the configuration rooted at `data_dir`. `env_api_key` wins over
    /// the key in `config.json`.
    pub fn from_data_dir(data_dir: &Path, env_api_key: Option<String>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let file_path = data_dir.join("config.json");
        let file: ConfigFile = if file_path.exists() {
            let content = std::fs::read_to_string(&file_path)
                .with_context(|| format!("Failed to read {}", file_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file: {}", file_path.display()))?
        } else {
            ConfigFile::default()
        };

        let usda_api_key = env_api_key
            .filter(|k| !k.trim().is_empty())
            .or(file.usda_api_key)
            .unwrap_or_else(|| DEMO_API_KEY.to_string());

        Ok(Config {
            db_path: data_dir.join("nutrilog.db"),
            data_dir: data_dir.to_path_buf(),
            usda_api_key,
            usda_endpoint: file
                .usda_endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            log_level: file
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// This is the bearer token for `nutrilog serve`, unrelated to the USDA
    /// key.
    pub fn load_or_create_api_key(&self) -> Result<String> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_data_dir(dir.path(), None).unwrap();
        assert_eq!(config.usda_api_key, DEMO_API_KEY);
        assert_eq!(config.usda_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.db_path, dir.path().join("nutrilog.db"));
    }

    #[test]
    fn test_file_values_used() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"usda_api_key": "file-key", "usda_endpoint": "http://localhost:9000/search", "log_level": "debug"}"#,
        )
        .unwrap();
        let config = Config::from_data_dir(dir.path(), None).unwrap();
        assert_eq!(config.usda_api_key, "file-key");
        assert_eq!(config.usda_endpoint, "http://localhost:9000/search");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_env_key_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"usda_api_key": "file-key"}"#,
        )
        .unwrap();
        let config = Config::from_data_dir(dir.path(), Some("env-key".to_string())).unwrap();
        assert_eq!(config.usda_api_key, "env-key");

        let config = Config::from_data_dir(dir.path(), Some("  ".to_string())).unwrap();
        assert_eq!(config.usda_api_key, "file-key");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{").unwrap();
        assert!(Config::from_data_dir(dir.path(), None).is_err());
    }

    #[test]
    fn test_api_key_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_data_dir(dir.path(), None).unwrap();
        let key = config.load_or_create_api_key().unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        let again = config.load_or_create_api_key().unwrap();
        assert_eq!(again, key);
    }
}
