//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/topicbase/config.toml)
//! 3. Environment variables (TOPICBASE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "TOPICBASE";

/// File name of the primary index
pub const INDEX_FILE: &str = "topic_tree.json";

/// File name of the index backup
pub const BACKUP_FILE: &str = "topic_tree.json.bak";

/// Name of the top-level content directory
pub const TOPICS_DIR: &str = "topics";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the index, its backup and the content directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Refresh the index backup every time the catalog is opened
    #[serde(default = "default_backup_on_open")]
    pub backup_on_open: bool,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backup_on_open: default_backup_on_open(),
            log_file: None,
        }
    }
}

impl Config {
    /// Configuration rooted at a specific data directory, other fields default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (TOPICBASE_DATA_DIR, TOPICBASE_BACKUP_ON_OPEN, TOPICBASE_LOG_FILE)
    /// 2. Config file (~/.config/topicbase/config.toml or TOPICBASE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TOPICBASE_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            if !val.trim().is_empty() {
                self.data_dir = PathBuf::from(val.trim());
            }
        }

        // TOPICBASE_BACKUP_ON_OPEN
        if let Ok(val) = std::env::var(format!("{}_BACKUP_ON_OPEN", ENV_PREFIX)) {
            self.backup_on_open = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // TOPICBASE_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TOPICBASE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("topicbase")
            .join("config.toml")
    }

    /// Get the path to the primary index
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// Get the path to the index backup
    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join(BACKUP_FILE)
    }

    /// Get the path to the top-level content directory
    pub fn topics_dir(&self) -> PathBuf {
        self.data_dir.join(TOPICS_DIR)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("topicbase")
}

fn default_backup_on_open() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "TOPICBASE_DATA_DIR",
        "TOPICBASE_BACKUP_ON_OPEN",
        "TOPICBASE_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.backup_on_open);
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("topicbase"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::with_data_dir("/srv/catalog");

        assert_eq!(config.index_path(), PathBuf::from("/srv/catalog/topic_tree.json"));
        assert_eq!(
            config.backup_path(),
            PathBuf::from("/srv/catalog/topic_tree.json.bak")
        );
        assert_eq!(config.topics_dir(), PathBuf::from("/srv/catalog/topics"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("TOPICBASE_DATA_DIR", "/tmp/topicbase-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/topicbase-test"));
    }

    #[test]
    fn test_env_override_backup_on_open() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("TOPICBASE_BACKUP_ON_OPEN", "false");
        config.apply_env_overrides();
        assert!(!config.backup_on_open);

        env::set_var("TOPICBASE_BACKUP_ON_OPEN", "1");
        config.apply_env_overrides();
        assert!(config.backup_on_open);
    }

    #[test]
    fn test_env_override_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("TOPICBASE_LOG_FILE", "/tmp/topicbase.log");
        config.apply_env_overrides();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/topicbase.log")));

        // Empty string clears it
        env::set_var("TOPICBASE_LOG_FILE", "");
        config.apply_env_overrides();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            backup_on_open = false
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert!(!config.backup_on_open);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: PathBuf::from("/data/topicbase"),
            backup_on_open: false,
            log_file: Some(PathBuf::from("/var/log/topicbase.log")),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.backup_on_open, config.backup_on_open);
        assert_eq!(loaded.log_file, config.log_file);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.backup_on_open);
    }
}
