use crate::clock::{SystemClock, parse_utc_offset};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const DATA_FILE_NAME: &str = "data.json";
const COMPLETION_FILE_NAME: &str = "completion.json";
const CONFIG_ENV_VAR: &str = "TANKSITTER_CONFIG_PATH";
const DATA_ENV_VAR: &str = "TANKSITTER_DATA_PATH";
const COMPLETION_ENV_VAR: &str = "TANKSITTER_COMPLETION_PATH";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    #[serde(default)]
    pub completion_path: Option<PathBuf>,
    /// `+HH:MM`; replaces the detected local offset when set.
    #[serde(default)]
    pub utc_offset: Option<String>,
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn clock(&self) -> Result<SystemClock, AppError> {
        match self.utc_offset.as_deref() {
            Some(raw) => Ok(SystemClock::with_offset(parse_utc_offset(raw)?)),
            None => Ok(SystemClock::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub data_path: Option<PathBuf>,
    pub completion_path: Option<PathBuf>,
    pub utc_offset: Option<String>,
    pub log_filter: Option<String>,
}

/// Where the owner data file and the device-local completion file live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub data: PathBuf,
    pub completion: PathBuf,
}

impl StorePaths {
    /// Config value first, then environment, then next to the config file.
    pub fn resolve(config: &Config) -> Result<Self, AppError> {
        let data = config.data_path.clone().or_else(|| env_path(DATA_ENV_VAR));
        let completion = config
            .completion_path
            .clone()
            .or_else(|| env_path(COMPLETION_ENV_VAR));

        match (data, completion) {
            (Some(data), Some(completion)) => Ok(Self { data, completion }),
            (data, completion) => {
                let dir = config_dir(&config_path()?);
                Ok(Self {
                    data: data.unwrap_or_else(|| dir.join(DATA_FILE_NAME)),
                    completion: completion.unwrap_or_else(|| dir.join(COMPLETION_FILE_NAME)),
                })
            }
        }
    }
}

fn config_dir(config_file: &Path) -> PathBuf {
    config_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn default_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("tanksitter"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("tanksitter"))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    match env_path(CONFIG_ENV_VAR) {
        Some(path) => Ok(path),
        None => Ok(default_dir()?.join(CONFIG_FILE_NAME)),
    }
}

pub fn load_config() -> Result<Config, AppError> {
    let path = config_path()?;
    load_config_from_path(&path)
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(mut config: Config) -> Config {
    config.utc_offset = normalize_text(config.utc_offset);
    config.log_filter = normalize_text(config.log_filter);
    config
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(path) = overrides.data_path.as_ref() {
        merged.data_path = Some(path.clone());
    }
    if let Some(path) = overrides.completion_path.as_ref() {
        merged.completion_path = Some(path.clone());
    }
    if let Some(offset) = normalize_text(overrides.utc_offset.clone()) {
        merged.utc_offset = Some(offset);
    }
    if let Some(filter) = normalize_text(overrides.log_filter.clone()) {
        merged.log_filter = Some(filter);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, StorePaths, config_dir, load_config_from_path,
        load_config_with_fallback_from_path, merge_overrides,
    };
    use crate::clock::Clock;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tanksitter-{nanos}-{file_name}"))
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn load_config_reads_valid_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "data_path": "/tmp/tanks.json",
            "utc_offset": " +02:00 ",
            "log_filter": "   "
        });
        fs::write(&path, content.to_string()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.data_path, Some(PathBuf::from("/tmp/tanks.json")));
        assert_eq!(loaded.completion_path, None);
        assert_eq!(loaded.utc_offset.as_deref(), Some("+02:00"));
        assert_eq!(loaded.log_filter, None);
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            data_path: Some(PathBuf::from("/a/data.json")),
            completion_path: Some(PathBuf::from("/a/completion.json")),
            utc_offset: Some("+01:00".into()),
            log_filter: None,
        };
        let overrides = ConfigOverrides {
            utc_offset: Some("-05:00".into()),
            log_filter: Some("debug".into()),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.data_path, base.data_path);
        assert_eq!(merged.completion_path, base.completion_path);
        assert_eq!(merged.utc_offset.as_deref(), Some("-05:00"));
        assert_eq!(merged.log_filter.as_deref(), Some("debug"));
        assert_eq!(base.utc_offset.as_deref(), Some("+01:00"));
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            utc_offset: Some("+01:00".into()),
            ..Config::default()
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn configured_paths_win() {
        let config = Config {
            data_path: Some(PathBuf::from("/x/data.json")),
            completion_path: Some(PathBuf::from("/x/done.json")),
            ..Config::default()
        };

        let paths = StorePaths::resolve(&config).unwrap();

        assert_eq!(paths.data, PathBuf::from("/x/data.json"));
        assert_eq!(paths.completion, PathBuf::from("/x/done.json"));
    }

    #[test]
    fn default_store_dir_is_the_config_directory() {
        assert_eq!(
            config_dir(&PathBuf::from("/tmp/sitter-cfg/config.json")),
            PathBuf::from("/tmp/sitter-cfg")
        );
        assert_eq!(config_dir(&PathBuf::from("config.json")), PathBuf::new());
    }

    #[test]
    fn clock_uses_configured_offset() {
        let config = Config {
            utc_offset: Some("+14:00".into()),
            ..Config::default()
        };
        let clock = config.clock().unwrap();
        let utc_today = time::OffsetDateTime::now_utc().date();
        assert!(clock.today() >= utc_today);

        let bad = Config {
            utc_offset: Some("noon".into()),
            ..Config::default()
        };
        assert_eq!(bad.clock().unwrap_err().code(), "invalid_input");
    }
}
