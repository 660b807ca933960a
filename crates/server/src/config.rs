#![forbid(unsafe_code)]

use pm_core::dates::parse_date;
use pm_core::worktime::WorkCalendar;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "PM_CONFIG";
pub const BIND_ENV: &str = "PM_BIND";
pub const STORAGE_DIR_ENV: &str = "PM_STORAGE_DIR";
pub const LOG_JSON_ENV: &str = "PM_LOG_JSON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("calendar: {0}")]
    Calendar(#[from] pm_core::dates::DateParseError),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub holidays: Vec<String>,
    pub workdays: Vec<String>,
}

impl CalendarConfig {
    pub fn to_calendar(&self) -> Result<WorkCalendar, ConfigError> {
        let holidays = self
            .holidays
            .iter()
            .map(|d| parse_date("holiday", d))
            .collect::<Result<Vec<_>, _>>()?;
        let workdays = self
            .workdays
            .iter()
            .map(|d| parse_date("workday", d))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WorkCalendar::new(holidays, workdays))
    }
}

/// A user created at startup, with the bearer token it authenticates with.
#[derive(Clone, Debug, Deserialize)]
pub struct SeedUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub token: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub storage_dir: PathBuf,
    pub log_json: bool,
    pub admin_usernames: Vec<String>,
    pub calendar: CalendarConfig,
    pub seed_users: Vec<SeedUser>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            storage_dir: PathBuf::from("./data"),
            log_json: false,
            admin_usernames: Vec::new(),
            calendar: CalendarConfig::default(),
            seed_users: Vec::new(),
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the YAML file named by `PM_CONFIG`, then `PM_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env_string(CONFIG_PATH_ENV) {
            Some(path) => Self::from_yaml_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(bind) = env_string(BIND_ENV) {
            self.bind = bind;
        }
        if let Some(dir) = env_string(STORAGE_DIR_ENV) {
            self.storage_dir = PathBuf::from(dir);
        }
        self.log_json = env_bool(LOG_JSON_ENV, self.log_json);
    }

    pub fn is_admin_username(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|name| name == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let config: ServerConfig = serde_yaml::from_str(
            "storage_dir: /var/lib/pm\n\
             admin_usernames: [root]\n\
             calendar:\n  holidays: ['2025-10-01']\n  workdays: ['2025-09-28']\n\
             seed_users:\n  - username: root\n    token: secret\n",
        )
        .expect("parse");
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/pm"));
        assert!(config.is_admin_username("root"));
        assert!(!config.is_admin_username("alice"));
        assert_eq!(config.seed_users.len(), 1);
        assert!(!config.seed_users[0].is_admin);

        let calendar = config.calendar.to_calendar().expect("calendar");
        assert!(!calendar.is_workday(date!(2025 - 10 - 01)));
        assert!(calendar.is_workday(date!(2025 - 09 - 28)));
    }

    #[test]
    fn bad_calendar_dates_are_rejected() {
        let calendar = CalendarConfig {
            holidays: vec!["2025-13-01".to_string()],
            workdays: Vec::new(),
        };
        assert!(matches!(calendar.to_calendar(), Err(ConfigError::Calendar(_))));
    }
}
