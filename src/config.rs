use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::dashboard::DashboardSettings;
use crate::domain::record::RecordDefaults;
use crate::store::{AccessToken, Credentials, RetryPolicy, SheetsConfig};
use crate::view::KeywordCategory;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub store: StoreSection,
    pub auth: AuthSection,
    pub records: RecordsSection,
    pub category: CategorySection,
    pub setup: SetupSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSection {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub read_range: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<i64>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSection {
    pub api_key: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<String>,
}

impl fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |value: &str| if value.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("AuthSection")
            .field("api_key", &mask(&self.api_key))
            .field("access_token", &mask(&self.access_token))
            .field("token_expires_at", &self.token_expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordsSection {
    pub default_visit: String,
    pub default_status: String,
    pub overview_label: String,
    pub stamp_date_added: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySection {
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetupSection {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSection {
    pub error_log: String,
}

/// Values from command-line flags or their environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub spreadsheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub base_url: Option<String>,
    pub error_log: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config '{}': {}", path.display(), source)
            }
            ConfigError::Toml(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::Invalid(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "leadsheet")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn default_error_log_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().join("errors.jsonl"))
        .unwrap_or_else(|| std::env::temp_dir().join("leadsheet-errors.jsonl"))
}

impl Config {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str("")
    }

    /// Parses `user` and merges it over the built-in defaults.
    pub fn from_toml_str(user: &str) -> Result<Self, ConfigError> {
        let mut merged: toml::Table = DEFAULTS_TOML.parse()?;
        let user: toml::Table = user.parse()?;
        merge_tables(&mut merged, user);
        let config: Config = toml::Value::Table(merged).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the user file at `path` (or the default location). A missing file
    /// means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };
        let Some(path) = path else {
            return Self::builtin();
        };
        match fs::read_to_string(&path) {
            Ok(raw) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                Self::from_toml_str(&raw)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Self::builtin()
            }
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        let set = |slot: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                *slot = value.trim().to_string();
            }
        };
        set(&mut self.store.spreadsheet_id, &overrides.spreadsheet_id);
        set(&mut self.store.sheet_name, &overrides.sheet_name);
        set(&mut self.store.base_url, &overrides.base_url);
        set(&mut self.auth.api_key, &overrides.api_key);
        set(&mut self.auth.access_token, &overrides.access_token);
        if let Some(path) = &overrides.error_log {
            self.log.error_log = path.to_string_lossy().into_owned();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.read_range.trim().is_empty() {
            return Err(ConfigError::Invalid("store.read_range is empty".to_string()));
        }
        if self.setup.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "setup.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.records.overview_label.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "records.overview_label is empty".to_string(),
            ));
        }
        self.token_expiry()?;
        Ok(())
    }

    fn token_expiry(&self) -> Result<Option<OffsetDateTime>, ConfigError> {
        match self.auth.token_expires_at.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => OffsetDateTime::parse(raw, &Rfc3339).map(Some).map_err(|err| {
                ConfigError::Invalid(format!(
                    "auth.token_expires_at '{}' is not RFC3339: {}",
                    raw, err
                ))
            }),
        }
    }

    pub fn sheets_config(&self) -> SheetsConfig {
        SheetsConfig {
            base_url: self.store.base_url.clone(),
            spreadsheet_id: self.store.spreadsheet_id.clone(),
            sheet_name: self.store.sheet_name.clone(),
            read_range: self.store.read_range.clone(),
            sheet_id: self.store.sheet_id,
            retry: RetryPolicy {
                max_attempts: self.setup.max_attempts,
                base_delay: Duration::from_millis(self.setup.retry_delay_ms),
            },
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let secret = self.auth.access_token.trim();
        let token = if secret.is_empty() {
            None
        } else {
            Some(AccessToken::new(secret, self.token_expiry()?))
        };
        Ok(Credentials::new(Some(self.auth.api_key.trim().to_string()), token))
    }

    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            defaults: RecordDefaults {
                visit_state: self.records.default_visit.clone(),
                status: self.records.default_status.clone(),
                stamp_date_added: self.records.stamp_date_added,
            },
            overview_label: self.records.overview_label.clone(),
        }
    }

    pub fn category(&self) -> KeywordCategory {
        KeywordCategory::new(&self.category.keywords)
    }

    pub fn error_log_path(&self) -> PathBuf {
        let configured = self.log.error_log.trim();
        if configured.is_empty() {
            default_error_log_path()
        } else {
            PathBuf::from(configured)
        }
    }
}

/// Recursive merge: tables merge key by key, everything else is replaced.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
