use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use time::OffsetDateTime;

use crate::config::{Config, ConfigError, Overrides};
use crate::dashboard::{Dashboard, DashboardError};
use crate::errlog::{ErrorEntry, ErrorLog, ErrorLogError};
use crate::store::{with_retries, ReadAuth, SheetsClient, StoreError, TabularStore};
use crate::ui::{RenderMode, TerminalSink};

pub type TerminalDashboard = Dashboard<SheetsClient, TerminalSink>;

/// Resolved configuration for one invocation; builds the dashboard and the
/// error log from it.
pub struct App {
    config: Config,
}

/// Result of `leadsheet check`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckReport {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub read_auth: String,
    pub write_auth: String,
    pub data_rows: usize,
    pub sheet_id: i64,
}

impl App {
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self, AppError> {
        let mut config = Config::load(config_path)?;
        config.apply(overrides);
        config.validate()?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    #[cfg(test)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn error_log(&self) -> ErrorLog {
        ErrorLog::new(self.config.error_log_path())
    }

    pub fn client(&self) -> Result<SheetsClient, AppError> {
        Ok(SheetsClient::new(
            self.config.sheets_config(),
            self.config.credentials()?,
        ))
    }

    pub fn dashboard(
        &self,
        mode: RenderMode,
        assume_yes: bool,
    ) -> Result<TerminalDashboard, AppError> {
        let dashboard = Dashboard::new(
            self.client()?,
            TerminalSink::new(mode, assume_yes),
            Box::new(self.config.category()),
            self.config.dashboard_settings(),
        )
        .with_error_log(self.error_log());
        Ok(dashboard)
    }

    /// Verifies configuration and connectivity without touching any row.
    /// Failures are logged like dashboard errors.
    pub async fn check(&self) -> Result<CheckReport, AppError> {
        let result = self.verify_connection().await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "connection check failed");
            let entry = ErrorEntry::new("check", err.to_string());
            if let Err(log_err) = self.error_log().append(&entry) {
                tracing::warn!(error = %log_err, "could not write error log");
            }
        }
        result
    }

    async fn verify_connection(&self) -> Result<CheckReport, AppError> {
        let credentials = self.config.credentials()?;
        let now = OffsetDateTime::now_utc();
        let read_auth = match credentials.for_read(now) {
            Ok(ReadAuth::ApiKey(_)) => "api key".to_string(),
            Ok(ReadAuth::Bearer(_)) => "access token".to_string(),
            Err(err) => err.to_string(),
        };
        let write_auth = match credentials.for_write(now) {
            Ok(_) => "access token".to_string(),
            Err(err) => err.to_string(),
        };

        let client = SheetsClient::new(self.config.sheets_config(), credentials);
        let fetched = with_retries(&client.config().retry, "connection check", || {
            client.fetch_rows()
        })
        .await?;
        let sheet_id = client.sheet_id().await?;
        tracing::info!(sheet_id, rows = fetched.data_rows().len(), "spreadsheet reachable");

        Ok(CheckReport {
            spreadsheet_id: self.config.store.spreadsheet_id.clone(),
            sheet_name: self.config.store.sheet_name.clone(),
            read_auth,
            write_auth,
            data_rows: fetched.data_rows().len(),
            sheet_id,
        })
    }
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Config(ConfigError),
    Dashboard(DashboardError),
    Store(StoreError),
    ErrorLog(ErrorLogError),
    InvalidArgument(String),
    NotFound(u32),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Dashboard(err) => write!(f, "{}", err),
            AppError::Store(err) => write!(f, "{}", err),
            AppError::ErrorLog(err) => write!(f, "error log: {}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(id) => write!(f, "customer #{} not found", id),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Dashboard(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::ErrorLog(err) => Some(err),
            AppError::InvalidArgument(_) => None,
            AppError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<DashboardError> for AppError {
    fn from(value: DashboardError) -> Self {
        AppError::Dashboard(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<ErrorLogError> for AppError {
    fn from(value: ErrorLogError) -> Self {
        AppError::ErrorLog(value)
    }
}
