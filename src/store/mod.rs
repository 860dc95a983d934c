//! Remote tabular store: the seam between the dashboard and the spreadsheet.

mod auth;
#[cfg(test)]
pub mod memory;
mod range;
mod retry;
mod sheets;
mod wire;

use std::error::Error;
use std::fmt;

use async_trait::async_trait;

pub use auth::{AccessToken, AuthError, Credentials, ReadAuth};
pub use range::{column_letter, RemoteRow};
pub use retry::{with_retries, RetryPolicy};
pub use sheets::{SheetsClient, SheetsConfig};

/// Result of a read. A sheet with only a header (or nothing at all) is
/// `Empty`, which is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedRows {
    Empty,
    Rows {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl FetchedRows {
    pub fn data_rows(&self) -> &[Vec<String>] {
        match self {
            FetchedRows::Empty => &[],
            FetchedRows::Rows { rows, .. } => rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub row: RemoteRow,
    pub values: Vec<String>,
}

#[async_trait(?Send)]
pub trait TabularStore {
    async fn fetch_rows(&self) -> Result<FetchedRows, StoreError>;

    async fn append_row(&self, values: &[String]) -> Result<(), StoreError>;

    /// Overwrites columns A..I of one row; column J is left alone.
    async fn update_row(&self, row: RemoteRow, values: &[String]) -> Result<(), StoreError>;

    /// Structural delete: later rows shift up by one.
    async fn delete_row(&self, row: RemoteRow) -> Result<(), StoreError>;

    async fn batch_update(&self, updates: &[RowUpdate]) -> Result<(), StoreError>;

    /// Numeric id of the addressed sheet tab.
    async fn sheet_id(&self) -> Result<i64, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Transport {
        status: Option<u16>,
        message: String,
    },
    Api {
        code: Option<u16>,
        status: Option<String>,
        message: String,
    },
    Auth(AuthError),
    Config(String),
    Decode(String),
}

impl StoreError {
    /// HTTP status behind the failure, when there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            StoreError::Transport { status, .. } => *status,
            StoreError::Api { code, .. } => *code,
            StoreError::Auth(AuthError::Expired) => Some(401),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport { status: None, .. } => true,
            StoreError::Transport {
                status: Some(status),
                ..
            }
            | StoreError::Api {
                code: Some(status), ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Transport {
                status: Some(status),
                message,
            } => write!(f, "transport error (HTTP {}): {}", status, message),
            StoreError::Transport {
                status: None,
                message,
            } => write!(f, "transport error: {}", message),
            StoreError::Api {
                code,
                status,
                message,
            } => {
                write!(f, "spreadsheet API error")?;
                match (code, status) {
                    (Some(code), Some(status)) => write!(f, " ({} {})", code, status)?,
                    (Some(code), None) => write!(f, " ({})", code)?,
                    (None, Some(status)) => write!(f, " ({})", status)?,
                    (None, None) => {}
                }
                write!(f, ": {}", message)
            }
            StoreError::Auth(err) => write!(f, "authentication error: {}", err),
            StoreError::Config(message) => write!(f, "store configuration error: {}", message),
            StoreError::Decode(message) => write!(f, "unexpected response: {}", message),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Auth(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AuthError> for StoreError {
    fn from(value: AuthError) -> Self {
        StoreError::Auth(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Decode(value.to_string())
    }
}
