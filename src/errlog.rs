use std::error::Error;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEntry {
    pub id: String,
    pub occurred_at: String,
    pub context: String,
    pub message: String,
}

impl ErrorEntry {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            occurred_at: now_utc_rfc3339(),
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Append-only JSON lines file of errors seen by the dashboard. Transient:
/// `clear` removes it.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &ErrorEntry) -> Result<(), ErrorLogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(entry)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<ErrorEntry>, ErrorLogError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|source| ErrorLogError::Corrupt {
                line: index + 1,
                source,
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Returns how many entries were removed.
    pub fn clear(&self) -> Result<usize, ErrorLogError> {
        let count = self.read_all().map(|entries| entries.len()).unwrap_or(0);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(count),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[derive(Debug)]
pub enum ErrorLogError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    Corrupt {
        line: usize,
        source: serde_json::Error,
    },
}

impl fmt::Display for ErrorLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLogError::Io(err) => write!(f, "I/O error on error log: {}", err),
            ErrorLogError::Serialize(err) => {
                write!(f, "failed to serialize error entry as JSON: {}", err)
            }
            ErrorLogError::Corrupt { line, source } => {
                write!(f, "error log line {} is not valid JSON: {}", line, source)
            }
        }
    }
}

impl Error for ErrorLogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ErrorLogError::Io(err) => Some(err),
            ErrorLogError::Serialize(err) => Some(err),
            ErrorLogError::Corrupt { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ErrorLogError {
    fn from(value: std::io::Error) -> Self {
        ErrorLogError::Io(value)
    }
}

impl From<serde_json::Error> for ErrorLogError {
    fn from(value: serde_json::Error) -> Self {
        ErrorLogError::Serialize(value)
    }
}
