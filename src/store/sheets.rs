use std::cell::Cell;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Url};
use time::OffsetDateTime;

use super::auth::{Credentials, ReadAuth};
use super::range::{a1_range, row_range, RemoteRow};
use super::retry::{with_retries, RetryPolicy};
use super::wire::{
    cell_to_string, BatchRequest, BatchUpdateBody, DeleteDimension, DimensionRange, ErrorEnvelope,
    GridRange, RowData, SpreadsheetMeta, UpdateCells, ValueRange, ValuesBody,
};
use super::{AuthError, FetchedRows, RowUpdate, StoreError, TabularStore};
use crate::domain::record::{COLUMN_COUNT, WRITABLE_COLUMNS};

const USER_ENTERED: (&str, &str) = ("valueInputOption", "USER_ENTERED");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub read_range: String,
    pub sheet_id: Option<i64>,
    pub retry: RetryPolicy,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: String::new(),
            sheet_name: "Sheet1".to_string(),
            read_range: "A1:J1000".to_string(),
            sheet_id: None,
            retry: RetryPolicy::default(),
        }
    }
}

pub fn is_valid_spreadsheet_id(value: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("id pattern should compile"))
        .is_match(value)
}

/// Google Sheets v4 client. Every call re-checks configuration and
/// credentials so an unconfigured client still constructs.
pub struct SheetsClient {
    http: Client,
    config: SheetsConfig,
    credentials: Credentials,
    sheet_id: Cell<Option<i64>>,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig, credentials: Credentials) -> Self {
        let sheet_id = Cell::new(config.sheet_id);
        Self {
            http: Client::new(),
            config,
            credentials,
            sheet_id,
        }
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    fn check_configuration(&self) -> Result<(), StoreError> {
        let id = self.config.spreadsheet_id.trim();
        if id.is_empty() {
            return Err(StoreError::Config("spreadsheet id is not set".to_string()));
        }
        if !is_valid_spreadsheet_id(id) {
            return Err(StoreError::Config(format!(
                "spreadsheet id '{}' contains invalid characters",
                id
            )));
        }
        if self.config.sheet_name.trim().is_empty() {
            return Err(StoreError::Config("sheet name is not set".to_string()));
        }
        Ok(())
    }

    /// `{base}/v4/spreadsheets/{id}` followed by `segments`.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.config.base_url).map_err(|err| {
            StoreError::Config(format!("invalid base url '{}': {}", self.config.base_url, err))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                StoreError::Config(format!("base url '{}' cannot be a base", self.config.base_url))
            })?;
            path.pop_if_empty()
                .push("v4")
                .push("spreadsheets")
                .extend(segments);
        }
        Ok(url)
    }

    fn spreadsheet_url(&self, suffix: &str) -> Result<Url, StoreError> {
        let segment = format!("{}{}", self.config.spreadsheet_id.trim(), suffix);
        self.url(&[&segment])
    }

    fn values_url(&self, range: &str) -> Result<Url, StoreError> {
        self.url(&[self.config.spreadsheet_id.trim(), "values", range])
    }

    fn authorize_read(&self, mut url: Url) -> Result<RequestBuilder, StoreError> {
        match self.credentials.for_read(OffsetDateTime::now_utc())? {
            ReadAuth::ApiKey(key) => {
                url.query_pairs_mut().append_pair("key", key);
                Ok(self.http.get(url))
            }
            ReadAuth::Bearer(token) => Ok(self.http.get(url).bearer_auth(token)),
        }
    }

    fn authorize_write(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let token = self.credentials.for_write(OffsetDateTime::now_utc())?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, StoreError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        check_response(status, &body)?;
        Ok(body)
    }

    async fn lookup_sheet_id(&self) -> Result<i64, StoreError> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        let body = self.send(self.authorize_read(url)?).await?;
        let meta: SpreadsheetMeta = serde_json::from_str(&body)?;
        let wanted = self.config.sheet_name.trim();
        meta.sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == wanted)
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| {
                StoreError::Config(format!("sheet '{}' not found in spreadsheet", wanted))
            })
    }

    async fn post_batch(&self, requests: Vec<BatchRequest>) -> Result<(), StoreError> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        let request = self
            .authorize_write(self.http.post(url))?
            .json(&BatchUpdateBody { requests });
        self.send(request).await.map(|_| ())
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Transport {
        status: err.status().map(|status| status.as_u16()),
        message: err.to_string(),
    }
}

/// Maps a raw response onto the error taxonomy: 401 is an expired session,
/// an error envelope is an API rejection whatever the status, and any other
/// non-success status is a transport failure.
pub(crate) fn check_response(status: u16, body: &str) -> Result<(), StoreError> {
    if status == 401 {
        return Err(StoreError::Auth(AuthError::Expired));
    }
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Err(StoreError::Api {
            code: envelope.error.code.or(Some(status)),
            status: envelope.error.status,
            message: envelope.error.message,
        });
    }
    if !(200..300).contains(&status) {
        let message = body.trim();
        return Err(StoreError::Transport {
            status: Some(status),
            message: if message.is_empty() {
                format!("HTTP {}", status)
            } else {
                message.chars().take(200).collect()
            },
        });
    }
    Ok(())
}

pub(crate) fn split_header(values: Vec<Vec<serde_json::Value>>) -> FetchedRows {
    let mut rows = values
        .into_iter()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());
    let Some(header) = rows.next() else {
        return FetchedRows::Empty;
    };
    let rows: Vec<Vec<String>> = rows.collect();
    if rows.is_empty() {
        return FetchedRows::Empty;
    }
    FetchedRows::Rows { header, rows }
}

#[async_trait(?Send)]
impl TabularStore for SheetsClient {
    async fn fetch_rows(&self) -> Result<FetchedRows, StoreError> {
        self.check_configuration()?;
        let range = a1_range(&self.config.sheet_name, &self.config.read_range);
        let url = self.values_url(&range)?;
        let body = self.send(self.authorize_read(url)?).await?;
        let value_range: ValueRange = serde_json::from_str(&body)?;
        let fetched = split_header(value_range.values);
        tracing::debug!(
            range = %range,
            rows = fetched.data_rows().len(),
            "fetched sheet rows"
        );
        Ok(fetched)
    }

    async fn append_row(&self, values: &[String]) -> Result<(), StoreError> {
        self.check_configuration()?;
        let range = a1_range(
            &self.config.sheet_name,
            &format!("A:{}", super::column_letter(COLUMN_COUNT - 1)),
        );
        let mut url = self.values_url(&format!("{}:append", range))?;
        url.query_pairs_mut().append_pair(USER_ENTERED.0, USER_ENTERED.1);
        let request = self
            .authorize_write(self.http.post(url))?
            .json(&ValuesBody { values: [values] });
        self.send(request).await?;
        tracing::info!(range = %range, "appended row");
        Ok(())
    }

    async fn update_row(&self, row: RemoteRow, values: &[String]) -> Result<(), StoreError> {
        self.check_configuration()?;
        let values = &values[..values.len().min(WRITABLE_COLUMNS)];
        let range = row_range(&self.config.sheet_name, row, WRITABLE_COLUMNS);
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair(USER_ENTERED.0, USER_ENTERED.1);
        let request = self
            .authorize_write(self.http.put(url))?
            .json(&ValuesBody { values: [values] });
        self.send(request).await?;
        tracing::info!(row = row.number(), "updated row");
        Ok(())
    }

    async fn delete_row(&self, row: RemoteRow) -> Result<(), StoreError> {
        self.check_configuration()?;
        let sheet_id = self.sheet_id().await?;
        let request = BatchRequest::DeleteDimension(DeleteDimension {
            range: DimensionRange {
                sheet_id,
                dimension: "ROWS",
                start_index: row.zero_based(),
                end_index: row.number(),
            },
        });
        self.post_batch(vec![request]).await?;
        tracing::info!(row = row.number(), "deleted row");
        Ok(())
    }

    async fn batch_update(&self, updates: &[RowUpdate]) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        self.check_configuration()?;
        let sheet_id = self.sheet_id().await?;
        let requests = updates
            .iter()
            .map(|update| {
                let values = &update.values[..update.values.len().min(WRITABLE_COLUMNS)];
                BatchRequest::UpdateCells(UpdateCells {
                    rows: vec![RowData::from_strings(values)],
                    fields: "userEnteredValue",
                    range: GridRange {
                        sheet_id,
                        start_row_index: update.row.zero_based(),
                        end_row_index: update.row.number(),
                        start_column_index: 0,
                        end_column_index: values.len() as u32,
                    },
                })
            })
            .collect();
        self.post_batch(requests).await?;
        tracing::info!(rows = updates.len(), "batch updated rows");
        Ok(())
    }

    async fn sheet_id(&self) -> Result<i64, StoreError> {
        if let Some(id) = self.sheet_id.get() {
            return Ok(id);
        }
        self.check_configuration()?;
        let id = with_retries(&self.config.retry, "resolve sheet id", || {
            self.lookup_sheet_id()
        })
        .await?;
        self.sheet_id.set(Some(id));
        Ok(id)
    }
}

#[cfg(test)]
#[path = "sheets_tests.rs"]
mod tests;
