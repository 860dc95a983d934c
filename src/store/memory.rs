use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;

use super::{FetchedRows, RemoteRow, RowUpdate, StoreError, TabularStore};
use crate::domain::record::WRITABLE_COLUMNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Fetch,
    Append,
    Update,
    Delete,
    Batch,
    SheetId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Fetch,
    Append(Vec<String>),
    Update(u32, Vec<String>),
    Delete(u32),
    Batch(Vec<(u32, Vec<String>)>),
    SheetId,
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreCall::Fetch | StoreCall::SheetId)
    }
}

/// In-memory sheet that behaves like the remote one (header row, structural
/// delete, A..I updates) and records every call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    header: Vec<String>,
    rows: RefCell<Vec<Vec<String>>>,
    calls: RefCell<Vec<StoreCall>>,
    counts: RefCell<HashMap<StoreOp, usize>>,
    failures: RefCell<HashMap<(StoreOp, usize), StoreError>>,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            header: ["ODP", "NAMA", "ALAMAT", "NO TELEPON", "NAMA SALES"]
                .iter()
                .map(|cell| cell.to_string())
                .collect(),
            rows: RefCell::new(rows),
            ..Self::default()
        }
    }

    /// Makes the `nth` call (1-based, counted per operation) fail.
    pub fn fail_on_call(&self, op: StoreOp, nth: usize, err: StoreError) {
        self.failures.borrow_mut().insert((op, nth), err);
    }

    /// Makes every call of `op` fail from now on, up to a generous bound.
    pub fn fail_always(&self, op: StoreOp, err: StoreError) {
        let next = self.counts.borrow().get(&op).copied().unwrap_or(0) + 1;
        let mut failures = self.failures.borrow_mut();
        for nth in next..next + 64 {
            failures.insert((op, nth), err.clone());
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.borrow().clone()
    }

    /// Simulates an edit made by someone else directly in the sheet.
    pub fn set_cell(&self, data_index: usize, column: usize, value: &str) {
        let mut rows = self.rows.borrow_mut();
        if let Some(row) = rows.get_mut(data_index) {
            if row.len() <= column {
                row.resize(column + 1, String::new());
            }
            row[column] = value.to_string();
        }
    }

    pub fn remove_row(&self, data_index: usize) {
        self.rows.borrow_mut().remove(data_index);
    }

    fn enter(&self, op: StoreOp, call: StoreCall) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(call);
        let mut counts = self.counts.borrow_mut();
        let count = counts.entry(op).or_insert(0);
        *count += 1;
        match self.failures.borrow_mut().remove(&(op, *count)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn data_index(&self, row: RemoteRow) -> Result<usize, StoreError> {
        let index = (row.number() - 2) as usize;
        if index >= self.rows.borrow().len() {
            return Err(StoreError::Api {
                code: Some(400),
                status: Some("INVALID_ARGUMENT".to_string()),
                message: format!("row {} is outside the sheet", row),
            });
        }
        Ok(index)
    }

    fn overwrite(&self, index: usize, values: &[String]) {
        let mut rows = self.rows.borrow_mut();
        let target = &mut rows[index];
        let width = values.len().min(WRITABLE_COLUMNS);
        if target.len() < width {
            target.resize(width, String::new());
        }
        target[..width].clone_from_slice(&values[..width]);
    }
}

#[async_trait(?Send)]
impl TabularStore for MemoryStore {
    async fn fetch_rows(&self) -> Result<FetchedRows, StoreError> {
        self.enter(StoreOp::Fetch, StoreCall::Fetch)?;
        let rows = self.rows.borrow().clone();
        if rows.is_empty() {
            return Ok(FetchedRows::Empty);
        }
        Ok(FetchedRows::Rows {
            header: self.header.clone(),
            rows,
        })
    }

    async fn append_row(&self, values: &[String]) -> Result<(), StoreError> {
        self.enter(StoreOp::Append, StoreCall::Append(values.to_vec()))?;
        self.rows.borrow_mut().push(values.to_vec());
        Ok(())
    }

    async fn update_row(&self, row: RemoteRow, values: &[String]) -> Result<(), StoreError> {
        self.enter(
            StoreOp::Update,
            StoreCall::Update(row.number(), values.to_vec()),
        )?;
        let index = self.data_index(row)?;
        self.overwrite(index, values);
        Ok(())
    }

    async fn delete_row(&self, row: RemoteRow) -> Result<(), StoreError> {
        self.enter(StoreOp::Delete, StoreCall::Delete(row.number()))?;
        let index = self.data_index(row)?;
        self.rows.borrow_mut().remove(index);
        Ok(())
    }

    async fn batch_update(&self, updates: &[RowUpdate]) -> Result<(), StoreError> {
        let call = StoreCall::Batch(
            updates
                .iter()
                .map(|update| (update.row.number(), update.values.clone()))
                .collect(),
        );
        self.enter(StoreOp::Batch, call)?;
        let indices = updates
            .iter()
            .map(|update| self.data_index(update.row))
            .collect::<Result<Vec<_>, _>>()?;
        for (index, update) in indices.into_iter().zip(updates) {
            self.overwrite(index, &update.values);
        }
        Ok(())
    }

    async fn sheet_id(&self) -> Result<i64, StoreError> {
        self.enter(StoreOp::SheetId, StoreCall::SheetId)?;
        Ok(0)
    }
}
