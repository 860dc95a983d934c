use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use crate::demo::{demo_records, DEMO_WARNING};
use crate::domain::filter::{AssigneeFilter, CategoryFilter, FilterSelection, FilterState};
use crate::domain::record::{CustomerInput, CustomerRecord, RecordDefaults, RecordPatch};
use crate::errlog::{ErrorEntry, ErrorLog};
use crate::normalize::normalize;
use crate::sink::{DataSource, PresentationSink, ViewSnapshot};
use crate::stats::{compute_stats, DashboardStats};
use crate::store::{FetchedRows, RemoteRow, RowUpdate, StoreError, TabularStore};
use crate::validate::{validate_new, validate_patch, ValidationError};
use crate::view::{assignee_options, compute_visible, derive_assignee_list, CategoryPredicate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    pub defaults: RecordDefaults,
    pub overview_label: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            defaults: RecordDefaults::default(),
            overview_label: "overview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl OperationPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationPhase::Idle => "idle",
            OperationPhase::Validating => "validating",
            OperationPhase::Submitting => "submitting",
            OperationPhase::Succeeded => "succeeded",
            OperationPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    Cancelled,
}

/// A request coming from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Add(CustomerInput),
    Edit {
        sequence_id: u32,
        patch: RecordPatch,
        if_match: Option<String>,
    },
    Delete {
        sequence_id: u32,
        if_match: Option<String>,
    },
    BulkEdit {
        sequence_ids: Vec<u32>,
        patch: RecordPatch,
    },
    Filter(FilterSelection),
    Refresh,
}

#[derive(Debug)]
pub enum DashboardError {
    Validation(ValidationError),
    NotFound(u32),
    Stale { sequence_id: u32 },
    DemoReadOnly,
    InvalidArgument(String),
    Store(StoreError),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Validation(err) => write!(f, "{}", err),
            DashboardError::NotFound(id) => {
                write!(f, "customer #{} not found; refresh and try again", id)
            }
            DashboardError::Stale { sequence_id } => write!(
                f,
                "customer #{} changed in the spreadsheet since it was loaded; refresh and retry",
                sequence_id
            ),
            DashboardError::DemoReadOnly => write!(
                f,
                "demo data is read-only; fix the spreadsheet connection and refresh"
            ),
            DashboardError::InvalidArgument(message) => write!(f, "{}", message),
            DashboardError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl Error for DashboardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DashboardError::Validation(err) => Some(err),
            DashboardError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DashboardError {
    fn from(value: ValidationError) -> Self {
        DashboardError::Validation(value)
    }
}

impl From<StoreError> for DashboardError {
    fn from(value: StoreError) -> Self {
        DashboardError::Store(value)
    }
}

/// Warning shown when a read fails and demo data takes over.
pub fn describe_read_failure(err: &StoreError) -> String {
    let quota = matches!(
        err,
        StoreError::Api { status: Some(status), .. } if status == "RESOURCE_EXHAUSTED"
    );
    match err.http_status() {
        _ if quota => format!("spreadsheet API quota exceeded ({})", err),
        Some(403) | Some(429) => format!("spreadsheet quota exceeded or access forbidden ({})", err),
        Some(404) => "spreadsheet not found; check the spreadsheet id".to_string(),
        Some(401) => "access denied; check the API key or sign in again".to_string(),
        _ => format!("failed to load data: {}", err),
    }
}

/// Owns the record cache and filter state for one dashboard session and
/// mediates every change to the remote sheet.
pub struct Dashboard<S, P> {
    store: S,
    sink: P,
    category: Box<dyn CategoryPredicate>,
    settings: DashboardSettings,
    error_log: Option<ErrorLog>,
    records: Vec<CustomerRecord>,
    source: DataSource,
    filters: FilterState,
    phase: OperationPhase,
    last_outcome: Option<OperationPhase>,
}

impl<S: TabularStore, P: PresentationSink> Dashboard<S, P> {
    pub fn new(
        store: S,
        sink: P,
        category: Box<dyn CategoryPredicate>,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            store,
            sink,
            category,
            settings,
            error_log: None,
            records: Vec::new(),
            source: DataSource::Remote,
            filters: FilterState::default(),
            phase: OperationPhase::Idle,
            last_outcome: None,
        }
    }

    pub fn with_error_log(mut self, log: ErrorLog) -> Self {
        self.error_log = Some(log);
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    #[cfg(test)]
    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn record(&self, sequence_id: u32) -> Option<&CustomerRecord> {
        self.records
            .iter()
            .find(|record| record.sequence_id == sequence_id)
    }

    pub fn visible(&self) -> Vec<CustomerRecord> {
        compute_visible(&self.records, &self.filters, self.category.as_ref())
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn phase(&self) -> OperationPhase {
        self.phase
    }

    /// `Succeeded` or `Failed` for the last mutation that got past confirmation.
    pub fn last_outcome(&self) -> Option<OperationPhase> {
        self.last_outcome
    }

    pub fn assignees(&self) -> BTreeSet<String> {
        derive_assignee_list(&self.records, &self.settings.overview_label)
    }

    pub fn assignee_options(&self) -> BTreeSet<String> {
        assignee_options(&self.records)
    }

    /// Typed agent input resolved against the loaded records.
    pub fn resolve_assignee(&self, input: &str) -> AssigneeFilter {
        AssigneeFilter::choose(input, &self.assignee_options())
    }

    pub fn stats(&self, now: OffsetDateTime) -> DashboardStats {
        compute_stats(&self.records, now)
    }

    /// Replaces the cache from the sheet. Read failures and empty sheets fall
    /// back to the demo dataset with a warning, so this never fails.
    pub async fn load(&mut self) -> DataSource {
        match self.store.fetch_rows().await {
            Ok(fetched) => self.apply_fetched(fetched),
            Err(err) => {
                self.report_error("load", &err);
                let warning = format!("{}; {}", describe_read_failure(&err), DEMO_WARNING);
                self.sink.warn(&warning);
                self.replace_records(demo_records(), DataSource::Demo);
            }
        }
        self.source
    }

    pub async fn refresh(&mut self) -> DataSource {
        tracing::info!("refreshing records");
        self.load().await
    }

    /// Changes the category dimension only; the assignee choice is kept.
    pub fn set_category_filter(&mut self, category: CategoryFilter) {
        self.filters.category = category;
        self.filter_changed();
    }

    pub fn set_assignee_filter(&mut self, assignee: AssigneeFilter) {
        self.filters.assignee = assignee;
        self.filter_changed();
    }

    pub fn on_filter_selected(&mut self, selection: FilterSelection) {
        match selection {
            FilterSelection::Category(category) => self.set_category_filter(category),
            FilterSelection::Assignee(assignee) => self.set_assignee_filter(assignee),
        }
    }

    fn filter_changed(&mut self) {
        tracing::debug!(
            category = %self.filters.category,
            assignee = %self.filters.assignee,
            "filter changed"
        );
        self.render();
    }

    /// Replaces both filter dimensions and renders once.
    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.render();
    }

    /// Single entry point for events raised by the presentation layer.
    pub async fn handle(&mut self, intent: Intent) -> Result<MutationOutcome, DashboardError> {
        match intent {
            Intent::Add(input) => self
                .add_record(input)
                .await
                .map(|()| MutationOutcome::Applied),
            Intent::Edit {
                sequence_id,
                patch,
                if_match,
            } => self
                .edit_record(sequence_id, patch, if_match.as_deref())
                .await
                .map(|()| MutationOutcome::Applied),
            Intent::Delete {
                sequence_id,
                if_match,
            } => self.delete_record(sequence_id, if_match.as_deref()).await,
            Intent::BulkEdit {
                sequence_ids,
                patch,
            } => self.bulk_edit(&sequence_ids, patch).await,
            Intent::Filter(selection) => {
                self.on_filter_selected(selection);
                Ok(MutationOutcome::Applied)
            }
            Intent::Refresh => {
                self.refresh().await;
                Ok(MutationOutcome::Applied)
            }
        }
    }

    pub async fn add_record(&mut self, input: CustomerInput) -> Result<(), DashboardError> {
        self.set_phase(OperationPhase::Validating);
        if let Err(err) = validate_new(&input) {
            return Err(self.fail("add", err.into()));
        }

        self.set_phase(OperationPhase::Submitting);
        let row = input.to_row(&self.settings.defaults, OffsetDateTime::now_utc());
        if let Err(err) = self.store.append_row(&row).await {
            return Err(self.fail("add", err.into()));
        }

        self.succeed(format!("added customer '{}'", input.name.trim()))
            .await;
        Ok(())
    }

    pub async fn edit_record(
        &mut self,
        sequence_id: u32,
        patch: RecordPatch,
        if_match: Option<&str>,
    ) -> Result<(), DashboardError> {
        self.set_phase(OperationPhase::Validating);
        let prepared = self.writable_target(sequence_id, if_match).and_then(|target| {
            if !patch.has_changes() {
                return Err(DashboardError::InvalidArgument(
                    "nothing to change; pass at least one field".to_string(),
                ));
            }
            validate_patch(&patch)?;
            Ok(target)
        });
        let target = match prepared {
            Ok(target) => target,
            Err(err) => return Err(self.fail("edit", err)),
        };

        self.set_phase(OperationPhase::Submitting);
        if let Err(err) = self.submit_edit(&target, &patch).await {
            return Err(self.fail("edit", err));
        }

        self.succeed(format!("updated customer #{}", sequence_id))
            .await;
        Ok(())
    }

    pub async fn delete_record(
        &mut self,
        sequence_id: u32,
        if_match: Option<&str>,
    ) -> Result<MutationOutcome, DashboardError> {
        self.set_phase(OperationPhase::Validating);
        let target = match self.writable_target(sequence_id, if_match) {
            Ok(target) => target,
            Err(err) => return Err(self.fail("delete", err)),
        };

        let prompt = format!(
            "delete customer #{} '{}' ({})?",
            target.sequence_id, target.name, target.phone
        );
        if !self.sink.confirm(&prompt) {
            tracing::info!(sequence_id, "delete cancelled");
            self.set_phase(OperationPhase::Idle);
            return Ok(MutationOutcome::Cancelled);
        }

        self.set_phase(OperationPhase::Submitting);
        if let Err(err) = self.submit_delete(&target).await {
            return Err(self.fail("delete", err));
        }

        self.succeed(format!("deleted customer '{}'", target.name))
            .await;
        Ok(MutationOutcome::Applied)
    }

    /// Applies one patch to several records in a single batch request.
    pub async fn bulk_edit(
        &mut self,
        sequence_ids: &[u32],
        patch: RecordPatch,
    ) -> Result<MutationOutcome, DashboardError> {
        self.set_phase(OperationPhase::Validating);
        let targets = match self.bulk_targets(sequence_ids, &patch) {
            Ok(targets) => targets,
            Err(err) => return Err(self.fail("bulk", err)),
        };

        let prompt = format!("apply changes to {} customers?", targets.len());
        if !self.sink.confirm(&prompt) {
            tracing::info!(count = targets.len(), "bulk edit cancelled");
            self.set_phase(OperationPhase::Idle);
            return Ok(MutationOutcome::Cancelled);
        }

        self.set_phase(OperationPhase::Submitting);
        if let Err(err) = self.submit_bulk(&targets, &patch).await {
            return Err(self.fail("bulk", err));
        }

        self.succeed(format!("updated {} customers", targets.len()))
            .await;
        Ok(MutationOutcome::Applied)
    }

    fn writable_target(
        &self,
        sequence_id: u32,
        if_match: Option<&str>,
    ) -> Result<CustomerRecord, DashboardError> {
        if self.source == DataSource::Demo {
            return Err(DashboardError::DemoReadOnly);
        }
        let record = self
            .record(sequence_id)
            .ok_or(DashboardError::NotFound(sequence_id))?;
        if let Some(expected) = if_match {
            if expected.trim() != record.etag {
                return Err(DashboardError::Stale { sequence_id });
            }
        }
        Ok(record.clone())
    }

    fn bulk_targets(
        &self,
        sequence_ids: &[u32],
        patch: &RecordPatch,
    ) -> Result<Vec<CustomerRecord>, DashboardError> {
        if sequence_ids.is_empty() {
            return Err(DashboardError::InvalidArgument(
                "select at least one customer".to_string(),
            ));
        }
        if !patch.has_changes() {
            return Err(DashboardError::InvalidArgument(
                "nothing to change; pass at least one field".to_string(),
            ));
        }
        validate_patch(patch)?;
        let mut seen = HashSet::new();
        sequence_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|id| self.writable_target(*id, None))
            .collect()
    }

    /// Re-reads the sheet and returns the current version of `target`, or
    /// `Stale` if its row moved or changed since the cache was loaded.
    async fn fresh_targets(
        &self,
        targets: &[CustomerRecord],
    ) -> Result<Vec<CustomerRecord>, DashboardError> {
        let fetched = self.store.fetch_rows().await?;
        let current = normalize(fetched.data_rows());
        targets
            .iter()
            .map(|target| {
                current
                    .iter()
                    .find(|record| {
                        record.data_index == target.data_index && record.etag == target.etag
                    })
                    .cloned()
                    .ok_or(DashboardError::Stale {
                        sequence_id: target.sequence_id,
                    })
            })
            .collect()
    }

    async fn submit_edit(
        &self,
        target: &CustomerRecord,
        patch: &RecordPatch,
    ) -> Result<(), DashboardError> {
        let fresh = self.fresh_targets(std::slice::from_ref(target)).await?;
        let current = &fresh[0];
        let row = RemoteRow::for_data_index(current.data_index);
        self.store.update_row(row, &patch.apply(current)).await?;
        Ok(())
    }

    async fn submit_delete(&self, target: &CustomerRecord) -> Result<(), DashboardError> {
        let fresh = self.fresh_targets(std::slice::from_ref(target)).await?;
        let row = RemoteRow::for_data_index(fresh[0].data_index);
        self.store.delete_row(row).await?;
        Ok(())
    }

    async fn submit_bulk(
        &self,
        targets: &[CustomerRecord],
        patch: &RecordPatch,
    ) -> Result<(), DashboardError> {
        let updates: Vec<RowUpdate> = self
            .fresh_targets(targets)
            .await?
            .iter()
            .map(|current| RowUpdate {
                row: RemoteRow::for_data_index(current.data_index),
                values: patch.apply(current),
            })
            .collect();
        self.store.batch_update(&updates).await?;
        Ok(())
    }

    async fn succeed(&mut self, message: String) {
        self.set_phase(OperationPhase::Succeeded);
        self.last_outcome = Some(OperationPhase::Succeeded);
        self.sink.notify(&message);
        self.reload_after_write().await;
        self.set_phase(OperationPhase::Idle);
    }

    fn fail(&mut self, context: &str, err: DashboardError) -> DashboardError {
        self.set_phase(OperationPhase::Failed);
        self.last_outcome = Some(OperationPhase::Failed);
        self.report_error(context, &err);
        self.set_phase(OperationPhase::Idle);
        err
    }

    /// After a confirmed write the cache is always re-read. A failed re-read
    /// keeps the last loaded records; the write itself already happened.
    async fn reload_after_write(&mut self) {
        match self.store.fetch_rows().await {
            Ok(fetched) => self.apply_fetched(fetched),
            Err(err) => {
                self.report_error("reload", &err);
                self.sink.warn(&format!(
                    "change saved, but reloading failed ({}); showing previously loaded data",
                    err
                ));
            }
        }
    }

    fn apply_fetched(&mut self, fetched: FetchedRows) {
        let records = normalize(fetched.data_rows());
        if records.is_empty() {
            self.sink.warn(&format!(
                "the spreadsheet has no customer rows; {}",
                DEMO_WARNING
            ));
            self.replace_records(demo_records(), DataSource::Demo);
        } else {
            self.replace_records(records, DataSource::Remote);
        }
    }

    fn replace_records(&mut self, records: Vec<CustomerRecord>, source: DataSource) {
        tracing::info!(records = records.len(), ?source, "record cache replaced");
        self.records = records;
        self.source = source;
        let assignees = self.assignees();
        self.sink.show_assignees(&assignees);
        self.render();
    }

    fn render(&mut self) {
        let visible = self.visible();
        let snapshot = ViewSnapshot {
            records: &visible,
            filters: &self.filters,
            total: self.records.len(),
            source: self.source,
        };
        self.sink.render(&snapshot);
    }

    fn set_phase(&mut self, phase: OperationPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "operation phase");
        }
        self.phase = phase;
    }

    fn report_error(&self, context: &str, err: &dyn fmt::Display) {
        let message = err.to_string();
        tracing::error!(context, error = %message, "dashboard operation failed");
        if let Some(log) = &self.error_log {
            if let Err(log_err) = log.append(&ErrorEntry::new(context, message)) {
                tracing::warn!(
                    error = %log_err,
                    path = %log.path().display(),
                    "could not write error log"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests;
