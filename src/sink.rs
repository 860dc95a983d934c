use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::filter::FilterState;
use crate::domain::record::CustomerRecord;

/// Where the records on screen came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Remote,
    Demo,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ViewSnapshot<'a> {
    pub records: &'a [CustomerRecord],
    pub filters: &'a FilterState,
    pub total: usize,
    pub source: DataSource,
}

/// Display surface driven by the dashboard. The dashboard never formats
/// output itself.
pub trait PresentationSink {
    fn render(&mut self, view: &ViewSnapshot<'_>);

    fn show_assignees(&mut self, assignees: &BTreeSet<String>);

    fn warn(&mut self, message: &str);

    fn notify(&mut self, message: &str);

    /// Yes/no decision point. `false` cancels the pending operation.
    fn confirm(&mut self, prompt: &str) -> bool;
}

#[cfg(test)]
pub use recording::RecordingSink;
