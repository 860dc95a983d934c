use std::collections::BTreeSet;

use crate::domain::filter::{AssigneeFilter, CategoryFilter, FilterState};
use crate::domain::record::CustomerRecord;

/// Classifies a record into the primary category (schools) or not.
pub trait CategoryPredicate {
    fn is_primary(&self, record: &CustomerRecord) -> bool;
}

/// School classifier: a record is a school when a word of its name or notes
/// matches one of the configured keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCategory {
    keywords: Vec<String>,
}

impl KeywordCategory {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        Self { keywords }
    }

    fn matches_text(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        self.keywords.iter().any(|keyword| {
            if keyword.contains(' ') {
                lowered.contains(keyword.as_str())
            } else {
                words.iter().any(|word| word == keyword)
            }
        })
    }
}

impl CategoryPredicate for KeywordCategory {
    fn is_primary(&self, record: &CustomerRecord) -> bool {
        [&record.name, &record.note, &record.additional_note]
            .iter()
            .any(|text| self.matches_text(text))
    }
}

pub fn matches_category(
    record: &CustomerRecord,
    filter: CategoryFilter,
    predicate: &dyn CategoryPredicate,
) -> bool {
    match filter {
        CategoryFilter::All => true,
        CategoryFilter::School => predicate.is_primary(record),
        CategoryFilter::NonSchool => !predicate.is_primary(record),
    }
}

pub fn matches_assignee(record: &CustomerRecord, filter: &AssigneeFilter) -> bool {
    match filter {
        AssigneeFilter::All => true,
        AssigneeFilter::Agent(name) => record.assigned_agent == *name,
    }
}

/// Category first, then assignee. An assignee that no longer exists yields an
/// empty view rather than falling back to every agent.
pub fn compute_visible(
    records: &[CustomerRecord],
    state: &FilterState,
    predicate: &dyn CategoryPredicate,
) -> Vec<CustomerRecord> {
    records
        .iter()
        .filter(|record| matches_category(record, state.category, predicate))
        .filter(|record| matches_assignee(record, &state.assignee))
        .cloned()
        .collect()
}

/// Distinct agents for the sidebar, excluding the overview label.
pub fn derive_assignee_list(records: &[CustomerRecord], overview_label: &str) -> BTreeSet<String> {
    assignee_options(records)
        .into_iter()
        .filter(|name| !name.eq_ignore_ascii_case(overview_label.trim()))
        .collect()
}

/// Distinct agents offered when assigning a customer, overview label included.
pub fn assignee_options(records: &[CustomerRecord]) -> BTreeSet<String> {
    records
        .iter()
        .map(|record| record.assigned_agent.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
