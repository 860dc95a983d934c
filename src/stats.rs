use serde::Serialize;
use time::{Date, Month, OffsetDateTime};

use crate::domain::record::CustomerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub new_last_month: usize,
}

/// Start of the window: the same day one calendar month back, clamped to
/// the end of a shorter month.
pub fn one_month_before(now: OffsetDateTime) -> OffsetDateTime {
    let date = now.date();
    let (year, month) = match date.month() {
        Month::January => (date.year() - 1, Month::December),
        other => (date.year(), other.previous()),
    };
    let day = date.day().min(month.length(year));
    let start = Date::from_calendar_date(year, month, day).unwrap_or(date);
    start.with_time(now.time()).assume_offset(now.offset())
}

pub fn compute_stats(records: &[CustomerRecord], now: OffsetDateTime) -> DashboardStats {
    let since = one_month_before(now);
    let new_last_month = records
        .iter()
        .filter_map(|record| record.date_added)
        .filter(|added| *added >= since && *added <= now)
        .count();
    DashboardStats {
        total: records.len(),
        new_last_month,
    }
}
