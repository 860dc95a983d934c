use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::domain::record::{CustomerRecord, Field, COLUMN_COUNT};

/// Converts fetched data rows (header excluded) into customer records.
///
/// Total over any input: short rows read as blank cells, unparseable dates
/// become `None`, and rows with neither a name nor a phone are dropped.
pub fn normalize(raw_rows: &[Vec<String>]) -> Vec<CustomerRecord> {
    let mut records = Vec::with_capacity(raw_rows.len());
    for (data_index, row) in raw_rows.iter().enumerate() {
        let cells: Vec<String> = (0..COLUMN_COUNT).map(|column| cell(row, column)).collect();
        let text = |field: Field| cells[field.column()].clone();

        let name = text(Field::Name);
        let phone = text(Field::Phone);
        if name.is_empty() && phone.is_empty() {
            continue;
        }

        let sequence_id = u32::try_from(records.len() + 1).unwrap_or(u32::MAX);
        records.push(CustomerRecord {
            sequence_id,
            data_index,
            nearest_access_point: text(Field::NearestAccessPoint),
            name,
            address: text(Field::Address),
            phone,
            assigned_agent: text(Field::AssignedAgent),
            visit_state: text(Field::VisitState),
            note: text(Field::Note),
            status: text(Field::Status),
            additional_note: text(Field::AdditionalNote),
            date_added: parse_date_added(&cells[Field::DateAdded.column()]),
            etag: row_etag(&cells),
        });
    }
    records
}

fn cell(row: &[String], column: usize) -> String {
    row.get(column)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Short fingerprint of a row's ten cells, used as an edit precondition.
pub fn row_etag(cells: &[String]) -> String {
    let mut hasher = Sha256::new();
    for (index, value) in cells.iter().enumerate() {
        if index > 0 {
            hasher.update(b"\x1f");
        }
        hasher.update(value.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

/// Reads the date-added cell. Day-first for slash dates; everything is UTC.
pub fn parse_date_added(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    let datetime_formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!(
            "[day padding:none]/[month padding:none]/[year] [hour padding:none]:[minute]:[second]"
        ),
        format_description!(
            "[day padding:none]/[month padding:none]/[year] [hour padding:none]:[minute]"
        ),
    ];
    for format in datetime_formats {
        if let Ok(value) = PrimitiveDateTime::parse(raw, format) {
            return Some(value.assume_utc());
        }
    }

    let date_formats = [
        format_description!("[year]-[month]-[day]"),
        format_description!("[day padding:none]/[month padding:none]/[year]"),
    ];
    for format in date_formats {
        if let Ok(date) = Date::parse(raw, format) {
            return Some(date.midnight().assume_utc());
        }
    }

    None
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
