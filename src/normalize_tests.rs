use super::{normalize, parse_date_added, row_etag};
use time::macros::datetime;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

#[test]
fn short_row_defaults_missing_columns() {
    let records = normalize(&[row(&["A1", "Budi", "Addr", "0812345678", "Nandi"])]);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.sequence_id, 1);
    assert_eq!(record.nearest_access_point, "A1");
    assert_eq!(record.name, "Budi");
    assert_eq!(record.assigned_agent, "Nandi");
    assert_eq!(record.visit_state, "");
    assert_eq!(record.note, "");
    assert_eq!(record.status, "");
    assert_eq!(record.additional_note, "");
    assert_eq!(record.date_added, None);
}

#[test]
fn rows_without_name_and_phone_are_dropped() {
    let records = normalize(&[
        row(&["ODP-1", "Budi", "", "", "Nandi"]),
        row(&["ODP-2", "", "Addr", "", "Andi"]),
        row(&[]),
        row(&["", "", "", "0811111111"]),
        row(&["  ", "   "]),
    ]);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Budi");
    assert_eq!(records[1].phone, "0811111111");
}

#[test]
fn sequence_ids_are_dense_but_data_index_tracks_source_rows() {
    let records = normalize(&[
        row(&["ODP-1", "Budi"]),
        row(&[]),
        row(&["ODP-3", "Siti"]),
    ]);

    assert_eq!(records[0].sequence_id, 1);
    assert_eq!(records[0].data_index, 0);
    assert_eq!(records[1].sequence_id, 2);
    assert_eq!(records[1].data_index, 2);
}

#[test]
fn cells_are_trimmed() {
    let records = normalize(&[row(&[" ODP-1 ", "  Budi  ", "", " 0812345678 "])]);
    assert_eq!(records[0].nearest_access_point, "ODP-1");
    assert_eq!(records[0].name, "Budi");
    assert_eq!(records[0].phone, "0812345678");
}

#[test]
fn invalid_dates_become_none() {
    let mut cells = vec![String::new(); 10];
    cells[1] = "Budi".to_string();
    cells[9] = "besok pagi".to_string();
    let records = normalize(&[cells]);
    assert_eq!(records[0].date_added, None);
}

#[test]
fn normalize_is_deterministic() {
    let input = vec![
        row(&["ODP-1", "Budi", "Addr", "0812345678", "Nandi", "Visited"]),
        row(&["ODP-2", "Siti", "Addr", "0822222222", "Andi", "", "", "", "", "2026-01-05"]),
    ];
    assert_eq!(normalize(&input), normalize(&input));
}

#[test]
fn empty_input_yields_no_records() {
    assert!(normalize(&[]).is_empty());
}

#[test]
fn parses_supported_date_formats() {
    assert_eq!(
        parse_date_added("2026-02-03T04:05:06Z"),
        Some(datetime!(2026-02-03 04:05:06 UTC))
    );
    assert_eq!(
        parse_date_added("2026-02-03 04:05:06"),
        Some(datetime!(2026-02-03 04:05:06 UTC))
    );
    assert_eq!(
        parse_date_added("2026-02-03 04:05"),
        Some(datetime!(2026-02-03 04:05:00 UTC))
    );
    assert_eq!(
        parse_date_added("2026-02-03"),
        Some(datetime!(2026-02-03 00:00:00 UTC))
    );
    assert_eq!(
        parse_date_added("3/2/2026"),
        Some(datetime!(2026-02-03 00:00:00 UTC))
    );
    assert_eq!(
        parse_date_added("25/12/2025 9:30:00"),
        Some(datetime!(2025-12-25 09:30:00 UTC))
    );
}

#[test]
fn rejects_non_dates() {
    assert_eq!(parse_date_added(""), None);
    assert_eq!(parse_date_added("   "), None);
    assert_eq!(parse_date_added("not a date"), None);
    assert_eq!(parse_date_added("2026-13-45"), None);
    assert_eq!(parse_date_added("31/02/2026"), None);
}

#[test]
fn etag_changes_with_any_cell() {
    let base = row(&["ODP-1", "Budi", "Addr", "0812345678"]);
    let mut edited = base.clone();
    edited[2] = "Other".to_string();

    assert_eq!(row_etag(&base), row_etag(&base.clone()));
    assert_ne!(row_etag(&base), row_etag(&edited));
    assert_eq!(row_etag(&base).len(), 12);
}

#[test]
fn record_etag_ignores_surrounding_whitespace() {
    let plain = normalize(&[row(&["ODP-1", "Budi"])]);
    let padded = normalize(&[row(&["ODP-1 ", " Budi", "", "", "", "", "", "", "", ""])]);
    assert_eq!(plain[0].etag, padded[0].etag);
}
