use std::fmt;

/// 1-based row number in the remote sheet. Row 1 is the header, so a valid
/// data row is always at least 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteRow(u32);

pub const HEADER_ROWS: u32 = 1;

impl RemoteRow {
    /// A sheet row by number; `None` for the header row and below.
    #[cfg(test)]
    pub fn new(number: u32) -> Option<Self> {
        (number > HEADER_ROWS).then_some(Self(number))
    }

    /// Translates a 0-based index among fetched data rows into a sheet row.
    /// Every write path goes through here.
    pub fn for_data_index(index: usize) -> Self {
        let index = u32::try_from(index).unwrap_or(u32::MAX - HEADER_ROWS - 1);
        Self(index + HEADER_ROWS + 1)
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// Index used by `batchUpdate` grid ranges.
    pub fn zero_based(self) -> u32 {
        self.0 - 1
    }
}

impl fmt::Display for RemoteRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

pub fn a1_range(sheet: &str, range: &str) -> String {
    format!("{}!{}", quote_sheet_name(sheet), range)
}

/// `'{sheet}'!A{row}:{last}{row}` covering `columns` cells of one row.
pub fn row_range(sheet: &str, row: RemoteRow, columns: usize) -> String {
    let last = column_letter(columns.saturating_sub(1));
    a1_range(sheet, &format!("A{row}:{last}{row}"))
}

pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}
