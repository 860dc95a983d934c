use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

/// Columns A..J of the customer sheet, in positional order.
pub const COLUMN_COUNT: usize = 10;

/// Columns A..I. Column J (date added) is only written on append.
pub const WRITABLE_COLUMNS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    NearestAccessPoint,
    Name,
    Address,
    Phone,
    AssignedAgent,
    VisitState,
    Note,
    Status,
    AdditionalNote,
    DateAdded,
}

impl Field {
    pub const ALL: [Field; COLUMN_COUNT] = [
        Field::NearestAccessPoint,
        Field::Name,
        Field::Address,
        Field::Phone,
        Field::AssignedAgent,
        Field::VisitState,
        Field::Note,
        Field::Status,
        Field::AdditionalNote,
        Field::DateAdded,
    ];

    pub const REQUIRED: [Field; 5] = [
        Field::Name,
        Field::Phone,
        Field::Address,
        Field::NearestAccessPoint,
        Field::AssignedAgent,
    ];

    pub fn column(self) -> usize {
        match self {
            Field::NearestAccessPoint => 0,
            Field::Name => 1,
            Field::Address => 2,
            Field::Phone => 3,
            Field::AssignedAgent => 4,
            Field::VisitState => 5,
            Field::Note => 6,
            Field::Status => 7,
            Field::AdditionalNote => 8,
            Field::DateAdded => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::NearestAccessPoint => "odp",
            Field::Name => "name",
            Field::Address => "address",
            Field::Phone => "phone",
            Field::AssignedAgent => "agent",
            Field::VisitState => "visit",
            Field::Note => "note",
            Field::Status => "status",
            Field::AdditionalNote => "extra",
            Field::DateAdded => "date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFieldError {
    value: String,
}

impl fmt::Display for ParseFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = Field::ALL
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "unknown field '{}'; expected one of: {}", self.value, names)
    }
}

impl Error for ParseFieldError {}

impl FromStr for Field {
    type Err = ParseFieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        let field = match normalized.as_str() {
            "odp" | "nearest_access_point" => Field::NearestAccessPoint,
            "name" => Field::Name,
            "address" => Field::Address,
            "phone" => Field::Phone,
            "agent" | "assigned_agent" | "sales" => Field::AssignedAgent,
            "visit" | "visit_state" => Field::VisitState,
            "note" => Field::Note,
            "status" => Field::Status,
            "extra" | "additional_note" => Field::AdditionalNote,
            "date" | "date_added" => Field::DateAdded,
            _ => {
                return Err(ParseFieldError {
                    value: value.to_string(),
                })
            }
        };
        Ok(field)
    }
}

/// One customer row after normalization.
///
/// `sequence_id` is the 1-based position among normalized records; it is what
/// users type. `data_index` is the 0-based position of the source row among
/// the fetched data rows (header excluded) and is the only input to remote row
/// translation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CustomerRecord {
    #[serde(rename = "id")]
    pub sequence_id: u32,
    #[serde(skip)]
    pub data_index: usize,
    pub nearest_access_point: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub assigned_agent: String,
    pub visit_state: String,
    pub note: String,
    pub status: String,
    pub additional_note: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_added: Option<OffsetDateTime>,
    pub etag: String,
}

impl CustomerRecord {
    pub fn value(&self, field: Field) -> String {
        match field {
            Field::NearestAccessPoint => self.nearest_access_point.clone(),
            Field::Name => self.name.clone(),
            Field::Address => self.address.clone(),
            Field::Phone => self.phone.clone(),
            Field::AssignedAgent => self.assigned_agent.clone(),
            Field::VisitState => self.visit_state.clone(),
            Field::Note => self.note.clone(),
            Field::Status => self.status.clone(),
            Field::AdditionalNote => self.additional_note.clone(),
            Field::DateAdded => self.date_added.map(format_sheet_datetime).unwrap_or_default(),
        }
    }

    /// Cells A..I in column order, as written back by an update.
    pub fn writable_cells(&self) -> Vec<String> {
        Field::ALL[..WRITABLE_COLUMNS]
            .iter()
            .map(|field| self.value(*field))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefaults {
    pub visit_state: String,
    pub status: String,
    pub stamp_date_added: bool,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            visit_state: "Not Visited".to_string(),
            status: "Pending".to_string(),
            stamp_date_added: true,
        }
    }
}

/// Form input for a new customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInput {
    pub nearest_access_point: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub assigned_agent: String,
    pub visit_state: String,
    pub note: String,
    pub status: String,
    pub additional_note: String,
    pub date_added: Option<String>,
}

impl CustomerInput {
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::NearestAccessPoint => &self.nearest_access_point,
            Field::Name => &self.name,
            Field::Address => &self.address,
            Field::Phone => &self.phone,
            Field::AssignedAgent => &self.assigned_agent,
            Field::VisitState => &self.visit_state,
            Field::Note => &self.note,
            Field::Status => &self.status,
            Field::AdditionalNote => &self.additional_note,
            Field::DateAdded => self.date_added.as_deref().unwrap_or(""),
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::NearestAccessPoint => self.nearest_access_point = value,
            Field::Name => self.name = value,
            Field::Address => self.address = value,
            Field::Phone => self.phone = value,
            Field::AssignedAgent => self.assigned_agent = value,
            Field::VisitState => self.visit_state = value,
            Field::Note => self.note = value,
            Field::Status => self.status = value,
            Field::AdditionalNote => self.additional_note = value,
            Field::DateAdded => self.date_added = Some(value),
        }
    }

    /// Cells A..J for an append, with blank visit/status replaced by defaults.
    pub fn to_row(&self, defaults: &RecordDefaults, now: OffsetDateTime) -> Vec<String> {
        let mut cells: Vec<String> = Field::ALL[..WRITABLE_COLUMNS]
            .iter()
            .map(|field| self.value(*field).trim().to_string())
            .collect();
        if cells[Field::VisitState.column()].is_empty() {
            cells[Field::VisitState.column()] = defaults.visit_state.clone();
        }
        if cells[Field::Status.column()].is_empty() {
            cells[Field::Status.column()] = defaults.status.clone();
        }
        let date = match self.date_added.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => date.to_string(),
            _ if defaults.stamp_date_added => format_sheet_datetime(now),
            _ => String::new(),
        };
        cells.push(date);
        cells
    }
}

/// Partial edit of an existing record; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub nearest_access_point: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub assigned_agent: Option<String>,
    pub visit_state: Option<String>,
    pub note: Option<String>,
    pub status: Option<String>,
    pub additional_note: Option<String>,
}

impl RecordPatch {
    pub fn has_changes(&self) -> bool {
        self.changed_fields().next().is_some()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::NearestAccessPoint => &self.nearest_access_point,
            Field::Name => &self.name,
            Field::Address => &self.address,
            Field::Phone => &self.phone,
            Field::AssignedAgent => &self.assigned_agent,
            Field::VisitState => &self.visit_state,
            Field::Note => &self.note,
            Field::Status => &self.status,
            Field::AdditionalNote => &self.additional_note,
            Field::DateAdded => return None,
        };
        value.as_deref()
    }

    /// Sets one field. The date column is not editable.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> Result<(), ParseFieldError> {
        let slot = match field {
            Field::NearestAccessPoint => &mut self.nearest_access_point,
            Field::Name => &mut self.name,
            Field::Address => &mut self.address,
            Field::Phone => &mut self.phone,
            Field::AssignedAgent => &mut self.assigned_agent,
            Field::VisitState => &mut self.visit_state,
            Field::Note => &mut self.note,
            Field::Status => &mut self.status,
            Field::AdditionalNote => &mut self.additional_note,
            Field::DateAdded => {
                return Err(ParseFieldError {
                    value: field.as_str().to_string(),
                })
            }
        };
        *slot = Some(value.into());
        Ok(())
    }

    pub fn changed_fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL[..WRITABLE_COLUMNS]
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_some())
    }

    /// Cells A..I for `record` with this patch applied.
    pub fn apply(&self, record: &CustomerRecord) -> Vec<String> {
        let mut cells = record.writable_cells();
        for field in self.changed_fields() {
            if let Some(value) = self.get(field) {
                cells[field.column()] = value.trim().to_string();
            }
        }
        cells
    }
}

pub fn format_sheet_datetime(value: OffsetDateTime) -> String {
    value
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_default()
}
