use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Columns every export starts with, even when no round was played.
pub const BASE_COLUMNS: [&str; 6] = ["Round", "Frame", "Order", "Demand", "Profit", "WarmUp_Score"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// One flattened round with the session-level fields repeated on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRow {
    columns: Vec<(String, ExportValue)>,
}

impl ExportRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, replacing an earlier value under the same key.
    pub fn push(&mut self, key: impl Into<String>, value: ExportValue) {
        let key = key.into();
        match self.columns.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ExportValue> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, ExportValue)] {
        &self.columns
    }
}

impl Serialize for ExportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (key, value) in &self.columns {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Body of the collection endpoint POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPayload {
    pub data: Vec<ExportRow>,
}

impl SyncPayload {
    pub fn new(rows: Vec<ExportRow>) -> Self {
        Self { data: rows }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unable to encode results: {0}")]
    Csv(#[from] csv::Error),
    #[error("unable to flush results: {0}")]
    Flush(String),
}

/// Encodes rows as UTF-8 CSV. The header is the base columns followed by any
/// further keys in first-seen order; zero rows yield a header-only file.
pub fn export_csv(rows: &[ExportRow]) -> Result<Vec<u8>, ExportError> {
    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    for row in rows {
        for (key, _) in row.columns() {
            if !header.contains(&key.as_str()) {
                header.push(key.as_str());
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(header.iter().map(|column| {
            row.get(column)
                .map(ExportValue::to_string)
                .unwrap_or_default()
        }))?;
    }

    writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.to_string()))
}
