//! Record and dataset model shared by every analysis module.
//!
//! Records arrive as flat JSON objects (or CSV rows promoted to objects) and
//! are kept as `serde_json` maps so column order survives from the wire. The
//! first record's keys are the authoritative schema for the whole dataset.
//!
//! Value helpers in this module never fail: a value that cannot be read as a
//! number or timestamp simply yields `None` and callers skip it.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub type Record = Map<String, Value>;

/// Shapes the inbound payload boundary refuses to turn into a [`Dataset`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error(
        "payload must be an array of records or an object with a `data` or `results` array, found {0}"
    )]
    UnsupportedPayload(&'static str),
    #[error("field `{field}` must be an array of records, found {found}")]
    NotAnArray {
        field: &'static str,
        found: &'static str,
    },
    #[error("record {index} is not an object (found {found})")]
    NotAnObject { index: usize, found: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Builds a dataset from a bare JSON array of objects.
    pub fn from_json(value: Value) -> Result<Self, DatasetError> {
        match value {
            Value::Array(items) => records_from_array(items),
            other => Err(DatasetError::UnsupportedPayload(json_kind(&other))),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Column names taken from the first record, in wire order.
    ///
    /// Keys that only appear on later records are not discovered.
    pub fn columns(&self) -> Vec<String> {
        self.records
            .first()
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The leading `limit` records (fewer when the dataset is smaller).
    pub fn sample(&self, limit: usize) -> &[Record] {
        &self.records[..self.records.len().min(limit)]
    }

    /// Distinct non-missing values of `column` across every record.
    pub fn distinct_count(&self, column: &str) -> usize {
        let mut seen = std::collections::HashSet::new();
        for record in &self.records {
            if let Some(key) = record.get(column).and_then(value_key) {
                seen.insert(key.into_owned());
            }
        }
        seen.len()
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A query response collapsed to one dataset plus the optional SQL echo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    pub dataset: Dataset,
}

impl QueryResponse {
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            sql_query: None,
            dataset,
        }
    }

    /// Accepts `{ "sql query"?, data?, results? }` or a bare array.
    ///
    /// `data` wins over `results` when both are present. An object carrying
    /// neither yields an empty dataset.
    pub fn from_payload(payload: Value) -> Result<Self, DatasetError> {
        match payload {
            Value::Array(items) => Ok(Self::from_dataset(records_from_array(items)?)),
            Value::Object(mut object) => {
                let sql_query = ["sql query", "sql_query", "sqlQuery"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(Value::as_str))
                    .map(str::to_string);
                let dataset = match take_records_field(&mut object, "data")? {
                    Some(dataset) => dataset,
                    None => take_records_field(&mut object, "results")?.unwrap_or_default(),
                };
                Ok(Self { sql_query, dataset })
            }
            other => Err(DatasetError::UnsupportedPayload(json_kind(&other))),
        }
    }
}

fn take_records_field(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<Dataset>, DatasetError> {
    match object.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => records_from_array(items).map(Some),
        Some(other) => Err(DatasetError::NotAnArray {
            field,
            found: json_kind(&other),
        }),
    }
}

fn records_from_array(items: Vec<Value>) -> Result<Dataset, DatasetError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(DatasetError::NotAnObject {
                index,
                found: json_kind(&other),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Dataset::new)
}

pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Null and blank strings count as missing.
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Canonical text of a value, used for uniqueness and grouping.
pub fn value_key(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        _ if is_missing(value) => None,
        Value::String(s) => Some(Cow::Borrowed(s.trim())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Reads a finite number from a JSON number or a numeric string.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

const STRICT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

const STRICT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

/// Parses a text value as a point in time.
///
/// Strict patterns (`YYYY-MM-DD`, `MM/DD/YYYY`, ISO date-times) are tried
/// first, then a permissive fallback set that also accepts bare `YYYY` and
/// `YYYY-MM`. Offsets are normalised to UTC. JSON numbers are never
/// timestamps.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let Value::String(raw) = value else {
        return None;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_strict(trimmed).or_else(|| parse_fallback(trimmed))
}

fn parse_strict(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    for fmt in STRICT_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    parse_date_formats(value, STRICT_DATE_FORMATS)
}

fn parse_fallback(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.naive_utc());
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    if let Some(parsed) = parse_date_formats(value, FALLBACK_DATE_FORMATS) {
        return Some(parsed);
    }
    parse_partial_date(value)
}

fn parse_date_formats(value: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

// `YYYY` and `YYYY-MM` land on the first day of the period.
fn parse_partial_date(value: &str) -> Option<NaiveDateTime> {
    let (year, month) = match value.split_once('-') {
        Some((year, month)) if month.len() == 2 => (year, month.parse::<u32>().ok()?),
        Some(_) => return None,
        None => (value, 1),
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1).map(|date| date.and_time(NaiveTime::MIN))
}

/// Renders a metric without trailing zeros (`3`, `2.5`, `1.33`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let rendered = format!("{value:.2}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
