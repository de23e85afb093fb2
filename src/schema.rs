//! Field type inference over a leading sample of records.
//!
//! Each column of the first record is classified as one of four semantic
//! [`FieldType`]s by looking at up to [`SAMPLE_ROWS`] records:
//!
//! 1. every non-missing value parses as a timestamp → temporal
//! 2. every non-missing value parses as a finite number → quantitative
//! 3. few distinct values relative to the sample → ordinal
//! 4. anything else → nominal
//!
//! Classification never looks at column names, and statistics are computed
//! over the sample only, not the full dataset.

use std::{collections::BTreeMap, fmt};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{ClassifyArgs, OutputFormat},
    data::{Dataset, Record, format_number, parse_number, parse_timestamp, value_key},
    io_utils, table,
};

pub const SAMPLE_ROWS: usize = 10;
const ORDINAL_MAX_UNIQUE: usize = 20;
const ORDINAL_MAX_UNIQUE_RATIO: f64 = 0.5;
const SAMPLE_VALUES_LIMIT: usize = 10;

pub fn execute(args: &ClassifyArgs) -> Result<()> {
    let response = io_utils::load_payload(&args.input.path, &args.input.options())
        .with_context(|| format!("Loading records from {:?}", args.input.path))?;
    let classification = classify(&response.dataset);
    match args.format {
        OutputFormat::Json => io_utils::write_json(args.output.as_deref(), &classification)?,
        OutputFormat::Table => table::print_table(
            &classification_headers(),
            &classification_rows(&classification),
        ),
    }
    info!(
        "Classified {} column(s) from {} record(s)",
        classification.columns.len(),
        response.dataset.len()
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Quantitative,
    Nominal,
    Ordinal,
    Temporal,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Quantitative => "quantitative",
            FieldType::Nominal => "nominal",
            FieldType::Ordinal => "ordinal",
            FieldType::Temporal => "temporal",
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, FieldType::Nominal | FieldType::Ordinal)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStats {
    pub unique_count: usize,
    pub sample_size: usize,
    pub unique_ratio: f64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_values: Vec<String>,
}

/// Column names bucketed by type, each list in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedFields {
    pub quantitative: Vec<String>,
    pub nominal: Vec<String>,
    pub temporal: Vec<String>,
    pub ordinal: Vec<String>,
}

impl GroupedFields {
    fn push(&mut self, field_type: FieldType, name: &str) {
        let bucket = match field_type {
            FieldType::Quantitative => &mut self.quantitative,
            FieldType::Nominal => &mut self.nominal,
            FieldType::Ordinal => &mut self.ordinal,
            FieldType::Temporal => &mut self.temporal,
        };
        bucket.push(name.to_string());
    }

    /// Nominal fields first, then ordinal ones.
    pub fn categorical(&self) -> impl Iterator<Item = &String> {
        self.nominal.iter().chain(self.ordinal.iter())
    }

    pub fn categorical_count(&self) -> usize {
        self.nominal.len() + self.ordinal.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub columns: Vec<String>,
    pub types: BTreeMap<String, FieldType>,
    pub stats: BTreeMap<String, FieldStats>,
    pub grouped: GroupedFields,
}

impl Classification {
    /// An empty classification means no recommendation is possible.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn field_type(&self, column: &str) -> Option<FieldType> {
        self.types.get(column).copied()
    }

    pub fn stats(&self, column: &str) -> Option<&FieldStats> {
        self.stats.get(column)
    }
}

pub fn classify(dataset: &Dataset) -> Classification {
    let columns = dataset.columns();
    let sample = dataset.sample(SAMPLE_ROWS);
    let mut classification = Classification {
        columns: columns.clone(),
        ..Classification::default()
    };
    for column in &columns {
        let candidate = TypeCandidate::observe(column, sample);
        let field_type = candidate.decide();
        debug!(
            "Column '{column}' classified as {field_type} from {} sampled value(s)",
            candidate.non_missing
        );
        classification.grouped.push(field_type, column);
        classification
            .stats
            .insert(column.clone(), candidate.finalize(field_type));
        classification.types.insert(column.clone(), field_type);
    }
    classification
}

#[derive(Debug, Default)]
struct TypeCandidate {
    non_missing: usize,
    temporal_matches: usize,
    numeric_values: Vec<f64>,
    distinct: Vec<String>,
}

impl TypeCandidate {
    fn observe(column: &str, sample: &[Record]) -> Self {
        let mut candidate = Self::default();
        for record in sample {
            if let Some(value) = record.get(column) {
                candidate.update(value);
            }
        }
        candidate
    }

    fn update(&mut self, value: &serde_json::Value) {
        let Some(key) = value_key(value) else {
            return;
        };
        self.non_missing += 1;
        if parse_timestamp(value).is_some() {
            self.temporal_matches += 1;
        }
        if let Some(number) = parse_number(value) {
            self.numeric_values.push(number);
        }
        if !self.distinct.iter().any(|existing| existing == key.as_ref()) {
            self.distinct.push(key.into_owned());
        }
    }

    fn unique_ratio(&self) -> f64 {
        if self.non_missing == 0 {
            0.0
        } else {
            self.distinct.len() as f64 / self.non_missing as f64
        }
    }

    fn decide(&self) -> FieldType {
        if self.non_missing == 0 {
            return FieldType::Nominal;
        }
        if self.temporal_matches == self.non_missing {
            FieldType::Temporal
        } else if self.numeric_values.len() == self.non_missing {
            FieldType::Quantitative
        } else if self.distinct.len() <= ORDINAL_MAX_UNIQUE
            && self.unique_ratio() < ORDINAL_MAX_UNIQUE_RATIO
        {
            FieldType::Ordinal
        } else {
            FieldType::Nominal
        }
    }

    fn numeric_summary(&self) -> Option<NumericSummary> {
        let (first, rest) = self.numeric_values.split_first()?;
        let (min, max, sum) = rest
            .iter()
            .fold((*first, *first, *first), |(min, max, sum), value| {
                (min.min(*value), max.max(*value), sum + value)
            });
        Some(NumericSummary {
            min,
            max,
            avg: sum / self.numeric_values.len() as f64,
        })
    }

    fn finalize(self, field_type: FieldType) -> FieldStats {
        let unique_ratio = self.unique_ratio();
        let unique_count = self.distinct.len();
        let numeric = match field_type {
            FieldType::Quantitative => self.numeric_summary(),
            _ => None,
        };
        let sample_values = if field_type.is_categorical() {
            self.distinct.into_iter().take(SAMPLE_VALUES_LIMIT).collect()
        } else {
            Vec::new()
        };
        FieldStats {
            unique_count,
            sample_size: self.non_missing,
            unique_ratio,
            numeric,
            sample_values,
        }
    }
}

fn classification_headers() -> Vec<String> {
    ["column", "type", "sample", "unique", "ratio", "summary"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn classification_rows(classification: &Classification) -> Vec<Vec<String>> {
    classification
        .columns
        .iter()
        .filter_map(|column| {
            let field_type = classification.field_type(column)?;
            let stats = classification.stats(column)?;
            let summary = match (&stats.numeric, field_type) {
                (Some(numeric), _) => format!(
                    "min {} / max {} / avg {}",
                    format_number(numeric.min),
                    format_number(numeric.max),
                    format_number(numeric.avg)
                ),
                (None, FieldType::Temporal) => "(date/time)".to_string(),
                (None, _) => stats.sample_values.join(", "),
            };
            Some(vec![
                column.clone(),
                field_type.to_string(),
                stats.sample_size.to_string(),
                stats.unique_count.to_string(),
                format!("{:.2}", stats.unique_ratio),
                summary,
            ])
        })
        .collect()
}
