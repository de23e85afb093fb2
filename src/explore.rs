//! Field metadata for drag-and-drop exploration widgets, plus a dataset
//! suitability check.

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::{
    chart::humanize,
    cli::{ExploreArgs, OutputFormat, ValidateArgs},
    data::{Dataset, Record, format_number},
    io_utils,
    schema::{FieldType, classify},
    table,
};

const LARGE_DATASET_RECORDS: usize = 10_000;
const DESCRIPTION_CATEGORY_LIMIT: usize = 3;

pub fn execute(args: &ExploreArgs) -> Result<()> {
    let response = io_utils::load_payload(&args.input.path, &args.input.options())
        .with_context(|| format!("Loading records from {:?}", args.input.path))?;
    let source = to_field_metadata(&response.dataset);
    io_utils::write_json(args.output.as_deref(), &source)?;
    info!("Mapped {} field(s) for exploration", source.fields.len());
    Ok(())
}

pub fn execute_validate(args: &ValidateArgs) -> Result<()> {
    let raw = io_utils::load_raw(&args.input.path, &args.input.options())
        .with_context(|| format!("Loading records from {:?}", args.input.path))?;
    let report = validate(&unwrap_records(raw));
    match args.format {
        OutputFormat::Json => io_utils::write_json(None, &report)?,
        OutputFormat::Table => {
            let headers = vec!["check".to_string(), "result".to_string()];
            let mut rows = vec![vec![
                "valid".to_string(),
                if report.is_valid { "yes" } else { "no" }.to_string(),
            ]];
            if let Some(reason) = &report.reason {
                rows.push(vec!["reason".to_string(), reason.clone()]);
            }
            rows.extend(
                report
                    .suggestions
                    .iter()
                    .map(|s| vec!["suggestion".to_string(), s.clone()]),
            );
            table::print_table(&headers, &rows);
        }
    }
    info!(
        "Validation finished: {}",
        if report.is_valid { "valid" } else { "invalid" }
    );
    Ok(())
}

// Query responses wrap records in `data` or `results`; validate what is inside.
fn unwrap_records(raw: Value) -> Value {
    match raw {
        Value::Object(mut object) => {
            for field in ["data", "results"] {
                if let Some(inner) = object.remove(field) {
                    return inner;
                }
            }
            Value::Object(object)
        }
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticType {
    Measure,
    Dimension,
}

impl From<FieldType> for AnalyticType {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Quantitative => AnalyticType::Measure,
            _ => AnalyticType::Dimension,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub id: String,
    pub name: String,
    pub semantic_type: FieldType,
    pub analytic_type: AnalyticType,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationSource {
    pub data_source: Vec<Record>,
    pub fields: Vec<FieldMetadata>,
}

pub fn to_field_metadata(dataset: &Dataset) -> ExplorationSource {
    let classification = classify(dataset);
    let fields = classification
        .columns
        .iter()
        .filter_map(|column| {
            let semantic_type = classification.field_type(column)?;
            let stats = classification.stats(column)?;
            let description = match semantic_type {
                FieldType::Quantitative => match &stats.numeric {
                    Some(numeric) => format!(
                        "Range: {} - {}",
                        format_number(numeric.min),
                        format_number(numeric.max)
                    ),
                    None => "Numeric values".to_string(),
                },
                FieldType::Temporal => "(Date/Time)".to_string(),
                FieldType::Nominal | FieldType::Ordinal => {
                    let shown = stats
                        .sample_values
                        .iter()
                        .take(DESCRIPTION_CATEGORY_LIMIT)
                        .join(", ");
                    if stats.unique_count > DESCRIPTION_CATEGORY_LIMIT {
                        format!("Categories: {shown}, …")
                    } else {
                        format!("Categories: {shown}")
                    }
                }
            };
            Some(FieldMetadata {
                id: column.clone(),
                name: humanize(column),
                semantic_type,
                analytic_type: semantic_type.into(),
                description,
            })
        })
        .collect();
    ExplorationSource {
        data_source: dataset.records().to_vec(),
        fields,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub suggestions: Vec<String>,
}

impl DataValidation {
    fn invalid(reason: &str, suggestion: &str) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.to_string()),
            suggestions: vec![suggestion.to_string()],
        }
    }
}

/// Checks whether `input` can be explored. Never fails and never mutates.
pub fn validate(input: &Value) -> DataValidation {
    let Value::Array(items) = input else {
        return DataValidation::invalid(
            "Data must be an array of records",
            "Return query results as a list of row objects",
        );
    };
    if items.is_empty() {
        return DataValidation::invalid(
            "Dataset is empty",
            "Broaden the query or check the data source",
        );
    }
    let column_count = items
        .first()
        .and_then(Value::as_object)
        .map_or(0, |record| record.len());
    if column_count == 0 {
        return DataValidation::invalid(
            "No columns detected",
            "Ensure each record is an object with named fields",
        );
    }

    let mut suggestions = Vec::new();
    if items.len() > LARGE_DATASET_RECORDS {
        suggestions.push(format!(
            "Large dataset ({} records) may be slow to explore; consider sampling or filtering",
            items.len()
        ));
    }
    if column_count == 1 {
        suggestions.push(
            "Only one column available; add more fields for richer analysis".to_string(),
        );
    }
    DataValidation {
        is_valid: true,
        reason: None,
        suggestions,
    }
}
