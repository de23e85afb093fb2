//! Axis-field and chart-type suggestions derived from a [`Classification`].
//!
//! Both suggestions walk the same priority ladder so a caller asking for
//! fields and a caller asking for a chart type always agree:
//!
//! | rung | grouped fields present            | fields                | chart     |
//! |------|-----------------------------------|-----------------------|-----------|
//! | 1    | temporal + quantitative           | first of each         | `line`    |
//! | 2    | nominal/ordinal + quantitative    | nominal preferred     | `bar`     |
//! | 3    | two or more quantitative          | first two             | `scatter` |
//! | 4    | exactly one categorical, no measure | first two columns   | `pie`     |
//! | 5    | anything else                     | first two columns     | `bar`     |

use std::fmt;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    cli::{OutputFormat, SuggestArgs},
    io_utils,
    schema::{Classification, classify},
    table,
};

pub fn execute(args: &SuggestArgs) -> Result<()> {
    let response = io_utils::load_payload(&args.input.path, &args.input.options())
        .with_context(|| format!("Loading records from {:?}", args.input.path))?;
    let classification = classify(&response.dataset);
    let fields = suggest_fields(&classification);
    let chart = suggest_chart_type(&classification);
    match args.format {
        OutputFormat::Json => {
            let combined = serde_json::json!({ "fields": fields, "chart": chart });
            io_utils::write_json(None, &combined)?;
        }
        OutputFormat::Table => {
            let headers = vec!["suggestion".to_string(), "value".to_string(), "reasoning".to_string()];
            let rows = vec![
                vec![
                    "x".to_string(),
                    fields.x_field.clone().unwrap_or_default(),
                    fields.reasoning.clone(),
                ],
                vec![
                    "y".to_string(),
                    fields.y_field.clone().unwrap_or_default(),
                    String::new(),
                ],
                vec![
                    "chart".to_string(),
                    chart.chart_type.to_string(),
                    chart.reasoning.clone(),
                ],
            ];
            table::print_table(&headers, &rows);
        }
    }
    info!(
        "Suggested {} chart over {} column(s)",
        chart.chart_type,
        classification.columns.len()
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Scatter,
    Pie,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSuggestion {
    pub x_field: Option<String>,
    pub y_field: Option<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSuggestion {
    pub chart_type: ChartType,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pairing {
    TimeSeries,
    Categorical,
    Correlation,
    SingleCategory,
    Fallback,
}

fn pairing(classification: &Classification) -> Pairing {
    let grouped = &classification.grouped;
    let has_measure = !grouped.quantitative.is_empty();
    if !grouped.temporal.is_empty() && has_measure {
        Pairing::TimeSeries
    } else if grouped.categorical_count() > 0 && has_measure {
        Pairing::Categorical
    } else if grouped.quantitative.len() >= 2 {
        Pairing::Correlation
    } else if grouped.categorical_count() == 1 && !has_measure {
        Pairing::SingleCategory
    } else {
        Pairing::Fallback
    }
}

pub fn suggest_fields(classification: &Classification) -> FieldSuggestion {
    let grouped = &classification.grouped;
    match pairing(classification) {
        Pairing::TimeSeries => FieldSuggestion {
            x_field: grouped.temporal.first().cloned(),
            y_field: grouped.quantitative.first().cloned(),
            reasoning: "Time series: temporal field on x, measure on y".to_string(),
        },
        Pairing::Categorical => FieldSuggestion {
            x_field: grouped.categorical().next().cloned(),
            y_field: grouped.quantitative.first().cloned(),
            reasoning: "Categorical comparison: category on x, measure on y".to_string(),
        },
        Pairing::Correlation => FieldSuggestion {
            x_field: grouped.quantitative.first().cloned(),
            y_field: grouped.quantitative.get(1).cloned(),
            reasoning: "Correlation: first two quantitative fields".to_string(),
        },
        Pairing::SingleCategory | Pairing::Fallback => {
            let columns = &classification.columns;
            match columns.first() {
                None => FieldSuggestion {
                    x_field: None,
                    y_field: None,
                    reasoning: "No columns available; nothing to suggest".to_string(),
                },
                Some(first) => FieldSuggestion {
                    x_field: Some(first.clone()),
                    y_field: Some(columns.get(1).unwrap_or(first).clone()),
                    reasoning: "Fallback: first declared columns".to_string(),
                },
            }
        }
    }
}

pub fn suggest_chart_type(classification: &Classification) -> ChartSuggestion {
    let (chart_type, reasoning) = match pairing(classification) {
        Pairing::TimeSeries => (ChartType::Line, "Line chart shows the measure over time"),
        Pairing::Categorical => (ChartType::Bar, "Bar chart compares the measure across categories"),
        Pairing::Correlation => (ChartType::Scatter, "Scatter plot shows how two measures relate"),
        Pairing::SingleCategory => (ChartType::Pie, "Pie chart shows the share of each category"),
        Pairing::Fallback if classification.is_empty() => {
            (ChartType::Bar, "No data; defaulting to a bar chart")
        }
        Pairing::Fallback => (ChartType::Bar, "Defaulting to a bar chart"),
    };
    ChartSuggestion {
        chart_type,
        reasoning: reasoning.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use serde_json::json;

    fn classification_of(value: serde_json::Value) -> Classification {
        classify(&Dataset::from_json(value).expect("dataset"))
    }

    #[test]
    fn temporal_and_quantitative_suggest_line() {
        let classification = classification_of(json!([
            {"day": "2024-01-01", "moves": 4},
            {"day": "2024-01-02", "moves": 9}
        ]));
        let fields = suggest_fields(&classification);
        assert_eq!(fields.x_field.as_deref(), Some("day"));
        assert_eq!(fields.y_field.as_deref(), Some("moves"));
        assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Line);
    }

    #[test]
    fn nominal_preferred_over_ordinal_for_bar() {
        let rows: Vec<_> = (0..10)
            .map(|i| {
                json!({
                    "shift": (["am", "pm"][i % 2]),
                    "carrier": format!("carrier-{i}"),
                    "weight": i * 10
                })
            })
            .collect();
        let classification = classification_of(serde_json::Value::Array(rows));
        assert_eq!(classification.grouped.ordinal, vec!["shift"]);
        let fields = suggest_fields(&classification);
        assert_eq!(fields.x_field.as_deref(), Some("carrier"));
        assert_eq!(fields.y_field.as_deref(), Some("weight"));
        assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Bar);
    }

    #[test]
    fn two_measures_suggest_scatter() {
        let classification = classification_of(json!([
            {"weight": 1, "dwell": 3, "teu": 2},
            {"weight": 2, "dwell": 5, "teu": 1}
        ]));
        let fields = suggest_fields(&classification);
        assert_eq!(fields.x_field.as_deref(), Some("weight"));
        assert_eq!(fields.y_field.as_deref(), Some("dwell"));
        assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Scatter);
    }

    #[test]
    fn single_category_suggests_pie() {
        let classification = classification_of(json!([{"carrier": "A"}, {"carrier": "B"}]));
        assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Pie);
        let fields = suggest_fields(&classification);
        assert_eq!(fields.x_field.as_deref(), Some("carrier"));
        assert_eq!(fields.y_field.as_deref(), Some("carrier"));
    }

    #[test]
    fn fallback_uses_declared_columns() {
        let classification = classification_of(json!([
            {"origin": "A", "destination": "B"},
            {"origin": "C", "destination": "D"}
        ]));
        let fields = suggest_fields(&classification);
        assert_eq!(fields.x_field.as_deref(), Some("origin"));
        assert_eq!(fields.y_field.as_deref(), Some("destination"));
        assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Bar);
    }

    #[test]
    fn empty_classification_has_no_fields() {
        let classification = Classification::default();
        let fields = suggest_fields(&classification);
        assert_eq!(fields.x_field, None);
        assert_eq!(fields.y_field, None);
        assert_eq!(suggest_chart_type(&classification).chart_type, ChartType::Bar);
    }
}
