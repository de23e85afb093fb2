//! Renderer-agnostic chart specifications.
//!
//! A [`ChartSpec`] names a mark, binds columns to visual channels, and carries
//! the data payload. It serializes to a grammar-of-graphics shaped JSON object
//! that any Vega-Lite style renderer can consume.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;

use crate::{
    advisor::{ChartType, suggest_chart_type, suggest_fields},
    cli::ChartArgs,
    data::{Dataset, Record},
    io_utils,
    schema::{Classification, FieldType, classify},
};

const LEGEND_CATEGORY_LIMIT: usize = 10;
const TITLE_QUERY_LIMIT: usize = 50;
const LINE_STROKE_WIDTH: f64 = 2.0;
const NO_DATA_TEXT: &str = "No data available";

pub fn execute(args: &ChartArgs) -> Result<()> {
    let response = io_utils::load_payload(&args.input.path, &args.input.options())
        .with_context(|| format!("Loading records from {:?}", args.input.path))?;
    let chart_type = match args.chart_type {
        Some(kind) => kind.into(),
        None => suggest_chart_type(&classify(&response.dataset)).chart_type,
    };
    let request = ChartRequest {
        chart_type,
        x_field: args.x_field.clone(),
        y_field: args.y_field.clone(),
        question: args.question.clone(),
        query: args.query.clone().or_else(|| response.sql_query.clone()),
    };
    let spec = build_spec(&response.dataset, &request);
    io_utils::write_json(args.output.as_deref(), &spec)?;
    info!("Built {:?} chart '{}'", spec.mark, spec.title);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bar,
    Line,
    Point,
    Arc,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEncoding {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
    pub title: String,
    /// `Some(false)` hides the legend for this channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<bool>,
}

impl ChannelEncoding {
    fn new(field: &str, field_type: FieldType) -> Self {
        Self {
            field: field.to_string(),
            field_type,
            aggregate: None,
            title: humanize(field),
            legend: None,
        }
    }

    fn aggregated(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Encoding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<ChannelEncoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<ChannelEncoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ChannelEncoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta: Option<ChannelEncoding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub point: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub tooltip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub mark: Mark,
    pub style: MarkStyle,
    pub encoding: Encoding,
    pub data: Vec<Record>,
}

impl ChartSpec {
    /// Text-only spec shown instead of a chart.
    pub fn placeholder(message: &str) -> Self {
        Self {
            title: NO_DATA_TEXT.to_string(),
            mark: Mark::Text,
            style: MarkStyle {
                text: Some(message.to_string()),
                ..MarkStyle::default()
            },
            encoding: Encoding::default(),
            data: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.mark == Mark::Text
    }
}

/// What the caller wants drawn. Missing fields are filled from the advisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub chart_type: ChartType,
    pub x_field: Option<String>,
    pub y_field: Option<String>,
    pub question: Option<String>,
    pub query: Option<String>,
}

impl ChartRequest {
    pub fn new(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            x_field: None,
            y_field: None,
            question: None,
            query: None,
        }
    }

    pub fn with_fields(mut self, x_field: &str, y_field: &str) -> Self {
        self.x_field = Some(x_field.to_string());
        self.y_field = Some(y_field.to_string());
        self
    }

    pub fn with_question(mut self, question: &str) -> Self {
        self.question = Some(question.to_string());
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }
}

pub fn build_spec(dataset: &Dataset, request: &ChartRequest) -> ChartSpec {
    if dataset.is_empty() {
        return ChartSpec::placeholder(NO_DATA_TEXT);
    }
    let classification = classify(dataset);
    if classification.is_empty() {
        return ChartSpec::placeholder("No columns to chart");
    }
    let suggested = suggest_fields(&classification);
    let Some(x_field) = request.x_field.clone().or(suggested.x_field) else {
        return ChartSpec::placeholder(NO_DATA_TEXT);
    };
    let y_field = request
        .y_field
        .clone()
        .or(suggested.y_field)
        .unwrap_or_else(|| x_field.clone());
    for field in [&x_field, &y_field] {
        if classification.field_type(field).is_none() {
            debug!("Chart field '{field}' is not a column of the dataset");
            return ChartSpec::placeholder(&format!("Field '{field}' not found"));
        }
    }

    let x_type = field_type_of(&classification, &x_field);
    let y_type = field_type_of(&classification, &y_field);
    let x = ChannelEncoding::new(&x_field, x_type);

    let (mark, style, encoding) = match request.chart_type {
        ChartType::Bar => {
            let aggregate = if y_type == FieldType::Quantitative {
                Aggregate::Sum
            } else {
                Aggregate::Count
            };
            let mut color = x.clone();
            if dataset.distinct_count(&x_field) > LEGEND_CATEGORY_LIMIT {
                color.legend = Some(false);
            }
            let encoding = Encoding {
                x: Some(x),
                y: Some(ChannelEncoding::new(&y_field, y_type).aggregated(aggregate)),
                color: Some(color),
                theta: None,
            };
            (Mark::Bar, tooltip_style(), encoding)
        }
        ChartType::Line => {
            let style = MarkStyle {
                stroke_width: Some(LINE_STROKE_WIDTH),
                point: true,
                ..tooltip_style()
            };
            let encoding = Encoding {
                x: Some(x),
                y: Some(ChannelEncoding::new(&y_field, y_type)),
                ..Encoding::default()
            };
            (Mark::Line, style, encoding)
        }
        ChartType::Scatter => {
            let color = classification
                .columns
                .iter()
                .filter(|column| **column != x_field && **column != y_field)
                .find(|column| field_type_of(&classification, column).is_categorical())
                .map(|column| ChannelEncoding::new(column, field_type_of(&classification, column)));
            let encoding = Encoding {
                x: Some(x),
                y: Some(ChannelEncoding::new(&y_field, y_type)),
                color,
                theta: None,
            };
            (Mark::Point, tooltip_style(), encoding)
        }
        ChartType::Pie => {
            let encoding = Encoding {
                theta: Some(ChannelEncoding::new(&x_field, x_type).aggregated(Aggregate::Count)),
                color: Some(x),
                ..Encoding::default()
            };
            (Mark::Arc, tooltip_style(), encoding)
        }
    };

    let y_title = match request.chart_type {
        ChartType::Pie => None,
        _ => Some(y_field.as_str()),
    };
    ChartSpec {
        title: chart_title(
            request.question.as_deref(),
            request.query.as_deref(),
            &x_field,
            y_title,
        ),
        mark,
        style,
        encoding,
        data: dataset.records().to_vec(),
    }
}

fn tooltip_style() -> MarkStyle {
    MarkStyle {
        tooltip: true,
        ..MarkStyle::default()
    }
}

fn field_type_of(classification: &Classification, field: &str) -> FieldType {
    classification.field_type(field).unwrap_or(FieldType::Nominal)
}

/// Question first, then the query (first 50 characters), then "Y by X".
pub fn chart_title(
    question: Option<&str>,
    query: Option<&str>,
    x_field: &str,
    y_field: Option<&str>,
) -> String {
    if let Some(question) = question.map(str::trim).filter(|q| !q.is_empty()) {
        return question.to_string();
    }
    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        if query.chars().count() > TITLE_QUERY_LIMIT {
            let truncated: String = query.chars().take(TITLE_QUERY_LIMIT).collect();
            return format!("{truncated}...");
        }
        return query.to_string();
    }
    match y_field {
        Some(y) if y != x_field => format!("{} by {}", humanize(y), humanize(x_field)),
        _ => humanize(x_field),
    }
}

/// `gate_in_time` → `Gate In Time`.
pub fn humanize(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
