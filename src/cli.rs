use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{advisor::ChartType, io_utils::LoadOptions};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Infer column types, suggest charts, and analyze terminal traffic from flat records",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify every column as quantitative, nominal, ordinal, or temporal
    Classify(ClassifyArgs),
    /// Suggest axis fields and a chart type for a dataset
    Suggest(SuggestArgs),
    /// Build a renderer-agnostic chart specification
    Chart(ChartArgs),
    /// Emit field metadata for a drag-and-drop exploration widget
    Explore(ExploreArgs),
    /// Check whether a dataset is suitable for analysis
    Validate(ValidateArgs),
    /// Compute lane, congestion, turnaround, and KPI metrics
    Analyze(AnalyzeArgs),
    /// Re-pull and re-analyze a data source on a fixed interval
    Watch(WatchArgs),
    /// Generate a mock shipment dataset
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Pie,
}

impl From<ChartKind> for ChartType {
    fn from(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Bar => ChartType::Bar,
            ChartKind::Line => ChartType::Line,
            ChartKind::Scatter => ChartType::Scatter,
            ChartKind::Pie => ChartType::Pie,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input records: JSON payload, CSV/TSV file, or '-' for JSON on stdin
    #[arg(short = 'i', long = "input")]
    pub path: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a CSV input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl InputArgs {
    pub fn options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            encoding: self.input_encoding.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Destination file for JSON output (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Chart type (suggested from the data when omitted)
    #[arg(long = "type", value_enum)]
    pub chart_type: Option<ChartKind>,
    /// Field bound to the x axis (suggested when omitted)
    #[arg(short = 'x', long = "x")]
    pub x_field: Option<String>,
    /// Field bound to the y axis (suggested when omitted)
    #[arg(short = 'y', long = "y")]
    pub y_field: Option<String>,
    /// Natural-language question used as the chart title
    #[arg(long)]
    pub question: Option<String>,
    /// Query text used as the chart title when no question is given
    #[arg(long)]
    pub query: Option<String>,
    /// Destination file for the chart specification (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Destination file for the field metadata (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Analyzer configuration (YAML or JSON) with role keywords and thresholds
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Destination file for JSON output (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// File to re-read on every refresh
    #[arg(short = 'i', long = "input", conflicts_with = "url", required_unless_present = "url")]
    pub input: Option<PathBuf>,
    /// Base URL of a query service exposing POST /query
    #[arg(long)]
    pub url: Option<String>,
    /// Question sent to the query service
    #[arg(long, default_value = "Show all shipments from today")]
    pub question: String,
    /// Seconds between refreshes
    #[arg(long, default_value_t = 30)]
    pub interval: u64,
    /// Stop after this many refresh cycles (runs until interrupted when omitted)
    #[arg(long)]
    pub iterations: Option<usize>,
    /// Request timeout in seconds for the query service
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
    /// Analyzer configuration (YAML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Number of mock records used when the source fails
    #[arg(long = "fallback-rows", default_value_t = 120)]
    pub fallback_rows: usize,
    /// CSV delimiter character for file sources
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a CSV file source (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Number of shipment records to generate
    #[arg(long, default_value_t = 120)]
    pub rows: usize,
    /// Seed for reproducible output
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
    /// Latest gate-in time as RFC 3339 (defaults to now)
    #[arg(long = "base-time", value_parser = parse_base_time)]
    pub base_time: Option<DateTime<Utc>>,
    /// Destination JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

fn parse_base_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| format!("Invalid RFC 3339 timestamp '{value}': {err}"))
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
