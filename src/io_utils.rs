//! Input loading and output writing for every command.
//!
//! All file I/O flows through this module:
//!
//! - **Payloads**: `.json` files (or `-` for stdin) may hold a bare record
//!   array or a `{ data | results }` query response; both collapse into a
//!   [`QueryResponse`].
//! - **CSV/TSV**: rows are promoted to string-valued records keyed by header,
//!   decoded with `encoding_rs` (UTF-8 unless `--input-encoding` says
//!   otherwise). The delimiter is inferred from the extension when not given.
//! - **Output**: pretty JSON to a file or stdout.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::data::{QueryResponse, Record};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Json,
    Delimited,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

fn input_kind(path: &Path, options: &LoadOptions) -> InputKind {
    if options.delimiter.is_some() {
        return InputKind::Delimited;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv") => {
            InputKind::Delimited
        }
        _ => InputKind::Json,
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

/// Loads the raw JSON value of an input, converting CSV rows to an array.
///
/// Used where the caller needs to see the payload shape before it is
/// normalised, such as the suitability validator.
pub fn load_raw(path: &Path, options: &LoadOptions) -> Result<Value> {
    match input_kind(path, options) {
        InputKind::Json => {
            let reader = open_input(path)?;
            serde_json::from_reader(reader).with_context(|| format!("Parsing JSON from {path:?}"))
        }
        InputKind::Delimited => {
            let records = read_delimited(path, options)?;
            Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
        }
    }
}

/// Loads any supported input as a query response.
pub fn load_payload(path: &Path, options: &LoadOptions) -> Result<QueryResponse> {
    let raw = load_raw(path, options)?;
    let response = QueryResponse::from_payload(raw)
        .with_context(|| format!("Reading records from {path:?}"))?;
    debug!(
        "Loaded {} record(s) from {:?}",
        response.dataset.len(),
        path
    );
    Ok(response)
}

fn read_delimited(path: &Path, options: &LoadOptions) -> Result<Vec<Record>> {
    let delimiter = resolve_input_delimiter(path, options.delimiter);
    let encoding = resolve_encoding(options.encoding.as_deref())?;
    let mut reader = open_csv_reader(open_input(path)?, delimiter);
    let headers = reader_headers(&mut reader, encoding)?;
    let mut records = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        let row = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let value = decoded.get(idx).cloned().unwrap_or_default();
                (header.clone(), Value::String(value))
            })
            .collect::<Record>();
        records.push(row);
    }
    Ok(records)
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    Ok(decode_record(&headers, encoding)?
        .into_iter()
        .map(|header| header.trim().to_string())
        .collect())
}

/// Writes `value` as pretty JSON to `path`, or stdout when absent or `-`.
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut writer, value).context("Serializing JSON output")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn delimiter_defaults_follow_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("moves.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("moves.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("moves.csv"), Some(b';')), b';');
    }

    #[test]
    fn csv_rows_become_string_records() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("moves.csv");
        std::fs::write(&path, "lane,gate_in\nA,2024-01-01T08:00:00Z\nB,\n").unwrap();

        let response = load_payload(&path, &LoadOptions::default()).expect("load csv");
        assert_eq!(response.dataset.len(), 2);
        assert_eq!(response.dataset.columns(), vec!["lane", "gate_in"]);
        let second = &response.dataset.records()[1];
        assert_eq!(second.get("gate_in"), Some(&Value::String(String::new())));
    }

    #[test]
    fn csv_honors_input_encoding() {
        let dir = tempdir().expect("temp dir");
        let path: PathBuf = dir.path().join("encoded.csv");
        let (encoded, _, _) = WINDOWS_1252.encode("dock,carrier\n1,Caf\u{e9} Freight\n");
        std::fs::write(&path, &encoded).unwrap();

        let options = LoadOptions {
            delimiter: None,
            encoding: Some("windows-1252".to_string()),
        };
        let response = load_payload(&path, &options).expect("load encoded csv");
        assert_eq!(
            response.dataset.records()[0].get("carrier"),
            Some(&Value::String("Caf\u{e9} Freight".to_string()))
        );
    }

    #[test]
    fn json_payload_with_results_field_loads() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("response.json");
        std::fs::write(&path, r#"{"sql query": "SELECT 1", "results": [{"a": 1}]}"#).unwrap();

        let response = load_payload(&path, &LoadOptions::default()).expect("load json");
        assert_eq!(response.sql_query.as_deref(), Some("SELECT 1"));
        assert_eq!(response.dataset.len(), 1);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(resolve_encoding(Some("klingon")).is_err());
    }
}
