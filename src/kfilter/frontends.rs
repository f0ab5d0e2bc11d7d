// src/kfilter/frontends.rs
//! Small, shared parsing & formatting helpers for front-ends (CLI, test drivers).
//! These only move records in and out of text; no anonymization happens here.

use std::io::{self, Write};

use thiserror::Error;

use crate::kfilter::config::FlushPolicy;
use crate::kfilter::records::{InputRecord, OutputRecord};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid input format: {0} (expected 'csv' or 'ndjson')")]
    InvalidInputFormat(String),
    #[error("invalid output format: {0} (expected 'csv' or 'ndjson')")]
    InvalidOutputFormat(String),
    #[error("invalid flush policy: {0} (expected 'drop' or 'publish')")]
    InvalidFlushPolicy(String),
    #[error("line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Lowercase/normalize a free-form string by removing `_`, `-` and spaces.
#[inline]
fn norm(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "")
}

/* ----------------------- format helpers ----------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `time,value` rows, or bare `value` rows timed by row index. Optional header.
    Csv,
    /// One `{"time": .., "value": ..}` object per line.
    Ndjson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `input_time,output_time,raw_value,anonymised_value`
    Csv,
    /// One serialized [`OutputRecord`] per line.
    Ndjson,
}

pub fn parse_input_format(raw: &str) -> Result<InputFormat, ParseError> {
    match norm(raw).as_str() {
        "csv" => Ok(InputFormat::Csv),
        "ndjson" | "jsonl" => Ok(InputFormat::Ndjson),
        _ => Err(ParseError::InvalidInputFormat(raw.to_string())),
    }
}

pub fn parse_output_format(raw: &str) -> Result<OutputFormat, ParseError> {
    match norm(raw).as_str() {
        "csv" => Ok(OutputFormat::Csv),
        "ndjson" | "jsonl" => Ok(OutputFormat::Ndjson),
        _ => Err(ParseError::InvalidOutputFormat(raw.to_string())),
    }
}

pub fn parse_flush_policy_str(raw: Option<&str>) -> Result<FlushPolicy, ParseError> {
    match raw.map(norm) {
        None => Ok(FlushPolicy::Drop),
        Some(ref v) if v == "drop" => Ok(FlushPolicy::Drop),
        Some(ref v) if v == "publish" => Ok(FlushPolicy::Publish),
        Some(v) => Err(ParseError::InvalidFlushPolicy(v)),
    }
}

pub fn flush_policy_to_str(p: FlushPolicy) -> &'static str {
    match p {
        FlushPolicy::Drop => "drop",
        FlushPolicy::Publish => "publish",
    }
}

/* ----------------------- record parsing ----------------------- */

/// Parse every record in `text`.
pub fn parse_records(text: &str, format: InputFormat) -> Result<Vec<InputRecord>, ParseError> {
    match format {
        InputFormat::Csv => parse_csv_records(text),
        InputFormat::Ndjson => parse_ndjson_records(text),
    }
}

fn parse_csv_records(text: &str) -> Result<Vec<InputRecord>, ParseError> {
    let mut out = Vec::new();
    let mut first_row = true;
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let parsed = parse_csv_fields(&fields, out.len() as i64);
        match parsed {
            Ok(r) => out.push(r),
            // A leading non-numeric row is a header.
            Err(_) if first_row && fields.iter().any(|f| f.parse::<f64>().is_err()) => {}
            Err(reason) => return Err(ParseError::MalformedRow { line: i + 1, reason }),
        }
        first_row = false;
    }
    Ok(out)
}

fn parse_csv_fields(fields: &[&str], row_index: i64) -> Result<InputRecord, String> {
    match fields {
        [value] => {
            let v = value
                .parse::<f64>()
                .map_err(|e| format!("bad value {value:?}: {e}"))?;
            Ok(InputRecord::new(row_index, v))
        }
        [time, value] => {
            let t = time
                .parse::<i64>()
                .map_err(|e| format!("bad time {time:?}: {e}"))?;
            let v = value
                .parse::<f64>()
                .map_err(|e| format!("bad value {value:?}: {e}"))?;
            Ok(InputRecord::new(t, v))
        }
        other => Err(format!("expected 1 or 2 fields, got {}", other.len())),
    }
}

fn parse_ndjson_records(text: &str) -> Result<Vec<InputRecord>, ParseError> {
    let mut out = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let r: InputRecord =
            serde_json::from_str(line).map_err(|source| ParseError::Json { line: i + 1, source })?;
        out.push(r);
    }
    Ok(out)
}

/* ----------------------- output writing ----------------------- */

pub const CSV_HEADER: &str = "input_time,output_time,raw_value,anonymised_value";

/// Write `records` in `format`, one per line.
pub fn write_records<W: Write>(
    w: &mut W,
    records: &[OutputRecord],
    format: OutputFormat,
) -> io::Result<()> {
    for r in records {
        match format {
            OutputFormat::Csv => writeln!(w, "{r}")?,
            OutputFormat::Ndjson => {
                serde_json::to_writer(&mut *w, r)?;
                writeln!(w)?;
            }
        }
    }
    Ok(())
}
