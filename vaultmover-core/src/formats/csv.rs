//! CSV recognition: dialect sniffing and column-header checks.

use super::{Header, Recognizer, Source};
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Number of characters examined when sniffing the dialect.
const SNIFF_SIZE: usize = 4096;

/// Share of rows that must agree on the modal field count.
const CONSISTENCY: f64 = 0.9;

pub const QUOTE: u8 = b'"';

static JSON_KEY_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^"[^"]*"\s*:"#).unwrap());

static JSON_OBJECT_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)^\{\s*"[^"]*"\s*:.*\}$"#).unwrap());

/// A raw record that is a whole JSON value or a `"key": value` member
/// rather than a row of delimited cells.
fn looks_like_json(raw: &str) -> bool {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end();
    if JSON_KEY_ROW.is_match(trimmed) || JSON_OBJECT_ROW.is_match(trimmed) {
        return true;
    }
    serde_json::from_str::<serde_json::Value>(trimmed)
        .is_ok_and(|value| value.is_object() || value.is_array())
}

/// Build a csv reader with the dialect used across importers.
pub fn reader(text: &str, delimiter: u8) -> ::csv::Reader<&[u8]> {
    ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(QUOTE)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Sniff whether `sample` is CSV in the configured dialect.
///
/// `truncated` tells that the sample was cut from a longer text, in which
/// case the final record may be partial and is ignored.
pub fn sniff(sample: &str, delimiter: u8, truncated: bool) -> bool {
    if sample.trim().is_empty() {
        return false;
    }

    let mut starts = Vec::new();
    let mut counts = Vec::new();
    for record in reader(sample, delimiter).records() {
        match record {
            Ok(record) => {
                starts.push(record.position().map_or(0, |pos| pos.byte() as usize));
                counts.push(record.len());
            }
            Err(_) => return false,
        }
    }
    // Checked per record so that quoted multi-line cells are seen whole.
    let ends = starts.iter().skip(1).copied().chain([sample.len()]);
    if starts
        .iter()
        .zip(ends)
        .any(|(&start, end)| sample.get(start..end).is_some_and(looks_like_json))
    {
        return false;
    }
    if truncated && counts.len() > 1 {
        counts.pop();
    }

    let Some(&header) = counts.first() else {
        return false;
    };
    if header < 2 {
        return false;
    }

    let mut frequency: HashMap<usize, usize> = HashMap::new();
    for count in &counts {
        *frequency.entry(*count).or_default() += 1;
    }
    let modal = frequency.values().copied().max().unwrap_or_default();
    modal as f64 / counts.len() as f64 >= CONSISTENCY
}

/// True when every expected column is among `fieldnames`. With `only` the
/// column counts must also be equal.
pub fn columns_match(fieldnames: &[String], columns: &[&str], only: bool) -> bool {
    if fieldnames.is_empty() {
        return false;
    }
    if only && fieldnames.len() != columns.len() {
        return false;
    }
    columns
        .iter()
        .all(|column| fieldnames.iter().any(|name| name == column))
}

/// Recognizer for delimiter separated exports.
pub struct CsvRecognizer {
    text: String,
    delimiter: u8,
    fieldnames: Vec<String>,
}

impl CsvRecognizer {
    pub fn open(source: &Source, delimiter: u8) -> Result<Self> {
        Ok(Self {
            text: source.read_text()?,
            delimiter,
            fieldnames: Vec::new(),
        })
    }
}

impl Recognizer for CsvRecognizer {
    fn is_format(&mut self) -> bool {
        let (sample, truncated) = match self.text.char_indices().nth(SNIFF_SIZE) {
            Some((end, _)) => (&self.text[..end], true),
            None => (self.text.as_str(), false),
        };
        if !sniff(sample, self.delimiter, truncated) {
            return false;
        }

        let mut records = reader(&self.text, self.delimiter).into_records();
        match records.next() {
            Some(Ok(first)) => {
                self.fieldnames = first.iter().map(str::to_string).collect();
                true
            }
            _ => false,
        }
    }

    fn check_header(&self, header: &Header, only: bool) -> bool {
        let Header::Csv(columns) = header else {
            return false;
        };
        columns_match(&self.fieldnames, columns, only)
    }
}
