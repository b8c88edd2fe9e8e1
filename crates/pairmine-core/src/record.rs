//! The output record for one matched method pair.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Column titles of the CSV output, in field order.
pub const CSV_HEADER: [&str; 10] = [
    "Repository",
    "Before state URL",
    "After state URL",
    "Before state file path",
    "After state file path",
    "Before state line:col",
    "After state line:col",
    "Method name",
    "Before state commit hash",
    "After state commit hash",
];

/// Output encoding of the record sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values with a one-time header row.
    #[default]
    Csv,
    /// One JSON object per line, including both method bodies.
    Jsonl,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" | "json" | "ndjson" => Ok(Self::Jsonl),
            other => anyhow::bail!("unknown output format: {other}. Use 'csv' or 'jsonl'."),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Jsonl => f.write_str("jsonl"),
        }
    }
}

/// One matched pre/post method pair with its commit and file coordinates.
///
/// Positions are human-facing `line:col`, both 1-based. The method name is
/// the pre-change declaration's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord {
    pub repository: String,
    pub before_url: String,
    pub after_url: String,
    pub before_path: String,
    pub after_path: String,
    pub before_line_col: String,
    pub after_line_col: String,
    pub method_name: String,
    pub before_commit: String,
    pub after_commit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_body: Option<String>,
}

impl PairRecord {
    /// The ten CSV fields, in [`CSV_HEADER`] order.
    pub fn csv_fields(&self) -> [&str; 10] {
        [
            self.repository.as_str(),
            self.before_url.as_str(),
            self.after_url.as_str(),
            self.before_path.as_str(),
            self.after_path.as_str(),
            self.before_line_col.as_str(),
            self.after_line_col.as_str(),
            self.method_name.as_str(),
            self.before_commit.as_str(),
            self.after_commit.as_str(),
        ]
    }

    /// CSV row including the trailing newline.
    pub fn to_csv_row(&self) -> String {
        csv_row(&self.csv_fields())
    }

    /// JSON object on a single line, including the trailing newline.
    pub fn to_json_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self).context("failed to serialize pair record")?;
        line.push('\n');
        Ok(line)
    }
}

/// Join fields into one CSV line terminated by `\n`.
pub fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_escape(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

/// Quote a field when it contains a separator, a quote or a line break.
pub fn csv_escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
