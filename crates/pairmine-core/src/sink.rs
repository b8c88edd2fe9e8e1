//! Append pair records to an output file.
//!
//! The CSV header is written only when the sink creates the file. Rows are
//! always appended, so mining the same commits twice into one file
//! duplicates their rows.

use crate::record::{CSV_HEADER, OutputFormat, PairRecord, csv_row};
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// An open, append-only record file.
pub struct RecordSink {
    path: PathBuf,
    format: OutputFormat,
    writer: BufWriter<File>,
    written: usize,
}

impl RecordSink {
    /// Open `path` for appending, creating it (and its parent directories)
    /// if needed. A newly created CSV file gets the header row.
    pub fn open(path: &Path, format: OutputFormat) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let created = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        if created && format == OutputFormat::Csv {
            writer
                .write_all(csv_row(&CSV_HEADER).as_bytes())
                .with_context(|| format!("failed to write header to {}", path.display()))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            format,
            writer,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Records appended through this handle.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn append(&mut self, record: &PairRecord) -> Result<()> {
        let line = match self.format {
            OutputFormat::Csv => record.to_csv_row(),
            OutputFormat::Jsonl => record.to_json_line()?,
        };
        self.writer
            .write_all(line.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    pub fn append_all<'a>(&mut self, records: impl IntoIterator<Item = &'a PairRecord>) -> Result<()> {
        for record in records {
            self.append(record)?;
        }
        Ok(())
    }

    /// Flush buffered rows to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> PairRecord {
        PairRecord {
            repository: "o/r".into(),
            before_url: "u0".into(),
            after_url: "u1".into(),
            before_path: "A.java".into(),
            after_path: "A.java".into(),
            before_line_col: "2:3".into(),
            after_line_col: "2:3".into(),
            method_name: name.into(),
            before_commit: "p".into(),
            after_commit: "c".into(),
            label: String::new(),
            before_body: Some("void a() {}".into()),
            after_body: Some("void a() { x(); }".into()),
        }
    }

    #[test]
    fn test_header_written_once_across_openings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("pairs.csv");

        let mut sink = RecordSink::open(&path, OutputFormat::Csv).unwrap();
        sink.append(&record("a")).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut sink = RecordSink::open(&path, OutputFormat::Csv).unwrap();
        sink.append(&record("a")).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.written(), 1);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Repository,"));
        assert_eq!(
            content.matches("Repository,").count(),
            1,
            "header must not be repeated"
        );
        assert_eq!(lines[1], lines[2], "rows are appended, not deduplicated");
    }

    #[test]
    fn test_existing_empty_file_gets_no_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pairs.csv");
        fs::write(&path, "").unwrap();

        let mut sink = RecordSink::open(&path, OutputFormat::Csv).unwrap();
        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_jsonl_has_no_header_and_keeps_bodies() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pairs.jsonl");

        let mut sink = RecordSink::open(&path, OutputFormat::Jsonl).unwrap();
        sink.append_all([&record("a"), &record("b")]).unwrap();
        sink.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<PairRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].method_name, "b");
        assert_eq!(rows[0].after_body.as_deref(), Some("void a() { x(); }"));
    }
}
