//! Changed line ranges from unified-diff hunk headers.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// An inclusive `(start, end)` block of rows in the post-change file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains_row(&self, row: usize) -> bool {
        self.start <= row && row <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid line range `{0}`, expected `START-END` or `ROW`")]
pub struct InvalidLineRange(String);

impl FromStr for LineRange {
    type Err = InvalidLineRange;

    /// Accepts `START-END` or a single `ROW`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidLineRange(s.to_string());
        let s = s.trim();
        let (start, end) = match s.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (s, s),
        };
        let start: usize = start.parse().map_err(|_| invalid())?;
        let end: usize = end.parse().map_err(|_| invalid())?;
        if start > end {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }
}

/// The four numbers of a `@@ -a,b +c,d @@` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
}

impl HunkHeader {
    /// `(new_start, new_start + new_count)`.
    ///
    /// The end is one past the hunk's last line; existing datasets were mined
    /// with this bound, so it is kept.
    pub fn post_change_range(&self) -> LineRange {
        LineRange::new(
            self.new_start,
            self.new_start.saturating_add(self.new_count),
        )
    }
}

fn hunk_header_re() -> &'static Regex {
    static HUNK_RE: OnceLock<Regex> = OnceLock::new();
    HUNK_RE.get_or_init(|| {
        Regex::new(r"@@ -(\d+),(\d+) \+(\d+),(\d+) @@").expect("valid hunk header regex")
    })
}

/// Every well-formed hunk header in `patch`, in order of appearance.
///
/// Headers that omit a count (`@@ -3 +3 @@`) or carry numbers too large for
/// `usize` are skipped.
pub fn parse_hunk_headers(patch: &str) -> Vec<HunkHeader> {
    hunk_header_re()
        .captures_iter(patch)
        .filter_map(|caps| {
            let num = |i: usize| caps.get(i)?.as_str().parse::<usize>().ok();
            Some(HunkHeader {
                old_start: num(1)?,
                old_count: num(2)?,
                new_start: num(3)?,
                new_count: num(4)?,
            })
        })
        .collect()
}

/// One post-change range per hunk header. Empty for text with no headers.
pub fn extract_post_change_ranges(patch: &str) -> Vec<LineRange> {
    parse_hunk_headers(patch)
        .iter()
        .map(HunkHeader::post_change_range)
        .collect()
}
