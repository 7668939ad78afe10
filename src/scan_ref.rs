use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// The upstream search tool numbers MS2 scans in steps of three, so a relative
/// index must be divided by this before it addresses an MS2 spectrum.
pub const MS2_INDEX_DIVISOR: usize = 3;

static SCAN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^scan=(\d+)").expect("scan pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanReferenceError {
    #[error("Could not extract scan number from '{field}'")]
    Unparseable { field: String },
    #[error(
        "Invalid MS2 index {relative} (adjusted to {adjusted}), valid range is 0-{}",
        last_index(.len)
    )]
    OutOfRange {
        relative: usize,
        adjusted: usize,
        len: usize,
    },
}

/// Read a relative MS2 index from a scan-reference field.
///
/// Accepts either a bare run of ASCII digits or a field beginning with `scan=<digits>`.
pub fn parse_relative_index(field: &str) -> Result<usize, ScanReferenceError> {
    let unparseable = || ScanReferenceError::Unparseable {
        field: field.to_string(),
    };
    if !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit()) {
        return field.parse().map_err(|_| unparseable());
    }
    SCAN_PATTERN
        .captures(field)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .ok_or_else(unparseable)
}

fn last_index(len: &usize) -> isize {
    *len as isize - 1
}

pub const fn adjust_ms2_index(relative: usize) -> usize {
    relative / MS2_INDEX_DIVISOR
}

pub fn format_absolute(absolute: usize) -> String {
    format!("index={absolute}")
}
