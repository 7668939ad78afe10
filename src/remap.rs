//! Rewrite relative MS2 scan references in a tab-delimited record file as absolute
//! spectrum indices into the spectral file they were searched against.
use std::{io, path::Path};

use csv::StringRecord;

use crate::{
    scan_ref::{ScanReferenceError, adjust_ms2_index, format_absolute, parse_relative_index},
    spectra::Ms2PositionTable,
    table::{ColumnLayout, DEFAULT_MARKER_COLUMN, DEFAULT_SCAN_COLUMN, RecordTable},
};

/// Rows whose marker column starts with this are dropped from the output.
pub const EXCLUSION_MARKER: char = '[';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapOptions {
    pub scan_column: String,
    pub marker_column: String,
}

impl Default for RemapOptions {
    fn default() -> Self {
        Self {
            scan_column: DEFAULT_SCAN_COLUMN.to_string(),
            marker_column: DEFAULT_MARKER_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RemapSummary {
    pub total_spectra: usize,
    pub ms2_spectra: usize,
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub rows_remapped: usize,
    pub unparseable: usize,
    pub out_of_range: usize,
}

impl RemapSummary {
    fn record_error(&mut self, err: &ScanReferenceError) {
        match err {
            ScanReferenceError::Unparseable { .. } => self.unparseable += 1,
            ScanReferenceError::OutOfRange { .. } => self.out_of_range += 1,
        }
    }
}

fn is_excluded(row: &StringRecord, layout: &ColumnLayout) -> bool {
    row.get(layout.marker)
        .is_some_and(|v| v.starts_with(EXCLUSION_MARKER))
}

/// Translate one scan-reference field to its absolute spectrum index.
pub fn resolve_scan_reference(
    field: &str,
    positions: &Ms2PositionTable,
) -> Result<usize, ScanReferenceError> {
    let relative = parse_relative_index(field)?;
    let adjusted = adjust_ms2_index(relative);
    positions
        .get(adjusted)
        .ok_or(ScanReferenceError::OutOfRange {
            relative,
            adjusted,
            len: positions.len(),
        })
}

fn replace_field(row: &StringRecord, column: usize, value: &str) -> StringRecord {
    row.iter()
        .enumerate()
        .map(|(i, v)| if i == column { value } else { v })
        .collect()
}

/// Apply the remapping to an in-memory table.
///
/// Excluded rows are removed. Rows whose scan reference cannot be resolved are kept
/// as-is and counted, everything else has its scan reference replaced by `index=<n>`.
/// The header and the relative order of surviving rows are left untouched.
pub fn remap_records(
    table: RecordTable,
    positions: &Ms2PositionTable,
    layout: &ColumnLayout,
) -> (RecordTable, RemapSummary) {
    let mut summary = RemapSummary {
        total_spectra: positions.total_spectra(),
        ms2_spectra: positions.len(),
        ..Default::default()
    };

    let RecordTable {
        header,
        rows,
        line_ending,
    } = table;
    let mut output = Vec::with_capacity(rows.len());
    for row in rows {
        summary.rows_read += 1;
        if is_excluded(&row, layout) {
            summary.rows_dropped += 1;
            continue;
        }

        let field = row.get(layout.scan).unwrap_or_default();
        match resolve_scan_reference(field, positions) {
            Ok(absolute) => {
                output.push(replace_field(&row, layout.scan, &format_absolute(absolute)));
                summary.rows_remapped += 1;
            }
            Err(err) => {
                log::warn!("{err}");
                summary.record_error(&err);
                output.push(row);
            }
        }
    }
    summary.rows_written = output.len();
    (
        RecordTable::new(header, output).with_line_ending(line_ending),
        summary,
    )
}

/// Remap the scan references of the record file at `record_path` against the spectra
/// in `spectral_path`, writing the result to `output_path`.
///
/// Any failure to read either input or to write the output is returned as an error and
/// leaves nothing at `output_path`. Problems with individual rows are only logged.
pub fn remap_scan_indices<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    record_path: P,
    spectral_path: Q,
    output_path: R,
    options: &RemapOptions,
) -> io::Result<RemapSummary> {
    let (record_path, spectral_path, output_path) = (
        record_path.as_ref(),
        spectral_path.as_ref(),
        output_path.as_ref(),
    );

    println!("Processing spectral file: {}", spectral_path.display());
    let positions = Ms2PositionTable::from_path(spectral_path)?;
    println!(
        "Found {} MS2 scans among {} total scans",
        positions.len(),
        positions.total_spectra()
    );

    println!("Processing tab file: {}", record_path.display());
    let table = RecordTable::read_path(record_path)?;
    let layout = ColumnLayout::resolve(&table.header, &options.scan_column, &options.marker_column);
    log::debug!("Resolved column layout {layout:?}");

    let (table, summary) = remap_records(table, &positions, &layout);

    println!("Writing output to: {}", output_path.display());
    table.write_path(output_path)?;
    println!(
        "Conversion complete. Processed {} entries.",
        summary.rows_written
    );
    if summary.rows_dropped > 0 || summary.unparseable > 0 || summary.out_of_range > 0 {
        log::info!(
            "Dropped {} marked rows, {} unparseable and {} out of range scan references left unchanged",
            summary.rows_dropped,
            summary.unparseable,
            summary.out_of_range
        );
    }
    Ok(summary)
}
