use std::{io, path::Path};

pub mod concat;
pub mod fasta;
pub mod remap;
pub mod scan_ref;
pub mod spectra;
pub mod table;

pub use remap::{RemapOptions, RemapSummary, remap_records, remap_scan_indices};
pub use scan_ref::{MS2_INDEX_DIVISOR, ScanReferenceError};
pub use spectra::Ms2PositionTable;
pub use table::{ColumnLayout, LineEnding, RecordTable};

/// Prefix an I/O error with the path it concerns, keeping its kind.
pub fn with_path(err: io::Error, path: &Path) -> io::Error {
    io::Error::new(err.kind(), format!("{}: {err}", path.display()))
}
