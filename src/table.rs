//! Tab-delimited record tables.
//!
//! Fields are read and written literally: no quoting is interpreted on input and
//! none is added on output. The line terminator of the header is detected on read
//! and used for every written row, so the header and every untouched cell survive a
//! read-write pass unchanged. Mixed terminators within one file are normalised to
//! the header's.
use std::{
    fs,
    io::{self, prelude::*},
    path::Path,
};

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tempfile::NamedTempFile;

use crate::with_path;

/// Fallback position of the scan-reference column when the header does not name it.
pub const DEFAULT_SCAN_POSITION: usize = 1;
/// Fallback position of the marker column when the header does not name it.
pub const DEFAULT_MARKER_POSITION: usize = 3;

pub const DEFAULT_SCAN_COLUMN: &str = "scan";
pub const DEFAULT_MARKER_COLUMN: &str = "sequence";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Inspect the first line in `buf`. Without a complete line, `Lf` is assumed.
    pub fn detect(buf: &[u8]) -> Self {
        match buf.iter().position(|b| *b == b'\n') {
            Some(i) if i > 0 && buf[i - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    fn terminator(&self) -> Terminator {
        match self {
            Self::Lf => Terminator::Any(b'\n'),
            Self::CrLf => Terminator::CRLF,
        }
    }
}

/// A header row plus the data rows beneath it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordTable {
    pub header: StringRecord,
    pub rows: Vec<StringRecord>,
    pub line_ending: LineEnding,
}

impl RecordTable {
    pub fn new(header: StringRecord, rows: Vec<StringRecord>) -> Self {
        Self {
            header,
            rows,
            line_ending: LineEnding::default(),
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn read<R: Read>(handle: R) -> io::Result<Self> {
        let mut handle = io::BufReader::new(handle);
        let line_ending = LineEnding::detect(handle.fill_buf()?);
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_reader(handle);

        let mut records = reader.records();
        let header = match records.next() {
            Some(header) => header?,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "Tab-delimited file is empty, expected a header row",
                ));
            }
        };
        let rows = records.collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(header, rows).with_line_ending(line_ending))
    }

    pub fn read_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let handle = fs::File::open(path).map_err(|e| with_path(e, path))?;
        Self::read(handle).map_err(|e| with_path(e, path))
    }

    pub fn write<W: Write>(&self, handle: W) -> io::Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .terminator(self.line_ending.terminator())
            .flexible(true)
            .from_writer(handle);
        writer.write_record(&self.header)?;
        for row in self.rows.iter() {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the table to `path` through a temporary file in the same directory that
    /// only replaces `path` once everything has been synced. On failure the temporary
    /// file is removed and `path` is left untouched.
    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        self.persist_to(path).map_err(|e| with_path(e, path))
    }

    fn persist_to(&self, path: &Path) -> io::Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut partial = NamedTempFile::new_in(dir)?;
        let mut handle = io::BufWriter::new(partial.as_file_mut());
        self.write(&mut handle)?;
        handle.into_inner().map_err(|e| e.into_error())?;
        partial.as_file().sync_all()?;
        partial.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Where the scan-reference and marker fields live in each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub scan: usize,
    pub marker: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            scan: DEFAULT_SCAN_POSITION,
            marker: DEFAULT_MARKER_POSITION,
        }
    }
}

impl ColumnLayout {
    /// Look up both columns by header name once, falling back to their fixed positions.
    pub fn resolve(header: &StringRecord, scan_name: &str, marker_name: &str) -> Self {
        let find = |name: &str, fallback: usize| match header.iter().position(|h| h == name) {
            Some(i) => i,
            None => {
                log::warn!("No '{name}' column in header, using column {fallback}");
                fallback
            }
        };
        Self {
            scan: find(scan_name, DEFAULT_SCAN_POSITION),
            marker: find(marker_name, DEFAULT_MARKER_POSITION),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SSL: &str = "file\tscan\tcharge\tsequence\tscore-type\n\
                       run1.mzML\t6\t2\tPEPTIDEK\tPERCOLATOR QVALUE\n\
                       run1.mzML\tscan=9\t3\tAC[+57.0]DEFGHIK\t\"quoted\"\n";

    #[test]
    fn test_read_write_literal() -> io::Result<()> {
        let table = RecordTable::read(SSL.as_bytes())?;
        assert_eq!(table.header.len(), 5);
        assert_eq!(table.len(), 2);
        assert_eq!(&table.rows[1][4], "\"quoted\"");

        let mut buf = Vec::new();
        table.write(&mut buf)?;
        assert_eq!(String::from_utf8(buf).unwrap(), SSL);
        Ok(())
    }

    #[test]
    fn test_empty_file() {
        let err = RecordTable::read("".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_header_only() -> io::Result<()> {
        let table = RecordTable::read("file\tscan\n".as_bytes())?;
        assert!(table.is_empty());
        assert_eq!(table.column_index("scan"), Some(1));
        assert_eq!(table.column_index("sequence"), None);
        Ok(())
    }

    #[test]
    fn test_resolve_layout() {
        let header = StringRecord::from(vec!["sequence", "file", "scan"]);
        let layout = ColumnLayout::resolve(&header, "scan", "sequence");
        assert_eq!(layout, ColumnLayout { scan: 2, marker: 0 });

        let header = StringRecord::from(vec!["a", "b", "c", "d"]);
        let layout = ColumnLayout::resolve(&header, "scan", "sequence");
        assert_eq!(layout, ColumnLayout::default());
    }

    #[test]
    fn test_crlf_preserved() -> io::Result<()> {
        let crlf = SSL.replace('\n', "\r\n");
        let table = RecordTable::read(crlf.as_bytes())?;
        assert_eq!(table.line_ending, LineEnding::CrLf);
        assert_eq!(&table.header[4], "score-type");

        let mut buf = Vec::new();
        table.write(&mut buf)?;
        assert_eq!(String::from_utf8(buf).unwrap(), crlf);
        Ok(())
    }

    #[test]
    fn test_detect_line_ending() {
        assert_eq!(LineEnding::detect(b"a\tb\r\nc"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect(b"a\tb\nc\r\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect(b"a\tb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect(b"\n"), LineEnding::Lf);
    }

    #[test]
    fn test_write_path() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.ssl");
        let table = RecordTable::read(SSL.as_bytes())?;
        table.write_path(&path)?;
        assert_eq!(fs::read_to_string(&path)?, SSL);
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);

        // Replaces an existing file
        RecordTable::new(table.header.clone(), Vec::new()).write_path(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "file\tscan\tcharge\tsequence\tscore-type\n");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_read_path_names_file() {
        let err = RecordTable::read_path("no/such/table.ssl").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("no/such/table.ssl"), "{err}");
    }

    #[test]
    fn test_write_path_missing_dir() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("missing").join("out.ssl");
        let table = RecordTable::read(SSL.as_bytes())?;
        let err = table.write_path(&path).unwrap_err();
        assert!(err.to_string().contains("out.ssl"), "{err}");
        assert!(!path.exists());
        Ok(())
    }
}
