use std::{
    collections::BTreeSet,
    fs,
    io::{self, prelude::*},
    path::Path,
};

use crate::{table::RecordTable, with_path};

pub const DEFAULT_SEQUENCE_COLUMN: &str = "sequence";

/// Collect the distinct non-blank values of `column`, trimmed and sorted.
///
/// Rows too short to hold the column are skipped.
pub fn collect_unique_sequences(table: &RecordTable, column: usize) -> BTreeSet<String> {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Strip modifications and anything else that is not an uppercase residue letter.
pub fn clean_sequence(sequence: &str) -> String {
    sequence.chars().filter(|c| c.is_ascii_uppercase()).collect()
}

pub fn write_fasta<'a, I: IntoIterator<Item = &'a String>, W: Write>(
    sequences: I,
    mut writer: W,
) -> io::Result<()> {
    for sequence in sequences {
        writeln!(writer, ">{sequence}")?;
        writeln!(writer, "{}", clean_sequence(sequence))?;
    }
    writer.flush()
}

/// Write each unique sequence in `tab_path` to `fasta_path`, with the original sequence
/// as the description line. Returns the number of sequences written.
pub fn extract_sequences_to_fasta<P: AsRef<Path>, Q: AsRef<Path>>(
    tab_path: P,
    fasta_path: Q,
    column: &str,
) -> io::Result<usize> {
    let (tab_path, fasta_path) = (tab_path.as_ref(), fasta_path.as_ref());
    println!("Processing tab file: {}", tab_path.display());
    let table = RecordTable::read_path(tab_path)?;
    let Some(column_index) = table.column_index(column) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Could not find '{column}' column in {}", tab_path.display()),
        ));
    };

    let sequences = collect_unique_sequences(&table, column_index);
    println!(
        "Writing {} unique sequences to: {}",
        sequences.len(),
        fasta_path.display()
    );
    let handle = fs::File::create(fasta_path).map_err(|e| with_path(e, fasta_path))?;
    write_fasta(&sequences, io::BufWriter::new(handle)).map_err(|e| with_path(e, fasta_path))?;
    println!("FASTA file generation complete.");
    Ok(sequences.len())
}
