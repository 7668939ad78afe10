use std::{fs, io, path::PathBuf};

use clap::{Parser, Subcommand};
use ssl_scan_tools::{
    RemapOptions,
    concat::concat_tab_files,
    fasta::{DEFAULT_SEQUENCE_COLUMN, extract_sequences_to_fasta},
    remap_scan_indices,
    with_path,
    table::{DEFAULT_MARKER_COLUMN, DEFAULT_SCAN_COLUMN},
};

/// Utilities for tab-delimited spectrum library search results
#[derive(Parser)]
#[command(version)]
struct App {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert MS2 scan indices to absolute scan indices (including MS1 scans)
    Remap {
        /// Path to the tab-delimited file with MS2 scan indices
        tab_file: PathBuf,

        /// Path to the spectral data file, e.g. mzML
        spectral_file: PathBuf,

        /// Path to write the output tab-delimited file with corrected indices
        output_file: PathBuf,

        /// Header name of the scan reference column
        #[arg(long, default_value = DEFAULT_SCAN_COLUMN)]
        scan_column: String,

        /// Header name of the column whose values starting with '[' exclude a row
        #[arg(long, default_value = DEFAULT_MARKER_COLUMN)]
        marker_column: String,
    },
    /// Concatenate tab-delimited files, keeping only the header from the first file
    Concat {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Write to this path instead of STDOUT
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract unique sequences from a tab-delimited file to FASTA format
    Fasta {
        /// Path to the tab-delimited file
        tab_file: PathBuf,

        /// Path to write the output FASTA file
        fasta_file: PathBuf,

        #[arg(long, default_value = DEFAULT_SEQUENCE_COLUMN)]
        sequence_column: String,
    },
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = App::parse();

    match args.command {
        Command::Remap {
            tab_file,
            spectral_file,
            output_file,
            scan_column,
            marker_column,
        } => {
            let options = RemapOptions {
                scan_column,
                marker_column,
            };
            remap_scan_indices(tab_file, spectral_file, output_file, &options)?;
        }
        Command::Concat { files, output } => {
            let n_lines = match output {
                Some(path) => {
                    let handle = fs::File::create(&path).map_err(|e| with_path(e, &path))?;
                    let handle = io::BufWriter::new(handle);
                    concat_tab_files(&files, handle)?
                }
                None => concat_tab_files(&files, io::stdout().lock())?,
            };
            log::info!("Concatenated {n_lines} rows from {} files", files.len());
        }
        Command::Fasta {
            tab_file,
            fasta_file,
            sequence_column,
        } => {
            extract_sequences_to_fasta(tab_file, fasta_file, &sequence_column)?;
        }
    }
    Ok(())
}
