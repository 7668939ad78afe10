use std::{fs, io, path::Path};

use mzdata::{self, io::DetailLevel, prelude::*, spectrum::MultiLayerSpectrum};

use crate::with_path;

/// The absolute positions of every MS2 spectrum in a spectrum sequence, in file order.
///
/// Entry `i` is the 0-based index of the `i`-th spectrum with an MS level of 2 among
/// all spectra in the source, regardless of their level.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ms2PositionTable {
    positions: Vec<usize>,
    total_spectra: usize,
}

fn invalid_data(path: &Path, message: String) -> io::Error {
    with_path(io::Error::new(io::ErrorKind::InvalidData, message), path)
}

fn is_mzml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mzml"))
}

impl Ms2PositionTable {
    pub fn from_ms_levels<I: IntoIterator<Item = u8>>(levels: I) -> Self {
        let mut positions = Vec::new();
        let mut absolute_index = 0;
        for level in levels {
            if level == 2 {
                positions.push(absolute_index);
            }
            absolute_index += 1;
        }
        Self {
            positions,
            total_spectra: absolute_index,
        }
    }

    pub fn from_spectra<S: SpectrumLike, I: IntoIterator<Item = S>>(spectra: I) -> Self {
        Self::from_ms_levels(spectra.into_iter().map(|s| s.ms_level()))
    }

    /// Stream the spectra of the file at `path` once, without decoding their signal arrays.
    ///
    /// A file that cannot be parsed, or that ends before the number of spectra it
    /// declares, is an [`io::ErrorKind::InvalidData`] error.
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let table = if is_mzml(path) {
            Self::from_mzml_path(path)?
        } else {
            Self::from_any_path(path)?
        };
        log::debug!(
            "Read {} spectra from {}",
            table.total_spectra,
            path.display()
        );
        Ok(table)
    }

    fn from_mzml_path(path: &Path) -> io::Result<Self> {
        let handle = fs::File::open(path).map_err(|e| with_path(e, path))?;
        let mut reader = mzdata::MzMLReader::new(handle);
        reader.set_detail_level(DetailLevel::MetadataOnly);

        // The parser reports the end of the spectrum list the same way as a malformed
        // spectrum, so the declared count decides which one was hit.
        let expected = reader.spectrum_count_hint().map(|n| n as usize);
        let mut levels = Vec::with_capacity(expected.unwrap_or_default());
        loop {
            if expected.is_some_and(|n| levels.len() == n) {
                break;
            }
            let mut spectrum = MultiLayerSpectrum::default();
            match reader.read_into(&mut spectrum) {
                Ok(_) => levels.push(spectrum.ms_level()),
                Err(e) => match expected {
                    Some(n) => {
                        return Err(invalid_data(
                            path,
                            format!(
                                "failed to read spectrum {} of {n}: {e}",
                                levels.len()
                            ),
                        ));
                    }
                    None if levels.is_empty() => {
                        return Err(invalid_data(
                            path,
                            format!("no spectra could be read: {e}"),
                        ));
                    }
                    None => {
                        log::debug!("Stopped after {} spectra: {e}", levels.len());
                        break;
                    }
                },
            }
        }
        Ok(Self::from_ms_levels(levels))
    }

    fn from_any_path(path: &Path) -> io::Result<Self> {
        let mut reader = mzdata::MZReader::open_path(path).map_err(|e| with_path(e, path))?;
        reader.set_detail_level(DetailLevel::MetadataOnly);
        let expected = reader.len();
        let table = Self::from_spectra(reader.iter());
        if table.total_spectra != expected {
            return Err(invalid_data(
                path,
                format!(
                    "read {} spectra but the file indexes {expected}",
                    table.total_spectra
                ),
            ));
        }
        Ok(table)
    }

    pub fn get(&self, ms2_index: usize) -> Option<usize> {
        self.positions.get(ms2_index).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn total_spectra(&self) -> usize {
        self.total_spectra
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.positions
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use mzdata::spectrum::SpectrumDescription;

    const LEVELS: [u8; 10] = [1, 2, 1, 2, 2, 1, 2, 1, 1, 2];

    #[test]
    fn test_from_ms_levels() {
        let table = Ms2PositionTable::from_ms_levels(LEVELS);
        assert_eq!(table.as_slice(), &[1, 3, 4, 6, 9]);
        assert_eq!(table.total_spectra(), 10);
        assert_eq!(table.len(), 5);
        assert_eq!(table.get(2), Some(4));
        assert_eq!(table.get(5), None);
    }

    #[test]
    fn test_strictly_increasing() {
        let levels = [2u8, 2, 1, 3, 2, 1, 1, 2, 2, 2, 1];
        let table = Ms2PositionTable::from_ms_levels(levels);
        assert!(table.as_slice().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(table.len(), levels.iter().filter(|l| **l == 2).count());
        assert!(table.len() <= table.total_spectra());
    }

    #[test]
    fn test_no_ms2() {
        let table = Ms2PositionTable::from_ms_levels([1u8, 1, 1]);
        assert!(table.is_empty());
        assert_eq!(table.total_spectra(), 3);

        let table = Ms2PositionTable::from_ms_levels(Vec::<u8>::new());
        assert!(table.is_empty());
        assert_eq!(table.total_spectra(), 0);
    }

    #[test]
    fn test_from_spectra() {
        let spectra: Vec<MultiLayerSpectrum> = LEVELS
            .iter()
            .enumerate()
            .map(|(i, level)| {
                let mut description = SpectrumDescription::default();
                description.index = i;
                description.id = format!("scan={}", i + 1);
                description.ms_level = *level;
                MultiLayerSpectrum::new(description, None, None, None)
            })
            .collect();
        let table = Ms2PositionTable::from_spectra(spectra);
        assert_eq!(table.as_slice(), &[1, 3, 4, 6, 9]);
    }

    #[test]
    fn test_missing_file() {
        let err = Ms2PositionTable::from_path("does/not/exist.mzML").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("does/not/exist.mzML"), "{err}");
    }

    #[test]
    fn test_is_mzml() {
        assert!(is_mzml(Path::new("run.mzML")));
        assert!(is_mzml(Path::new("RUN.MZML")));
        assert!(!is_mzml(Path::new("run.mgf")));
        assert!(!is_mzml(Path::new("run.mzML.gz")));
    }
}
