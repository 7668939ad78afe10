use std::{
    fs,
    io::{self, prelude::*},
    path::Path,
};

use crate::with_path;

fn copy_lines<R: BufRead, W: Write>(
    mut reader: R,
    writer: &mut W,
    skip_header: bool,
) -> io::Result<usize> {
    let mut line = Vec::new();
    let mut n_lines = 0;
    let mut is_header = true;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if is_header {
            is_header = false;
            if skip_header {
                continue;
            }
        } else {
            n_lines += 1;
        }
        writer.write_all(&line)?;
        if !line.ends_with(b"\n") {
            writer.write_all(b"\n")?;
        }
    }
    Ok(n_lines)
}

/// Concatenate tab-delimited files into `writer`, keeping only the first file's header.
///
/// Lines are copied byte-for-byte. Returns the number of data lines written.
pub fn concat_tab_files<P: AsRef<Path>, W: Write>(paths: &[P], mut writer: W) -> io::Result<usize> {
    let Some((first, rest)) = paths.split_first() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "No input files provided",
        ));
    };

    let mut n_lines = 0;
    for (path, skip_header) in std::iter::once((first, false)).chain(rest.iter().map(|p| (p, true))) {
        let path = path.as_ref();
        log::debug!("Concatenating {}", path.display());
        let reader = io::BufReader::new(fs::File::open(path).map_err(|e| with_path(e, path))?);
        n_lines += copy_lines(reader, &mut writer, skip_header)?;
    }
    writer.flush()?;
    Ok(n_lines)
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) -> io::Result<std::path::PathBuf> {
        let path = dir.join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    #[test]
    fn test_concat() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = write_file(dir.path(), "a.ssl", "file\tscan\na\t1\na\t2\n")?;
        let b = write_file(dir.path(), "b.ssl", "file\tscan\nb\t3\n")?;
        let c = write_file(dir.path(), "c.ssl", "file\tscan\nc\t4")?;
        let d = write_file(dir.path(), "d.ssl", "file\tscan\n")?;

        let mut buf = Vec::new();
        let n = concat_tab_files(&[a, b, c, d], &mut buf)?;
        assert_eq!(n, 4);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "file\tscan\na\t1\na\t2\nb\t3\nc\t4\n"
        );
        Ok(())
    }

    #[test]
    fn test_single_file() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = write_file(dir.path(), "a.ssl", "file\tscan\r\na\t1\r\n")?;
        let mut buf = Vec::new();
        let n = concat_tab_files(&[a], &mut buf)?;
        assert_eq!(n, 1);
        assert_eq!(buf, b"file\tscan\r\na\t1\r\n");
        Ok(())
    }

    #[test]
    fn test_no_files() {
        let paths: [&Path; 0] = [];
        let err = concat_tab_files(&paths, io::sink()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_missing_file() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = write_file(dir.path(), "a.ssl", "file\tscan\na\t1\n")?;
        let err = concat_tab_files(&[a, dir.path().join("nope.ssl")], io::sink()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("nope.ssl"), "{err}");
        Ok(())
    }
}
