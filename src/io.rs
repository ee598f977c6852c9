//!
//! File I/O
//!
//! Every file can be gzip-compressed; a path ending with `.gz` is (de)compressed
//! transparently.
//!
pub mod fasta;
pub mod model;
pub mod signal;

use crate::error::Result;
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

fn is_gz<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().extension().is_some_and(|ext| ext == "gz")
}

///
/// Open a file for buffered reading, decompressing `.gz`
///
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    if is_gz(&path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

///
/// Create a file and fill it with `f`, compressing `.gz`
///
pub fn write_file<P, F>(path: P, f: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let file = File::create(path.as_ref())?;
    if is_gz(&path) {
        let mut writer = GzEncoder::new(file, Compression::default());
        f(&mut writer)?;
        writer.try_finish()?;
    } else {
        let mut writer = std::io::BufWriter::new(file);
        f(&mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

///
/// write string into a file
///
pub fn write_string<P: AsRef<Path>>(path: P, string: &str) -> Result<()> {
    write_file(path, |w| w.write_all(string.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_back_gz() {
        let dir = tempfile::tempdir().unwrap();
        for name in &["plain.txt", "compressed.txt.gz"] {
            let path = dir.path().join(name);
            write_string(&path, "line1\nline2\n").unwrap();
            let lines: Vec<String> = open_reader(&path)
                .unwrap()
                .lines()
                .collect::<std::io::Result<_>>()
                .unwrap();
            assert_eq!(lines, vec!["line1", "line2"]);
        }
        // gz file is actually compressed
        let raw = std::fs::read(dir.path().join("compressed.txt.gz")).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    }
}
