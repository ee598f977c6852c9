//!
//! Reference sequence from FASTA
//!
use crate::common::ReferenceWindow;
use crate::error::{Error, Result};
use bio::io::fasta;
use log::info;
use std::path::Path;

///
/// Read the reference record named `name` (or the first record if `None`).
///
/// Bases are checked with [`ReferenceWindow::new`].
///
pub fn read_reference<P: AsRef<Path>>(path: P, name: Option<&str>) -> Result<(String, ReferenceWindow)> {
    let reader = fasta::Reader::new(super::open_reader(path)?);
    for result in reader.records() {
        let record = result?;
        if name.map_or(true, |name| record.id() == name) {
            let window = ReferenceWindow::new(record.seq())?;
            info!("reference {} ({}bp)", record.id(), window.len());
            return Ok((record.id().to_string(), window));
        }
    }
    Err(Error::parse(
        0,
        match name {
            Some(name) => format!("no reference record named `{}`", name),
            None => "no reference record".to_string(),
        },
    ))
}
