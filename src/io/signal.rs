//!
//! Signal segment file
//!
//! ```text
//! # read_id	ref_start	ref_end	signal
//! read_0	100	160	83.2,81.9,90.1,...
//! ```
//!
//! `ref_start..ref_end` is the reference window the segment is aligned to.
//!
use crate::common::Signal;
use crate::error::{Error, Result};
use itertools::Itertools;
use std::io::BufRead;
use std::path::Path;

///
/// Observations of a read aligned to a reference interval
///
#[derive(Clone, Debug, PartialEq)]
pub struct SignalRecord {
    pub read_id: String,
    pub ref_start: usize,
    pub ref_end: usize,
    pub signal: Vec<Signal>,
}

impl std::fmt::Display for SignalRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.read_id,
            self.ref_start,
            self.ref_end,
            self.signal.iter().format(",")
        )
    }
}

fn parse_record(text: &str, line: usize) -> Result<SignalRecord> {
    let fields: Vec<&str> = text.split('\t').collect();
    if fields.len() != 4 {
        return Err(Error::parse(
            line,
            format!("expected 4 columns but found {}", fields.len()),
        ));
    }
    let ref_start: usize = fields[1]
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid ref_start `{}`", fields[1])))?;
    let ref_end: usize = fields[2]
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid ref_end `{}`", fields[2])))?;
    if ref_end <= ref_start {
        return Err(Error::parse(
            line,
            format!("empty reference interval {}..{}", ref_start, ref_end),
        ));
    }
    let signal = fields[3]
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<Signal>()
                .map_err(|_| Error::parse(line, format!("invalid signal value `{}`", s)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SignalRecord {
        read_id: fields[0].to_string(),
        ref_start,
        ref_end,
        signal,
    })
}

///
/// Parse all records; `#` comment lines and blank lines are skipped
///
pub fn parse_signal_records<R: BufRead>(reader: R) -> Result<Vec<SignalRecord>> {
    let mut records = Vec::new();
    for (i, text) in reader.lines().enumerate() {
        let text = text?;
        if text.starts_with('#') || text.trim().is_empty() {
            continue;
        }
        records.push(parse_record(text.trim_end_matches('\r'), i + 1)?);
    }
    Ok(records)
}

pub fn read_signal_file<P: AsRef<Path>>(path: P) -> Result<Vec<SignalRecord>> {
    parse_signal_records(super::open_reader(path)?)
}
