//!
//! Serialization and deserialization of emission models and trained models
//!
//! # Model format [`write_trained_model`]
//!
//! ```text
//! # comment
//! # T: model type
//! T	anchored
//! # K: k-mer size
//! K	4
//! # I: iterations and convergence status
//! I	12	converged
//! # N: number of regions used
//! N	40
//! # L: iteration and total log-likelihood
//! L	0	-12345.6
//! # E: k-mer, mean, stdv
//! E	ACGT	83.1	2.1
//! # R: position, stay, step, skip
//! R	0	0.35	0.55	0.1
//! ```
//!
//! # Pore model table [`parse_pore_model`]
//!
//! ```text
//! kmer	level_mean	level_stdv	...
//! AAAA	83.1	2.1	...
//! ```
//!
use crate::distribution::Gaussian;
use crate::error::{Error, Result};
use crate::hmm::params::{ModelType, TransProb, TransitionMatrix};
use crate::kmer::PoreModel;
use crate::train::TrainedModel;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

const CONVERGED: &str = "converged";
const NOT_CONVERGED: &str = "not_converged";

///
/// Write the trained model in the model format.
///
/// Floats are written in the shortest representation that parses back to the same
/// value.
///
pub fn write_trained_model<W: Write + ?Sized>(writer: &mut W, model: &TrainedModel) -> std::io::Result<()> {
    writeln!(writer, "# signalphmm trained model")?;
    writeln!(writer, "T\t{}", model.model_type)?;
    writeln!(writer, "K\t{}", model.pore_model.k())?;
    writeln!(
        writer,
        "I\t{}\t{}",
        model.iterations,
        if model.converged { CONVERGED } else { NOT_CONVERGED }
    )?;
    writeln!(writer, "N\t{}", model.n_regions_used)?;
    for (i, ll) in model.log_likelihoods.iter().enumerate() {
        writeln!(writer, "L\t{}\t{}", i, ll)?;
    }
    write_emissions(writer, &model.pore_model, "E\t")?;
    for (pos, row) in model.transitions.rows().iter().enumerate() {
        writeln!(writer, "R\t{}\t{}\t{}\t{}", pos, row.stay, row.step, row.skip)?;
    }
    Ok(())
}

///
/// Write the emission model as a plain table
///
pub fn write_pore_model<W: Write + ?Sized>(writer: &mut W, pore_model: &PoreModel) -> std::io::Result<()> {
    writeln!(writer, "kmer\tlevel_mean\tlevel_stdv")?;
    write_emissions(writer, pore_model, "")
}

fn write_emissions<W: Write + ?Sized>(writer: &mut W, pore_model: &PoreModel, prefix: &str) -> std::io::Result<()> {
    for (kmer, g) in pore_model.iter() {
        writeln!(
            writer,
            "{}{}\t{}\t{}",
            prefix,
            std::str::from_utf8(kmer).unwrap_or_default(),
            g.mean,
            g.stdv
        )?;
    }
    Ok(())
}

///
/// Parse the next tab-separated field of line `line`
///
fn next_field<'a, I, T>(iter: &mut I, line: usize, name: &str) -> Result<T>
where
    I: Iterator<Item = &'a str>,
    T: FromStr,
{
    let s = iter
        .next()
        .ok_or_else(|| Error::parse(line, format!("missing field `{}`", name)))?;
    s.trim()
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid {} `{}`", name, s)))
}

///
/// Add `kmer mean stdv` to the model, creating it on the first entry
///
fn add_emission<'a, I>(model: &mut Option<PoreModel>, iter: &mut I, line: usize) -> Result<()>
where
    I: Iterator<Item = &'a str>,
{
    let kmer: String = next_field(iter, line, "kmer")?;
    let kmer = kmer.to_ascii_uppercase();
    let mean: f64 = next_field(iter, line, "mean")?;
    let stdv: f64 = next_field(iter, line, "stdv")?;
    let m = model.get_or_insert_with(|| PoreModel::new(kmer.len()));
    if kmer.is_empty() || kmer.len() != m.k() {
        return Err(Error::parse(
            line,
            format!("k-mer `{}` does not have length k={}", kmer, m.k()),
        ));
    }
    m.insert(kmer.as_bytes(), Gaussian::new(mean, stdv))
}

///
/// Parse the model format into `TrainedModel`
///
pub fn parse_trained_model<R: BufRead>(reader: R) -> Result<TrainedModel> {
    let mut model_type: Option<ModelType> = None;
    let mut k: Option<usize> = None;
    let mut iterations = 0;
    let mut converged = false;
    let mut n_regions_used = 0;
    let mut log_likelihoods = Vec::new();
    let mut pore_model: Option<PoreModel> = None;
    let mut rows = Vec::new();

    for (i, text) in reader.lines().enumerate() {
        let text = text?;
        let line = i + 1;
        let mut iter = text.split('\t');
        match iter.next().unwrap_or_default() {
            "T" => {
                let s: String = next_field(&mut iter, line, "model type")?;
                model_type = Some(s.parse()?);
            }
            "K" => k = Some(next_field(&mut iter, line, "k")?),
            "I" => {
                iterations = next_field(&mut iter, line, "iterations")?;
                let status: String = next_field(&mut iter, line, "status")?;
                converged = match status.as_str() {
                    CONVERGED => true,
                    NOT_CONVERGED => false,
                    _ => return Err(Error::parse(line, format!("unknown status `{}`", status))),
                };
            }
            "N" => n_regions_used = next_field(&mut iter, line, "regions")?,
            "L" => {
                let index: usize = next_field(&mut iter, line, "iteration")?;
                if index != log_likelihoods.len() {
                    return Err(Error::parse(line, "log-likelihoods are not sorted"));
                }
                log_likelihoods.push(next_field(&mut iter, line, "log-likelihood")?);
            }
            "E" => add_emission(&mut pore_model, &mut iter, line)?,
            "R" => {
                let pos: usize = next_field(&mut iter, line, "position")?;
                if pos != rows.len() {
                    return Err(Error::parse(line, "transition rows are not sorted"));
                }
                let stay = next_field(&mut iter, line, "stay")?;
                let step = next_field(&mut iter, line, "step")?;
                let skip = next_field(&mut iter, line, "skip")?;
                rows.push(TransProb::new(stay, step, skip));
            }
            _ => {} // comments and unknown records
        }
    }

    let model_type = model_type.ok_or_else(|| Error::parse(0, "no T record"))?;
    let pore_model = pore_model.ok_or_else(|| Error::parse(0, "no E record"))?;
    if let Some(k) = k {
        if k != pore_model.k() {
            return Err(Error::parse(
                0,
                format!("K is {} but k-mers have length {}", k, pore_model.k()),
            ));
        }
    }
    Ok(TrainedModel {
        model_type,
        pore_model,
        transitions: TransitionMatrix::new(rows)?,
        iterations,
        converged,
        log_likelihoods,
        n_regions_used,
    })
}

///
/// Parse an emission model from a plain table (`kmer mean stdv ...`) or from a
/// trained model.
///
/// In the table, lines starting with `#` and a header whose first column is `kmer`
/// are skipped. Columns after the third are ignored.
///
pub fn parse_pore_model<R: BufRead>(reader: R) -> Result<PoreModel> {
    let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
    let is_trained_model = lines
        .iter()
        .find(|l| !l.starts_with('#') && !l.trim().is_empty())
        .and_then(|l| l.strip_prefix("T\t"))
        .is_some_and(|s| s.trim().parse::<ModelType>().is_ok());
    if is_trained_model {
        let text = lines.join("\n");
        return parse_trained_model(text.as_bytes()).map(|m| m.pore_model);
    }

    let mut model: Option<PoreModel> = None;
    for (i, text) in lines.iter().enumerate() {
        let line = i + 1;
        if text.starts_with('#') || text.trim().is_empty() {
            continue;
        }
        let mut iter = text.split_whitespace().peekable();
        if iter.peek().is_some_and(|s| s.eq_ignore_ascii_case("kmer")) {
            continue;
        }
        add_emission(&mut model, &mut iter, line)?;
    }
    model.ok_or_else(|| Error::parse(0, "emission model has no k-mers"))
}

pub fn write_trained_model_file<P: AsRef<Path>>(path: P, model: &TrainedModel) -> Result<()> {
    super::write_file(path, |w| write_trained_model(w, model))
}

pub fn read_trained_model_file<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
    parse_trained_model(super::open_reader(path)?)
}

pub fn read_pore_model_file<P: AsRef<Path>>(path: P) -> Result<PoreModel> {
    parse_pore_model(super::open_reader(path)?)
}
