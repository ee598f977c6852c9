//!
//! Functions called by the command line interface
//!
use crate::common::ReferenceWindow;
use crate::detect::Detector;
use crate::error::{Error, Result};
use crate::hmm::params::{ModelType, TransProb, TransitionMatrix};
use crate::io::fasta::read_reference;
use crate::io::model::{
    read_pore_model_file, read_trained_model_file, write_trained_model_file,
};
use crate::io::signal::{read_signal_file, SignalRecord};
use crate::io::write_file;
use crate::kmer::PoreModel;
use crate::train::{TrainConfig, TrainedModel, Trainer};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

///
/// Progress bar style shared by long-running steps
///
pub fn progress_common_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {per_sec} eta {eta}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

///
/// Sets the flag when dropped, also while unwinding
///
struct DoneOnDrop<'a>(&'a AtomicBool);

impl Drop for DoneOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

///
/// Run `f` while a polling thread mirrors `progress` onto `bar`.
/// The polling thread stops when `f` returns or panics.
///
fn with_progress<T>(bar: &ProgressBar, progress: &AtomicUsize, f: impl FnOnce() -> T) -> T {
    let done = AtomicBool::new(false);
    std::thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                bar.set_position(progress.load(Ordering::Relaxed) as u64);
                std::thread::sleep(Duration::from_millis(100));
            }
        });
        let _done = DoneOnDrop(&done);
        f()
    })
}

///
/// Reference window `[start, end)` of the record, or the whole record
///
fn window_of(
    reference: &ReferenceWindow,
    start: usize,
    end: Option<usize>,
) -> Result<ReferenceWindow> {
    let end = end.unwrap_or(reference.len());
    if start >= end || end > reference.len() {
        return Err(Error::parse(
            0,
            format!(
                "interval {}..{} is outside the reference of {}bp",
                start,
                end,
                reference.len()
            ),
        ));
    }
    Ok(reference.slice(start, end))
}

///
/// Inputs of `signalphmm train`
///
#[derive(Clone, Debug)]
pub struct TrainInputs {
    pub reference: PathBuf,
    pub reference_name: Option<String>,
    /// training window on the reference; `None` end means the end of the record
    pub start: usize,
    pub end: Option<usize>,
    /// initial emissions (plain table or trained model)
    pub pore_model: PathBuf,
    /// initial transitions from a trained model
    pub init_transitions: Option<PathBuf>,
    pub signal: PathBuf,
    pub output: PathBuf,
}

///
/// Load inputs, train on every segment aligned to the training window and write
/// the model and a json summary (`<output>.json`).
///
pub fn run_train(inputs: &TrainInputs, config: TrainConfig) -> Result<TrainedModel> {
    let (ref_id, reference) =
        read_reference(&inputs.reference, inputs.reference_name.as_deref())?;
    let window = window_of(&reference, inputs.start, inputs.end)?;
    let end = inputs.start + window.len();
    let pore_model = read_pore_model_file(&inputs.pore_model)?;
    let n = window.n_positions(pore_model.k())?;
    let transitions = match &inputs.init_transitions {
        Some(path) => read_trained_model_file(path)?.transitions,
        None => TransitionMatrix::uniform(n, TransProb::default())?,
    };

    let records = read_signal_file(&inputs.signal)?;
    let corpus: Vec<Vec<f64>> = records
        .into_iter()
        .filter(|r| {
            let on_window = r.ref_start == inputs.start && r.ref_end == end;
            if !on_window {
                warn!(
                    "{} ({}..{}) is not aligned to {}:{}..{}; skipped",
                    r.read_id, r.ref_start, r.ref_end, ref_id, inputs.start, end
                );
            }
            on_window
        })
        .map(|r| r.signal)
        .collect();
    let region_indices: Vec<usize> = (0..corpus.len()).collect();
    info!(
        "training on {}:{}..{} ({} positions, {} regions)",
        ref_id,
        inputs.start,
        end,
        n,
        corpus.len()
    );

    let progress = AtomicUsize::new(0);
    let bar = ProgressBar::new((corpus.len() * config.max_iter) as u64);
    bar.set_style(progress_common_style());
    let trainer = Trainer::new(config);
    let model = with_progress(&bar, &progress, || {
        trainer.train(
            &window,
            &pore_model,
            &transitions,
            &corpus,
            &region_indices,
            &progress,
        )
    })?;
    bar.finish_and_clear();
    info!("{}", model);

    write_trained_model_file(&inputs.output, &model)?;
    let summary_path = summary_path(&inputs.output);
    write_file(&summary_path, |w| {
        serde_json::to_writer_pretty(&mut *w, &model.summary())?;
        writeln!(w)
    })?;
    info!(
        "wrote {} and {}",
        inputs.output.display(),
        summary_path.display()
    );
    Ok(model)
}

fn summary_path(output: &Path) -> PathBuf {
    let mut s = output.as_os_str().to_owned();
    s.push(".json");
    PathBuf::from(s)
}

///
/// Detector of `signalphmm detect`
///
/// With a trained model file, its transitions are used and its model type unless
/// `model_type` is given. Otherwise the default transition row is used at every
/// position.
///
pub fn load_detector(model_type: Option<ModelType>, transitions: Option<&Path>) -> Result<Detector> {
    match transitions {
        Some(path) => {
            let model = read_trained_model_file(path)?;
            let model_type = model_type.unwrap_or(model.model_type);
            info!(
                "using {} transition rows of {} ({})",
                model.transitions.n_rows(),
                path.display(),
                model_type
            );
            Ok(Detector::with_transitions(model_type, model.transitions))
        }
        None => Ok(Detector::new(
            model_type.unwrap_or_default(),
            TransProb::default(),
        )),
    }
}

///
/// Inputs of `signalphmm detect`
///
#[derive(Clone, Debug)]
pub struct DetectInputs {
    pub reference: PathBuf,
    pub reference_name: Option<String>,
    pub canonical: PathBuf,
    pub analogue: PathBuf,
    pub signal: PathBuf,
    pub output: PathBuf,
    /// use the first `segment_length` observations of each read (all if `None`)
    pub segment_length: Option<usize>,
}

///
/// Score every read of the signal file and write
/// `read_id ref_start ref_end llr` lines (`NA` for failed reads).
///
/// Returns the number of reads scored.
///
pub fn run_detect(inputs: &DetectInputs, detector: &Detector, n_threads: usize) -> Result<usize> {
    let (_, reference) = read_reference(&inputs.reference, inputs.reference_name.as_deref())?;
    let canonical = read_pore_model_file(&inputs.canonical)?;
    let analogue = read_pore_model_file(&inputs.analogue)?;
    if canonical.k() != analogue.k() {
        return Err(Error::parse(
            0,
            format!(
                "canonical model has k={} but analogue model has k={}",
                canonical.k(),
                analogue.k()
            ),
        ));
    }
    let records = read_signal_file(&inputs.signal)?;
    info!("scoring {} reads", records.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()?;
    let llrs: Vec<Result<f64>> = pool.install(|| {
        records
            .par_iter()
            .progress_with_style(progress_common_style())
            .map(|r| score_read(detector, &reference, &canonical, &analogue, r, inputs.segment_length))
            .collect()
    });

    let mut n_scored = 0;
    write_file(&inputs.output, |w| {
        writeln!(w, "# read_id\tref_start\tref_end\tllr")?;
        for (r, llr) in records.iter().zip(llrs.iter()) {
            match llr {
                Ok(llr) => {
                    n_scored += 1;
                    writeln!(w, "{}\t{}\t{}\t{}", r.read_id, r.ref_start, r.ref_end, llr)?
                }
                Err(e) => {
                    warn!("{}: {}", r.read_id, e);
                    writeln!(w, "{}\t{}\t{}\tNA", r.read_id, r.ref_start, r.ref_end)?
                }
            }
        }
        Ok(())
    })?;
    info!("scored {}/{} reads", n_scored, records.len());
    Ok(n_scored)
}

fn score_read(
    detector: &Detector,
    reference: &ReferenceWindow,
    canonical: &PoreModel,
    analogue: &PoreModel,
    record: &SignalRecord,
    segment_length: Option<usize>,
) -> Result<f64> {
    let window = window_of(reference, record.ref_start, Some(record.ref_end))?;
    let segment_length = segment_length.unwrap_or(record.signal.len());
    detector.detect(&window, canonical, analogue, &record.signal, segment_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::{mock_pore_model, mock_window, sample_signal};
    use crate::io::model::write_pore_model;
    use crate::io::{open_reader, write_string};
    use std::io::BufRead;

    fn write_inputs(dir: &Path) {
        write_string(dir.join("ref.fa"), ">ref\nGGACGTACGTACGG\n").unwrap();
        let pm = mock_pore_model();
        write_file(dir.join("canonical.tsv"), |w| write_pore_model(w, &pm)).unwrap();
        write_file(dir.join("analogue.tsv"), |w| {
            write_pore_model(w, &pm.shifted(4.0))
        })
        .unwrap();
        let mut lines = Vec::new();
        for i in 0..6 {
            let xs = sample_signal(&mock_window(), &pm, 30, i);
            let r = SignalRecord {
                read_id: format!("r{}", i),
                ref_start: 2,
                ref_end: 12,
                signal: xs,
            };
            lines.push(r.to_string());
        }
        // outside of the reference
        lines.push("r_out\t10\t40\t1,2,3".to_string());
        write_string(dir.join("signal.tsv.gz"), &(lines.join("\n") + "\n")).unwrap();
    }

    #[test]
    fn run_train_and_detect_on_files() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path();
        write_inputs(dir);

        let inputs = TrainInputs {
            reference: dir.join("ref.fa"),
            reference_name: None,
            start: 2,
            end: Some(12),
            pore_model: dir.join("canonical.tsv"),
            init_transitions: None,
            signal: dir.join("signal.tsv.gz"),
            output: dir.join("trained.model"),
        };
        let model = run_train(&inputs, TrainConfig::default()).unwrap();
        assert_eq!(model.n_regions_used, 6);
        let m = read_trained_model_file(dir.join("trained.model")).unwrap();
        assert_eq!(m.pore_model, model.pore_model);
        let summary: serde_json::Value = serde_json::from_reader(
            std::fs::File::open(dir.join("trained.model.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["n_regions_used"], 6);
        assert_eq!(summary["model_type"], "anchored");

        let inputs = DetectInputs {
            reference: dir.join("ref.fa"),
            reference_name: Some("ref".to_string()),
            canonical: dir.join("canonical.tsv"),
            analogue: dir.join("analogue.tsv"),
            signal: dir.join("signal.tsv.gz"),
            output: dir.join("llr.tsv"),
            segment_length: None,
        };
        let n = run_detect(&inputs, &Detector::default(), 2).unwrap();
        assert_eq!(n, 6);
        let lines: Vec<String> = open_reader(dir.join("llr.tsv"))
            .unwrap()
            .lines()
            .collect::<std::io::Result<_>>()
            .unwrap();
        assert_eq!(lines.len(), 8);
        assert!(lines[7].ends_with("\tNA"));
        let llrs_default: Vec<f64> = lines[1..7]
            .iter()
            .map(|line| line.split('\t').nth(3).unwrap().parse().unwrap())
            .collect();
        for llr in &llrs_default {
            assert!(*llr < 0.0);
        }

        // detection with the trained transitions
        let detector = load_detector(None, Some(&dir.join("trained.model"))).unwrap();
        assert_eq!(detector.model_type, ModelType::Anchored);
        assert_eq!(detector.transitions.as_ref(), Some(&model.transitions));
        let inputs = DetectInputs {
            output: dir.join("llr_trained.tsv"),
            ..inputs
        };
        let n = run_detect(&inputs, &detector, 2).unwrap();
        assert_eq!(n, 6);
        let lines: Vec<String> = open_reader(dir.join("llr_trained.tsv"))
            .unwrap()
            .lines()
            .collect::<std::io::Result<_>>()
            .unwrap();
        let llrs_trained: Vec<f64> = lines[1..7]
            .iter()
            .map(|line| line.split('\t').nth(3).unwrap().parse().unwrap())
            .collect();
        assert_ne!(llrs_default, llrs_trained);

        let detector = load_detector(Some(ModelType::Unanchored), None).unwrap();
        assert_eq!(detector.model_type, ModelType::Unanchored);
        assert!(detector.transitions.is_none());
    }
    #[test]
    fn progress_polling_stops_when_work_panics() {
        let progress = AtomicUsize::new(0);
        let bar = ProgressBar::hidden();
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_progress(&bar, &progress, || -> usize { panic!("failed while training") })
        }));
        assert!(r.is_err());
        let n = with_progress(&bar, &progress, || progress.fetch_add(3, Ordering::Relaxed) + 3);
        assert_eq!(n, 3);
    }
}
