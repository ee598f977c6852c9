//!
//! Baum-Welch training of the emission model and transitions
//!
//! ## E-step
//!
//! Rebuild the PHMM from the current parameters and run Forward/Backward on every
//! training region in parallel. Each region gives expected emission moments (tied
//! over all positions sharing a k-mer) and expected stay/step/skip counts per
//! position; these are reduced into a single `SufficientStats`.
//!
//! ## M-step
//!
//! Re-estimate each k-mer Gaussian and each transition row from the statistics plus
//! pseudocounts.
//!
//! Iterate until the largest parameter change is below the threshold or the
//! iteration limit is hit. At the limit, the parameters with the highest total
//! log-likelihood among those evaluated in an E-step are returned.
//!
use crate::common::{ReferenceWindow, Signal};
use crate::distribution::GaussianStats;
use crate::error::{Error, Result};
use crate::hmm::common::PHMMModel;
use crate::hmm::params::{ModelType, TransProb, TransitionMatrix};
use crate::io::model::write_trained_model;
use crate::kmer::{Kmer, PoreModel};
use fnv::FnvHashMap as HashMap;
use log::{debug, log, warn, Level};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

///
/// Parameters of the training loop
///
#[derive(Clone, Debug)]
pub struct TrainConfig {
    pub model_type: ModelType,
    /// number of rayon workers (`0` uses the rayon default)
    pub n_threads: usize,
    pub max_iter: usize,
    /// converged when the largest change of a parameter is below this
    pub threshold: f64,
    /// fewest regions (given, and succeeded in each iteration)
    pub min_regions: usize,
    /// pseudo-observations at the current mean/stdv added to each k-mer
    pub emission_pseudocount: f64,
    /// pseudocount added to each stay/step/skip cell
    pub transition_pseudocount: f64,
    /// report each iteration with `info!` instead of `debug!`
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            model_type: ModelType::default(),
            n_threads: 0,
            max_iter: 100,
            threshold: 1e-3,
            min_regions: 2,
            emission_pseudocount: 1.0,
            transition_pseudocount: 1.0,
            verbose: false,
        }
    }
}

///
/// Expected counts accumulated over regions
///
#[derive(Clone, Debug)]
pub struct SufficientStats {
    /// emission moments per k-mer
    pub emissions: HashMap<Kmer, GaussianStats>,
    /// expected stay/step/skip counts per position
    pub transitions: Vec<TransProb>,
    /// `\sum log P(x)` of the regions
    pub log_likelihood: f64,
    /// regions that contributed
    pub n_regions: usize,
}

impl SufficientStats {
    pub fn new(n_positions: usize) -> Self {
        SufficientStats {
            emissions: HashMap::default(),
            transitions: vec![TransProb::new(0.0, 0.0, 0.0); n_positions],
            log_likelihood: 0.0,
            n_regions: 0,
        }
    }
    ///
    /// Run Forward/Backward of a single region and accumulate its expected counts.
    ///
    pub fn add_region(&mut self, phmm: &PHMMModel, emissions: &[Signal]) -> Result<()> {
        let o = phmm.run(emissions)?;
        let node_stats = o.to_node_stats(emissions);
        let trans_freqs = o.to_trans_freqs(phmm, emissions);
        for ((_, node), s) in phmm.nodes().zip(node_stats.iter()) {
            *self.emissions.entry(node.kmer.clone()).or_default() += s;
        }
        for (row, f) in self.transitions.iter_mut().zip(trans_freqs.iter()) {
            row.stay += f.stay;
            row.step += f.step;
            row.skip += f.skip;
        }
        self.log_likelihood += o.to_full_prob_forward().to_log_value();
        self.n_regions += 1;
        Ok(())
    }
    ///
    /// Sum of two statistics (reduce operation)
    ///
    pub fn merge(mut self, other: SufficientStats) -> SufficientStats {
        for (kmer, s) in other.emissions.iter() {
            *self.emissions.entry(kmer.clone()).or_default() += s;
        }
        for (row, f) in self.transitions.iter_mut().zip(other.transitions.iter()) {
            row.stay += f.stay;
            row.step += f.step;
            row.skip += f.skip;
        }
        self.log_likelihood += other.log_likelihood;
        self.n_regions += other.n_regions;
        self
    }
}

///
/// Parameters and statistics produced by a single EM iteration
///
#[derive(Clone, Debug)]
pub struct EmStep {
    pub pore_model: PoreModel,
    pub transitions: TransitionMatrix,
    pub stats: SufficientStats,
    /// the largest absolute change of a mean, stdv or transition probability
    pub delta: f64,
}

///
/// Result of training
///
#[derive(Clone, Debug)]
pub struct TrainedModel {
    pub model_type: ModelType,
    pub pore_model: PoreModel,
    pub transitions: TransitionMatrix,
    /// number of EM iterations performed
    pub iterations: usize,
    pub converged: bool,
    /// total log-likelihood of the regions evaluated in each iteration
    pub log_likelihoods: Vec<f64>,
    /// regions that succeeded in the last iteration
    pub n_regions_used: usize,
}

///
/// Summary of a training run, written as json next to the model file
///
#[derive(Clone, Debug, Serialize)]
pub struct TrainSummary {
    pub model_type: ModelType,
    pub k: usize,
    pub n_kmers: usize,
    pub n_positions: usize,
    pub iterations: usize,
    pub converged: bool,
    pub n_regions_used: usize,
    pub log_likelihoods: Vec<f64>,
}

impl TrainedModel {
    ///
    /// Serialize into the model file format
    ///
    pub fn to_model_string(&self) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        write_trained_model(&mut buf, self)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
    pub fn summary(&self) -> TrainSummary {
        TrainSummary {
            model_type: self.model_type,
            k: self.pore_model.k(),
            n_kmers: self.pore_model.len(),
            n_positions: self.transitions.n_rows(),
            iterations: self.iterations,
            converged: self.converged,
            n_regions_used: self.n_regions_used,
            log_likelihoods: self.log_likelihoods.clone(),
        }
    }
}

impl std::fmt::Display for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} iterations={} converged={} regions={} loglik={}",
            self.model_type,
            self.iterations,
            self.converged,
            self.n_regions_used,
            self.log_likelihoods
                .last()
                .copied()
                .unwrap_or(f64::NEG_INFINITY)
        )
    }
}

///
/// Baum-Welch trainer
///
#[derive(Clone, Debug, Default)]
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Trainer { config }
    }
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }
    fn report_level(&self) -> Level {
        if self.config.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }
    ///
    /// Train the emissions and transitions of `reference` on the regions
    /// `corpus[i] for i in region_indices`.
    ///
    /// `progress` is incremented once per region evaluation.
    ///
    pub fn train(
        &self,
        reference: &ReferenceWindow,
        pore_model: &PoreModel,
        transitions: &TransitionMatrix,
        corpus: &[Vec<Signal>],
        region_indices: &[usize],
        progress: &AtomicUsize,
    ) -> Result<TrainedModel> {
        // configuration checks before any EM iteration
        if let Some(&index) = region_indices.iter().find(|&&i| i >= corpus.len()) {
            return Err(Error::InvalidRegionIndex {
                index,
                n_regions: corpus.len(),
            });
        }
        if region_indices.len() < self.config.min_regions {
            return Err(Error::InsufficientData {
                n_regions: region_indices.len(),
                min_regions: self.config.min_regions,
            });
        }
        PHMMModel::new(reference, pore_model, transitions, self.config.model_type)?;

        let regions: Vec<&[Signal]> = region_indices
            .iter()
            .map(|&i| corpus[i].as_slice())
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.n_threads)
            .build()?;
        log!(
            self.report_level(),
            "training {} on {} regions (threads={} max_iter={} threshold={})",
            self.config.model_type,
            regions.len(),
            pool.current_num_threads(),
            self.config.max_iter,
            self.config.threshold
        );

        let mut pore_model = pore_model.clone();
        let mut transitions = transitions.clone();
        let mut log_likelihoods = Vec::new();
        let mut n_regions_used = 0;
        let mut iterations = 0;
        let mut converged = false;
        // (loglik, pore_model, transitions) of the best parameters evaluated so far
        let mut best: Option<(f64, PoreModel, TransitionMatrix)> = None;

        for iteration in 0..self.config.max_iter {
            let step = pool.install(|| {
                self.em_step(reference, &pore_model, &transitions, &regions, progress)
            })?;
            log!(
                self.report_level(),
                "iteration#{}\tloglik={}\tdelta={}\tregions={}",
                iteration,
                step.stats.log_likelihood,
                step.delta,
                step.stats.n_regions
            );
            let loglik = step.stats.log_likelihood;
            log_likelihoods.push(loglik);
            n_regions_used = step.stats.n_regions;
            iterations = iteration + 1;
            // loglik scores the parameters that were fed into this step
            if best.as_ref().map_or(true, |(b, _, _)| loglik > *b) {
                best = Some((loglik, pore_model, transitions));
            }
            pore_model = step.pore_model;
            transitions = step.transitions;
            if step.delta < self.config.threshold {
                converged = true;
                break;
            }
        }
        if !converged {
            if let Some((loglik, best_pore_model, best_transitions)) = best {
                pore_model = best_pore_model;
                transitions = best_transitions;
                warn!(
                    "training did not converge in {} iterations; returning the best parameters (loglik={})",
                    self.config.max_iter, loglik
                );
            }
        }

        Ok(TrainedModel {
            model_type: self.config.model_type,
            pore_model,
            transitions,
            iterations,
            converged,
            log_likelihoods,
            n_regions_used,
        })
    }
    ///
    /// A single EM iteration on the current rayon pool.
    ///
    /// Regions failing with a recoverable error are skipped; fails with
    /// `InsufficientData` if fewer than `min_regions` succeed.
    ///
    pub fn em_step(
        &self,
        reference: &ReferenceWindow,
        pore_model: &PoreModel,
        transitions: &TransitionMatrix,
        regions: &[&[Signal]],
        progress: &AtomicUsize,
    ) -> Result<EmStep> {
        let phmm = PHMMModel::new(reference, pore_model, transitions, self.config.model_type)?;
        let n_positions = phmm.n_nodes();

        // E-step
        let stats = regions
            .par_iter()
            .enumerate()
            .map(|(i, region)| {
                let mut stats = SufficientStats::new(n_positions);
                if let Err(e) = stats.add_region(&phmm, region) {
                    warn!("region {} is skipped: {}", i, e);
                }
                progress.fetch_add(1, Ordering::Relaxed);
                stats
            })
            .reduce(|| SufficientStats::new(n_positions), SufficientStats::merge);
        debug!(
            "e-step: {}/{} regions loglik={}",
            stats.n_regions,
            regions.len(),
            stats.log_likelihood
        );
        if stats.n_regions < self.config.min_regions {
            return Err(Error::InsufficientData {
                n_regions: stats.n_regions,
                min_regions: self.config.min_regions,
            });
        }

        // M-step
        let (new_pore_model, new_transitions) = self.m_step(&stats, pore_model, transitions)?;
        let delta = pore_model
            .max_abs_diff(&new_pore_model)
            .max(transitions.max_abs_diff(&new_transitions));
        Ok(EmStep {
            pore_model: new_pore_model,
            transitions: new_transitions,
            stats,
            delta,
        })
    }
    fn m_step(
        &self,
        stats: &SufficientStats,
        pore_model: &PoreModel,
        transitions: &TransitionMatrix,
    ) -> Result<(PoreModel, TransitionMatrix)> {
        let mut new_pore_model = pore_model.clone();
        for (kmer, s) in stats.emissions.iter() {
            if s.weight > 0.0 {
                let prior = pore_model.get(kmer)?;
                let g = s.estimate(prior, self.config.emission_pseudocount);
                new_pore_model.insert(kmer, g)?;
            }
        }

        let pc = self.config.transition_pseudocount;
        let rows = stats
            .transitions
            .iter()
            .zip(transitions.rows().iter())
            .map(|(counts, prev)| {
                let row = TransProb::new(counts.stay + pc, counts.step + pc, counts.skip + pc);
                if row.sum() > 0.0 {
                    row.normalized()
                } else {
                    *prev
                }
            })
            .collect();
        let new_transitions = TransitionMatrix::new(rows)?;
        Ok((new_pore_model, new_transitions))
    }
}

///
/// Train a model and return it serialized in the model file format.
///
/// `model_identifier` selects the topology (`anchored`, `anchored-wide-skip` or
/// `unanchored`) and `n_threads` the number of workers. Other settings are the
/// defaults of [`TrainConfig`].
///
#[allow(clippy::too_many_arguments)]
pub fn train(
    reference: &str,
    pore_model: &PoreModel,
    transitions: &TransitionMatrix,
    corpus: &[Vec<Signal>],
    region_indices: &[usize],
    model_identifier: &str,
    n_threads: usize,
    progress: &AtomicUsize,
    verbose: bool,
) -> Result<String> {
    let model_type: ModelType = model_identifier.parse()?;
    let reference: ReferenceWindow = reference.parse()?;
    let trainer = Trainer::new(TrainConfig {
        model_type,
        n_threads,
        verbose,
        ..TrainConfig::default()
    });
    let model = trainer.train(
        &reference,
        pore_model,
        transitions,
        corpus,
        region_indices,
        progress,
    )?;
    model.to_model_string()
}
