//!
//! Analogue detection by the log-likelihood ratio of two emission models
//!
//! ```text
//! llr = log P(x | analogue) - log P(x | canonical)
//! ```
//!
//! Both PHMMs share the topology and transitions; only the k-mer Gaussians differ.
//! The transitions are either a single row used at every position or the trained
//! `TransitionMatrix` of the window. Positive values favour the analogue.
//!
use crate::common::{ReferenceWindow, Signal};
use crate::error::{Error, Result};
use crate::hmm::common::PHMMModel;
use crate::hmm::params::{ModelType, TransProb, TransitionMatrix};
use crate::kmer::PoreModel;
use crate::train::TrainedModel;
use log::{debug, info};
use rayon::prelude::*;

///
/// Detection settings shared by both hypotheses
///
#[derive(Clone, Debug, Default)]
pub struct Detector {
    pub model_type: ModelType,
    /// transition row used at every position when `transitions` is not given
    pub trans_prob: TransProb,
    /// trained per-position rows; must have one row per k-mer position of the window
    pub transitions: Option<TransitionMatrix>,
}

///
/// A single read to be scored
///
#[derive(Clone, Debug)]
pub struct DetectQuery {
    pub window: ReferenceWindow,
    pub observations: Vec<Signal>,
    /// use only the first `segment_length` observations
    pub segment_length: usize,
}

impl DetectQuery {
    ///
    /// Query that uses all observations
    ///
    pub fn new(window: ReferenceWindow, observations: Vec<Signal>) -> Self {
        let segment_length = observations.len();
        DetectQuery {
            window,
            observations,
            segment_length,
        }
    }
}

impl Detector {
    pub fn new(model_type: ModelType, trans_prob: TransProb) -> Self {
        Detector {
            model_type,
            trans_prob,
            transitions: None,
        }
    }
    ///
    /// Detector using the per-position rows of `transitions`
    ///
    pub fn with_transitions(model_type: ModelType, transitions: TransitionMatrix) -> Self {
        Detector {
            model_type,
            trans_prob: TransProb::default(),
            transitions: Some(transitions),
        }
    }
    ///
    /// Detector with the topology and transitions of a trained model
    ///
    pub fn from_trained(model: &TrainedModel) -> Self {
        Detector::with_transitions(model.model_type, model.transitions.clone())
    }
    ///
    /// Transitions for a window of `n_positions` k-mer positions
    ///
    fn transitions_for(&self, n_positions: usize) -> Result<TransitionMatrix> {
        match &self.transitions {
            Some(tm) => Ok(tm.clone()),
            None => TransitionMatrix::uniform(n_positions, self.trans_prob),
        }
    }
    ///
    /// `log P(x | analogue) - log P(x | canonical)` of the first `segment_length`
    /// observations.
    ///
    pub fn detect(
        &self,
        window: &ReferenceWindow,
        canonical: &PoreModel,
        analogue: &PoreModel,
        observations: &[Signal],
        segment_length: usize,
    ) -> Result<f64> {
        if segment_length == 0 {
            return Err(Error::EmptyObservations);
        }
        if segment_length > observations.len() {
            return Err(Error::SegmentTooLong {
                segment_length,
                n_observations: observations.len(),
            });
        }
        let segment = &observations[..segment_length];
        let n = window.n_positions(canonical.k())?;
        let transitions = self.transitions_for(n)?;
        let phmm_c = PHMMModel::new(window, canonical, &transitions, self.model_type)?;
        let phmm_a = PHMMModel::new(window, analogue, &transitions, self.model_type)?;
        let p_c = phmm_c.forward_prob(segment)?.to_log_value();
        let p_a = phmm_a.forward_prob(segment)?.to_log_value();
        debug!("canonical={} analogue={}", p_c, p_a);
        Ok(p_a - p_c)
    }
    ///
    /// Score many reads in a pool of `n_threads` workers.
    /// A failure of a read does not affect the others.
    ///
    pub fn detect_reads(
        &self,
        queries: &[DetectQuery],
        canonical: &PoreModel,
        analogue: &PoreModel,
        n_threads: usize,
    ) -> Result<Vec<Result<f64>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()?;
        Ok(pool.install(|| {
            queries
                .par_iter()
                .map(|q| {
                    self.detect(
                        &q.window,
                        canonical,
                        analogue,
                        &q.observations,
                        q.segment_length,
                    )
                })
                .collect()
        }))
    }
}

///
/// Log-likelihood ratio of the analogue model against the canonical model with the
/// default `Detector` (anchored, default transitions).
///
pub fn detect(
    window: &ReferenceWindow,
    canonical: &PoreModel,
    analogue: &PoreModel,
    observations: &[Signal],
    segment_length: usize,
    verbose: bool,
) -> Result<f64> {
    let llr = Detector::default().detect(window, canonical, analogue, observations, segment_length)?;
    if verbose {
        info!("llr={} (n={})", llr, segment_length);
    }
    Ok(llr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::{mock_emissions, mock_pore_model, mock_window, sample_signal};

    #[test]
    fn detect_identical_models_is_zero() {
        let pm = mock_pore_model();
        for seed in 0..3 {
            let xs = mock_emissions(20, seed);
            let llr = detect(&mock_window(), &pm, &pm, &xs, 20, false).unwrap();
            assert_eq!(llr, 0.0);
        }
    }
    #[test]
    fn detect_sign_follows_the_shift() {
        let window = mock_window();
        let canonical = mock_pore_model();
        let analogue = canonical.shifted(4.0);

        let xs = sample_signal(&window, &canonical, 20, 7);
        let llr = detect(&window, &canonical, &analogue, &xs, 20, true).unwrap();
        assert!(llr < 0.0, "llr={}", llr);

        let xs = sample_signal(&window, &analogue, 20, 7);
        let llr = detect(&window, &canonical, &analogue, &xs, 20, true).unwrap();
        assert!(llr > 0.0, "llr={}", llr);
    }
    #[test]
    fn detect_uses_leading_segment() {
        let window = mock_window();
        let canonical = mock_pore_model();
        let analogue = canonical.shifted(4.0);
        let mut xs = sample_signal(&window, &canonical, 20, 1);
        let a = detect(&window, &canonical, &analogue, &xs, 20, false).unwrap();
        xs.extend(vec![f64::NAN; 5]);
        let b = detect(&window, &canonical, &analogue, &xs, 20, false).unwrap();
        assert_eq!(a, b);
    }
    #[test]
    fn detect_errors() {
        let window = mock_window();
        let pm = mock_pore_model();
        let xs = mock_emissions(20, 0);
        assert!(matches!(
            detect(&window, &pm, &pm, &xs, 0, false),
            Err(Error::EmptyObservations)
        ));
        assert!(matches!(
            detect(&window, &pm, &pm, &xs, 21, false),
            Err(Error::SegmentTooLong {
                segment_length: 21,
                n_observations: 20
            })
        ));
        let short: ReferenceWindow = "ACG".parse().unwrap();
        assert!(matches!(
            detect(&short, &pm, &pm, &xs, 20, false),
            Err(Error::WindowTooShort { .. })
        ));
        let r = detect(&window, &pm, &pm, &xs, 2, false);
        assert!(r.unwrap_err().is_recoverable());
    }
    #[test]
    fn detect_reads_isolates_failures() {
        let canonical = mock_pore_model();
        let analogue = canonical.shifted(4.0);
        let queries = vec![
            DetectQuery::new(mock_window(), mock_emissions(20, 0)),
            DetectQuery::new(mock_window(), vec![60.0]),
            DetectQuery::new(mock_window(), mock_emissions(25, 1)),
        ];
        let detector = Detector::new(ModelType::Anchored, TransProb::default());
        let r = detector
            .detect_reads(&queries, &canonical, &analogue, 2)
            .unwrap();
        assert_eq!(r.len(), 3);
        assert!(r[0].as_ref().unwrap() < &0.0);
        assert!(matches!(r[1], Err(Error::Irreconcilable { .. })));
        assert!(r[2].is_ok());
    }
    fn slow_transitions() -> TransitionMatrix {
        let rows = (0..7)
            .map(|i| TransProb::new(0.80 + 0.01 * i as f64, 0.15 - 0.01 * i as f64, 0.05))
            .collect();
        TransitionMatrix::new(rows).unwrap()
    }
    #[test]
    fn detect_with_trained_transitions_matches_forward() {
        let window = mock_window();
        let canonical = mock_pore_model();
        let analogue = canonical.shifted(4.0);
        let tm = slow_transitions();
        let xs = sample_signal(&window, &canonical, 40, 5);

        let detector = Detector::with_transitions(ModelType::Anchored, tm.clone());
        let llr = detector
            .detect(&window, &canonical, &analogue, &xs, 40)
            .unwrap();
        let p_c = PHMMModel::new(&window, &canonical, &tm, ModelType::Anchored)
            .unwrap()
            .forward_prob(&xs)
            .unwrap();
        let p_a = PHMMModel::new(&window, &analogue, &tm, ModelType::Anchored)
            .unwrap()
            .forward_prob(&xs)
            .unwrap();
        assert_eq!(llr, p_a.to_log_value() - p_c.to_log_value());

        // the default row gives another value
        let llr_default = detect(&window, &canonical, &analogue, &xs, 40, false).unwrap();
        assert_ne!(llr, llr_default);
    }
    #[test]
    fn detect_from_trained_model_uses_its_topology() {
        let model = TrainedModel {
            model_type: ModelType::AnchoredWideSkip,
            pore_model: mock_pore_model(),
            transitions: slow_transitions(),
            iterations: 1,
            converged: true,
            log_likelihoods: vec![0.0],
            n_regions_used: 2,
        };
        let detector = Detector::from_trained(&model);
        assert_eq!(detector.model_type, ModelType::AnchoredWideSkip);
        assert_eq!(detector.transitions.as_ref(), Some(&model.transitions));

        // rows of a 7-position window do not fit a 5-position window
        let short: ReferenceWindow = "ACGTACGT".parse().unwrap();
        let pm = mock_pore_model();
        let xs = mock_emissions(20, 0);
        let e = detector.detect(&short, &pm, &pm, &xs, 20).unwrap_err();
        assert!(matches!(
            e,
            Error::DimensionMismatch {
                rows: 7,
                positions: 5
            }
        ));
    }
}
