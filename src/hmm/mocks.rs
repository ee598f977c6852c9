//!
//! Mock PHMMs and synthetic signal for testing
//!
use super::common::PHMMModel;
use super::params::{ModelType, TransProb, TransitionMatrix};
use crate::common::{ReferenceWindow, Signal};
use crate::kmer::PoreModel;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

///
/// Sample reference window (10bp) "ACGTACGTAC"
///
pub fn mock_window() -> ReferenceWindow {
    ReferenceWindow::new(b"ACGTACGTAC").unwrap()
}

///
/// 4-mer table covering the k-mers of `mock_window`
///
/// ACGT=60, CGTA=75, GTAC=90, TACG=105 (stdv 2)
///
pub fn mock_pore_model() -> PoreModel {
    PoreModel::from_entries(vec![
        ("ACGT", 60.0, 2.0),
        ("CGTA", 75.0, 2.0),
        ("GTAC", 90.0, 2.0),
        ("TACG", 105.0, 2.0),
    ])
    .unwrap()
}

///
/// PHMM of `mock_window` with `mock_pore_model` and default transitions
///
pub fn mock_phmm(model_type: ModelType) -> PHMMModel {
    let window = mock_window();
    let pm = mock_pore_model();
    let tm = TransitionMatrix::uniform(window.len() - pm.k() + 1, TransProb::default()).unwrap();
    PHMMModel::new(&window, &pm, &tm, model_type).unwrap()
}

///
/// Standard normal sample by Box-Muller transform
///
pub fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

///
/// Sample `n` observations from the anchored path of `window` under `pore_model`.
///
/// The path starts at the first k-mer and ends at the last one; dwell times are
/// spread as evenly as possible (every k-mer emits at least once when
/// `n >= n_positions`).
///
pub fn sample_signal(window: &ReferenceWindow, pore_model: &PoreModel, n: usize, seed: u64) -> Vec<Signal> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let kmers: Vec<&[u8]> = window.kmers(pore_model.k()).collect();
    let m = kmers.len();
    (0..n)
        .map(|t| {
            let j = if n > 1 { t * m / n } else { 0 };
            let j = j.min(m - 1);
            let g = pore_model.get(kmers[j]).unwrap();
            g.mean + g.stdv * standard_normal(&mut rng)
        })
        .collect()
}

///
/// `n` observations of `mock_window` under `mock_pore_model`
///
pub fn mock_emissions(n: usize, seed: u64) -> Vec<Signal> {
    sample_signal(&mock_window(), &mock_pore_model(), n, seed)
}

///
/// Rebuild the graph of `phmm` with the same transitions inserted in a random order.
/// The enumeration order of parents/childs changes, the model does not.
///
pub fn shuffle_edges(phmm: &PHMMModel, seed: u64) -> PHMMModel {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let nodes = phmm.nodes().map(|(_, node)| node.clone()).collect();
    let mut edges: Vec<_> = phmm
        .edges()
        .map(|(_, s, t, e)| (s.index(), t.index(), e.kind, e.trans_prob))
        .collect();
    edges.shuffle(&mut rng);
    PHMMModel::from_parts(phmm.model_type, phmm.k, nodes, edges)
}
