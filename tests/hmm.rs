//!
//! test of signal phmm through the public interface
//!
#[macro_use]
extern crate approx;

use signalphmm::hmm::mocks::{mock_pore_model, mock_window, sample_signal};
use signalphmm::io::model::parse_trained_model;
use signalphmm::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn train_then_detect() {
    let window = mock_window();
    let truth = mock_pore_model();
    let corpus: Vec<Vec<Signal>> = (0..10)
        .map(|seed| sample_signal(&window, &truth, 35, seed))
        .collect();
    let indices: Vec<usize> = (0..corpus.len()).collect();
    let progress = AtomicUsize::new(0);
    let s = train(
        "ACGTACGTAC",
        &truth.shifted(-2.0),
        &TransitionMatrix::uniform(7, TransProb::default()).unwrap(),
        &corpus,
        &indices,
        "anchored",
        4,
        &progress,
        false,
    )
    .unwrap();
    let model = parse_trained_model(s.as_bytes()).unwrap();
    println!("{}", model);
    assert_eq!(model.model_type, ModelType::Anchored);
    assert_eq!(model.n_regions_used, 10);
    assert_eq!(progress.load(Ordering::Relaxed), 10 * model.iterations);
    for (kmer, g) in truth.iter() {
        let h = model.pore_model.get(kmer).unwrap();
        assert!((g.mean - h.mean).abs() < 1.0);
    }

    // detection with the trained transitions
    let analogue = model.pore_model.shifted(5.0);
    let xs = sample_signal(&window, &truth, 30, 200);
    let detector = Detector::from_trained(&model);
    let llr = detector
        .detect(&window, &model.pore_model, &analogue, &xs, 30)
        .unwrap();
    let p_c = PHMMModel::new(&window, &model.pore_model, &model.transitions, model.model_type)
        .unwrap()
        .forward_prob(&xs)
        .unwrap();
    let p_a = PHMMModel::new(&window, &analogue, &model.transitions, model.model_type)
        .unwrap()
        .forward_prob(&xs)
        .unwrap();
    assert_eq!(llr, p_a.to_log_value() - p_c.to_log_value());

    // trained model as canonical against an analogue shifted upward
    let canonical = model.pore_model;
    let analogue = canonical.shifted(5.0);
    let xs = sample_signal(&window, &truth, 20, 100);
    let llr = detect(&window, &canonical, &analogue, &xs, 20, false).unwrap();
    assert!(llr < 0.0);
    let llr = detect(&window, &canonical, &canonical, &xs, 20, false).unwrap();
    assert_abs_diff_eq!(llr, 0.0, epsilon = 1e-9);
}

#[test]
fn build_with_mismatched_transitions_fails() {
    let window: ReferenceWindow = "ACGTACGT".parse().unwrap();
    let tm = TransitionMatrix::uniform(3, TransProb::default()).unwrap();
    let e = PHMMModel::new(&window, &mock_pore_model(), &tm, ModelType::Anchored).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Configuration);
    assert!(matches!(
        e,
        Error::DimensionMismatch {
            rows: 3,
            positions: 5
        }
    ));
}

#[test]
fn unanchored_explains_reads_starting_inside_window() {
    let window = mock_window();
    let pm = mock_pore_model();
    let tm = TransitionMatrix::uniform(7, TransProb::default()).unwrap();
    // read covering positions 2..=6 only
    let xs = sample_signal(&window.slice(2, 10), &pm, 15, 3);

    let anchored = PHMMModel::new(&window, &pm, &tm, ModelType::Anchored).unwrap();
    let unanchored = PHMMModel::new(&window, &pm, &tm, ModelType::Unanchored).unwrap();
    let pa = anchored.forward_prob(&xs).unwrap();
    let pu = unanchored.forward_prob(&xs).unwrap();
    println!("anchored={} unanchored={}", pa, pu);
    assert!(pu.to_log_value() > pa.to_log_value() + 10.0);
}

#[test]
fn wide_skip_spans_window_with_fewer_observations() {
    let window = mock_window();
    let pm = mock_pore_model();
    let tm = TransitionMatrix::uniform(7, TransProb::default()).unwrap();
    // 60 (pos 0), 105 (pos 3), 90 (pos 6)
    let xs = vec![60.0, 105.0, 90.0];

    let anchored = PHMMModel::new(&window, &pm, &tm, ModelType::Anchored).unwrap();
    let e = anchored.forward_prob(&xs).unwrap_err();
    assert!(e.is_recoverable());

    let wide = PHMMModel::new(&window, &pm, &tm, ModelType::AnchoredWideSkip).unwrap();
    let p = wide.forward_prob(&xs).unwrap();
    assert!(p.is_finite());
    let b = wide.backward(&xs).unwrap();
    assert_eq!(b.n_emissions(), 3);
}
