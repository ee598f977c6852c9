//!
//! Profile HMM over nanopore current signal.
//!
//! Trains k-mer Gaussian emissions and stay/step/skip transitions by Baum-Welch,
//! and scores reads with the log-likelihood ratio between a canonical and an
//! analogue emission model.
//!
pub mod cli;
pub mod common;
pub mod detect;
pub mod distribution;
pub mod error;
pub mod hmm;
pub mod io;
pub mod kmer;
pub mod prelude;
pub mod prob;
pub mod train;

#[macro_use]
extern crate approx;
