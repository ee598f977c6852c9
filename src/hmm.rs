//!
//! Signal profile HMM calculation
//!
//! # Overview of calculation
//!
//! x = x[0],...,x[n-1] : current observations of length n
//!
//! M_0,...,M_m-1 : match states, one per k-mer position of the reference window
//!
//! Forward
//! F[t][k]
//!  = P(emits x[0:t+1]=x[0],...,x[t] and ends at M_k) for 0<=t<n
//!
//! Backward
//! B[t][k]
//!  = P(emits x[t+1:n]=x[t+1],...,x[n-1] and ends at a terminal | at M_k on t) for 0<=t<n
//!
//! Full probability
//! P(x) = \sum_{k: terminal} F[n-1][k]
//!      = \sum_k p_init(k) e_k(x[0]) B[0][k]
//!
//! State probs
//! gamma[t][k] = P(M_k emits x[t] | x) = F[t][k] B[t][k] / P(x)
//!
//! All values are stored as log probabilities (`Prob`).
//!
pub mod backward;
pub mod common;
pub mod forward;
pub mod freq;
pub mod mocks;
pub mod params;
pub mod table;

pub use freq::{NodeStats, PHMMOutput, TransFreqs};
