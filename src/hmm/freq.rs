//!
//! Calculate state/transition usage frequencies
//! from the result of Forward/Backward.
//!
//! - **State probs** (for each observation and each state)
//!     `gamma_t(k) = f_t[k] b_t[k] / P(x)`, the posterior probability that `x[t]`
//!     was emitted from `M_k`.
//!
//! - **Node stats** (for each state)
//!     weighted moments `\sum_t gamma_t(k) x[t]^{0,1,2}`, the sufficient statistics of
//!     the Gaussian of `M_k`.
//!
//! - **Trans freqs** (for each state)
//!     expected number of stay/step/skip transitions out of `M_k`,
//!     `\sum_t xi_t(k -> l)` with `xi_t(k -> l) = f_t[k] t_kl e_l(x[t+1]) b_t+1[l] / P(x)`.
//!
use super::common::{PHMMModel, TransKind};
use super::params::TransProb;
use super::table::PHMMResult;
use crate::common::Signal;
use crate::distribution::GaussianStats;
use crate::error::{Error, Result};
use crate::prob::Prob;

/// Struct for storing forward and backward results of an emission sequence.
#[derive(Debug, Clone)]
pub struct PHMMOutput {
    pub forward: PHMMResult,
    pub backward: PHMMResult,
    /// `P(x)` from forward
    pub full_prob: Prob,
}

/// Expected emission moments of each node
pub type NodeStats = Vec<GaussianStats>;

/// Expected stay/step/skip usage of each node (counts, not normalized)
pub type TransFreqs = Vec<TransProb>;

impl PHMMModel {
    ///
    /// Run forward and backward for the emissions and returns PHMMOutput.
    ///
    /// Fails with `Error::NonFinite` if the full probability is zero or NaN, since
    /// posteriors cannot be normalized then.
    ///
    pub fn run(&self, emissions: &[Signal]) -> Result<PHMMOutput> {
        let forward = self.forward(emissions)?;
        let full_prob = self.f_full_prob(&forward);
        if !full_prob.is_finite() {
            return Err(Error::NonFinite(full_prob.to_log_value()));
        }
        let backward = self.backward(emissions)?;
        Ok(PHMMOutput {
            forward,
            backward,
            full_prob,
        })
    }
}

impl PHMMOutput {
    pub fn to_full_prob_forward(&self) -> Prob {
        self.full_prob
    }
    pub fn n_emissions(&self) -> usize {
        self.forward.n_emissions()
    }
    ///
    /// `gamma_t(k)` for `t = 0..n`; each item is a vector over nodes.
    ///
    pub fn iter_state_probs(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        let p = self.full_prob;
        (0..self.n_emissions()).map(move |t| {
            let f = self.forward.table(t);
            let b = self.backward.table(t);
            f.m.iter()
                .zip(b.m.iter())
                .map(|(&fk, &bk)| (fk * bk / p).to_value())
                .collect()
        })
    }
    ///
    /// Weighted moments of the emissions assigned to each node
    ///
    pub fn to_node_stats(&self, emissions: &[Signal]) -> NodeStats {
        assert_eq!(emissions.len(), self.n_emissions());
        let n_nodes = self.forward.table(0).n_nodes();
        let mut stats = vec![GaussianStats::default(); n_nodes];
        for (gamma, &x) in self.iter_state_probs().zip(emissions.iter()) {
            for (k, &w) in gamma.iter().enumerate() {
                if w > 0.0 {
                    stats[k].add(x, w);
                }
            }
        }
        stats
    }
    ///
    /// Expected transition counts out of each node, bucketed into stay/step/skip
    ///
    pub fn to_trans_freqs(&self, phmm: &PHMMModel, emissions: &[Signal]) -> TransFreqs {
        assert_eq!(emissions.len(), self.n_emissions());
        let p = self.full_prob;
        let mut freqs = vec![TransProb::new(0.0, 0.0, 0.0); phmm.n_nodes()];
        for t in 0..self.n_emissions().saturating_sub(1) {
            let f = self.forward.table(t);
            let b = self.backward.table(t + 1);
            let p_emits: Vec<Prob> = phmm
                .nodes()
                .map(|(_, node)| node.p_emit(emissions[t + 1]))
                .collect();
            for (_, k, l, edge) in phmm.edges() {
                let xi = (f[k] * edge.trans_prob * p_emits[l.index()] * b[l] / p).to_value();
                let row = &mut freqs[k.index()];
                match edge.kind {
                    TransKind::Stay => row.stay += xi,
                    TransKind::Step => row.step += xi,
                    TransKind::Skip(_) => row.skip += xi,
                }
            }
        }
        freqs
    }
}
