//!
//! Forward algorithm definitions
//!
use super::common::PHMMModel;
use super::table::{PHMMResult, PHMMTable};
use crate::common::Signal;
use crate::error::{Error, Result};
use crate::prob::Prob;

impl PHMMModel {
    ///
    /// Check that the emissions can be evaluated on this model.
    ///
    /// * non-empty
    /// * every value is finite
    /// * long enough to reach a terminal state from a start state
    ///
    pub fn validate_emissions(&self, emissions: &[Signal]) -> Result<()> {
        if emissions.is_empty() {
            return Err(Error::EmptyObservations);
        }
        if let Some(index) = emissions.iter().position(|x| !x.is_finite()) {
            return Err(Error::NonFiniteObservation { index });
        }
        let min_observations = self.min_observations();
        if emissions.len() < min_observations {
            return Err(Error::Irreconcilable {
                n_observations: emissions.len(),
                min_observations,
            });
        }
        Ok(())
    }
    ///
    /// Run Forward algorithm to the emissions
    ///
    /// `f_t[k]` = P(emits `x[:t+1] = x[0],...,x[t]` and now in state `M_k`)
    ///
    pub fn forward(&self, emissions: &[Signal]) -> Result<PHMMResult> {
        self.validate_emissions(emissions)?;
        let mut tables: Vec<PHMMTable> = Vec::with_capacity(emissions.len());
        for (t, &x) in emissions.iter().enumerate() {
            let table = if t == 0 {
                self.f_init(x)
            } else {
                self.f_step(x, &tables[t - 1])
            };
            tables.push(table);
        }
        Ok(PHMMResult {
            tables,
            is_forward: true,
        })
    }
    ///
    /// Full probability `log P(x)` of the emissions by Forward algorithm
    ///
    /// Fails with `Error::NonFinite` when no path of the model explains `x`.
    ///
    pub fn forward_prob(&self, emissions: &[Signal]) -> Result<Prob> {
        let r = self.forward(emissions)?;
        let p = self.f_full_prob(&r);
        if p.is_finite() {
            Ok(p)
        } else {
            Err(Error::NonFinite(p.to_log_value()))
        }
    }
    ///
    /// ```text
    /// P(x) = \sum_{k: terminal} f_n-1[k]
    /// ```
    ///
    pub(crate) fn f_full_prob(&self, r: &PHMMResult) -> Prob {
        let last = r.last_table();
        self.nodes()
            .filter(|(_, node)| node.is_terminal)
            .map(|(k, _)| last[k])
            .sum()
    }
    ///
    /// ```text
    /// f_0[k] = p_init(k) e_k(x[0])
    /// ```
    fn f_init(&self, x: Signal) -> PHMMTable {
        let mut table = PHMMTable::zero(self.n_nodes());
        for (k, node) in self.nodes() {
            if !node.init_prob.is_zero() {
                table[k] = node.init_prob * node.p_emit(x);
            }
        }
        table
    }
    ///
    /// ```text
    /// f_t[k] = e_k(x[t]) \sum_{l: parents} t_lk f_t-1[l]
    /// ```
    ///
    /// parents of `k` are `k` itself (stay), `k-1` (step) and `k-1-s` (skip).
    fn f_step(&self, x: Signal, prev: &PHMMTable) -> PHMMTable {
        let mut table = PHMMTable::zero(self.n_nodes());
        for (k, node) in self.nodes() {
            let from_parents: Prob = self
                .parents(k)
                .map(|(_, l, edge)| prev[l] * edge.trans_prob)
                .sum();
            if !from_parents.is_zero() {
                table[k] = node.p_emit(x) * from_parents;
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::{mock_emissions, mock_phmm, shuffle_edges};
    use crate::hmm::params::ModelType;

    #[test]
    fn forward_full_prob_is_finite() {
        let phmm = mock_phmm(ModelType::Anchored);
        let xs = mock_emissions(20, 0);
        let p = phmm.forward_prob(&xs).unwrap();
        println!("p={}", p);
        assert!(p.is_finite());
        assert!(p.to_log_value() < 0.0);
    }
    #[test]
    fn forward_table_is_zero_beyond_reachable_positions() {
        let phmm = mock_phmm(ModelType::Anchored);
        let xs = mock_emissions(20, 0);
        let r = phmm.forward(&xs).unwrap();
        assert_eq!(r.n_emissions(), 20);
        // after t observations only positions <= 2t are reachable (skip=1)
        for t in 0..3 {
            for (k, _) in phmm.nodes() {
                if k.index() > 2 * t {
                    assert!(r.table(t)[k].is_zero());
                }
            }
        }
    }
    #[test]
    fn forward_is_invariant_to_transition_order() {
        let phmm = mock_phmm(ModelType::AnchoredWideSkip);
        let xs = mock_emissions(20, 3);
        let p0 = phmm.forward_prob(&xs).unwrap();
        for seed in 0..5 {
            let shuffled = shuffle_edges(&phmm, seed);
            let p1 = shuffled.forward_prob(&xs).unwrap();
            assert_abs_diff_eq!(p0, p1, epsilon = 1e-9);
        }
    }
    #[test]
    fn forward_rejects_degenerate_emissions() {
        let phmm = mock_phmm(ModelType::Anchored);
        assert!(matches!(phmm.forward(&[]), Err(Error::EmptyObservations)));
        assert!(matches!(
            phmm.forward(&[80.0, f64::NAN, 80.0, 80.0]),
            Err(Error::NonFiniteObservation { index: 1 })
        ));
        // 7 positions with skip=1 need at least 4 observations
        assert!(matches!(
            phmm.forward(&[80.0, 80.0, 80.0]),
            Err(Error::Irreconcilable {
                n_observations: 3,
                min_observations: 4
            })
        ));
    }
    #[test]
    fn forward_far_outlier_stays_finite() {
        // values far from every mean still give a finite log-likelihood
        let phmm = mock_phmm(ModelType::Anchored);
        let xs = vec![1000.0; 10];
        let p = phmm.forward_prob(&xs).unwrap();
        assert!(p.is_finite());
    }
}
