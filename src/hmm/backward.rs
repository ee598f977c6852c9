//!
//! Backward algorithm definitions
//!
use super::common::PHMMModel;
use super::table::{PHMMResult, PHMMTable};
use crate::common::Signal;
use crate::error::Result;
use crate::prob::Prob;

impl PHMMModel {
    ///
    /// Run Backward algorithm to the emissions
    ///
    /// `b_t[k]` = P(emits `x[t+1:] = x[t+1], ..., x[n-1]` | in state `M_k` at `t`)
    ///
    pub fn backward(&self, emissions: &[Signal]) -> Result<PHMMResult> {
        self.validate_emissions(emissions)?;
        let n = emissions.len();
        let mut tables: Vec<PHMMTable> = Vec::with_capacity(n);
        let mut table = self.b_init();
        // feed the emissions backward: x[t+1] is consumed to make b_t
        for t in (0..n - 1).rev() {
            let prev = self.b_step(emissions[t + 1], &table);
            tables.push(table);
            table = prev;
        }
        tables.push(table);
        // reverse the vector, to order the tables along with emissions
        // i.e. tables[t] corresponds to the emissions[t]
        tables.reverse();
        Ok(PHMMResult {
            tables,
            is_forward: false,
        })
    }
    ///
    /// Full probability from the backward result
    ///
    /// ```text
    /// P(x) = \sum_k p_init(k) e_k(x[0]) b_0[k]
    /// ```
    #[cfg(test)]
    pub(crate) fn b_full_prob(&self, r: &PHMMResult, emissions: &[Signal]) -> Prob {
        let first = r.first_table();
        self.nodes()
            .map(|(k, node)| node.init_prob * node.p_emit(emissions[0]) * first[k])
            .sum()
    }
    ///
    /// ```text
    /// b_n-1[k] = 1 (if M_k is terminal) or 0 (otherwise)
    /// ```
    fn b_init(&self) -> PHMMTable {
        let mut table = PHMMTable::zero(self.n_nodes());
        for (k, node) in self.nodes() {
            if node.is_terminal {
                table[k] = Prob::one();
            }
        }
        table
    }
    ///
    /// ```text
    /// b_t[k] = \sum_{l: childs} t_kl e_l(x[t+1]) b_t+1[l]
    /// ```
    fn b_step(&self, x_next: Signal, next: &PHMMTable) -> PHMMTable {
        let p_emits: Vec<Prob> = self.nodes().map(|(_, node)| node.p_emit(x_next)).collect();
        let mut table = PHMMTable::zero(self.n_nodes());
        for (k, _) in self.nodes() {
            table[k] = self
                .childs(k)
                .map(|(_, l, edge)| edge.trans_prob * p_emits[l.index()] * next[l])
                .sum();
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::{mock_emissions, mock_phmm};
    use crate::hmm::params::ModelType;
    use test_case::test_case;

    #[test_case(ModelType::Anchored)]
    #[test_case(ModelType::AnchoredWideSkip)]
    #[test_case(ModelType::Unanchored)]
    fn forward_and_backward_full_probs_agree(model_type: ModelType) {
        let phmm = mock_phmm(model_type);
        for seed in 0..3 {
            let xs = mock_emissions(20, seed);
            let f = phmm.forward(&xs).unwrap();
            let b = phmm.backward(&xs).unwrap();
            assert_eq!(b.n_emissions(), xs.len());
            let pf = phmm.f_full_prob(&f);
            let pb = phmm.b_full_prob(&b, &xs);
            println!("pf={} pb={}", pf, pb);
            assert_abs_diff_eq!(pf, pb, epsilon = 1e-8);
        }
    }
    #[test]
    fn backward_last_table_marks_terminal_states() {
        let phmm = mock_phmm(ModelType::Anchored);
        let xs = mock_emissions(10, 0);
        let b = phmm.backward(&xs).unwrap();
        let last = b.last_table();
        for (k, node) in phmm.nodes() {
            assert_eq!(last[k].is_one(), node.is_terminal);
            assert_eq!(last[k].is_zero(), !node.is_terminal);
        }
    }
}
