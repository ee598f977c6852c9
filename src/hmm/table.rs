//!
//! Table definitions
//!
//! ## PHMMTable
//!
//! the prob assigned for each node (match state) at a single observation
//!
//! F[t][v] or B[t][v]
//!
use super::common::NodeIndex;
use crate::prob::Prob;

///
/// Forward/Backward probabilities of all nodes for a single observation
///
#[derive(Debug, Clone, PartialEq)]
pub struct PHMMTable {
    pub m: Vec<Prob>,
}

impl PHMMTable {
    pub fn new(n_nodes: usize, value: Prob) -> Self {
        PHMMTable {
            m: vec![value; n_nodes],
        }
    }
    pub fn zero(n_nodes: usize) -> Self {
        PHMMTable::new(n_nodes, Prob::zero())
    }
    pub fn n_nodes(&self) -> usize {
        self.m.len()
    }
    ///
    /// The largest `|log p_a - log p_b|` over nodes
    ///
    pub fn diff(&self, other: &PHMMTable) -> f64 {
        self.m
            .iter()
            .zip(other.m.iter())
            .map(|(a, b)| a.log_diff(*b))
            .fold(0.0, f64::max)
    }
}

impl std::ops::Index<NodeIndex> for PHMMTable {
    type Output = Prob;
    fn index(&self, v: NodeIndex) -> &Prob {
        &self.m[v.index()]
    }
}

impl std::ops::IndexMut<NodeIndex> for PHMMTable {
    fn index_mut(&mut self, v: NodeIndex) -> &mut Prob {
        &mut self.m[v.index()]
    }
}

impl std::fmt::Display for PHMMTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, p) in self.m.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{:.4}", p.to_log_value())?;
        }
        Ok(())
    }
}

/// Struct that stores Forward/Backward algorithm result
/// for the given emissions
///
/// `tables[t]` corresponds to the emission `x[t]`, for both directions.
#[derive(Debug, Clone)]
pub struct PHMMResult {
    pub tables: Vec<PHMMTable>,
    pub is_forward: bool,
}

impl PHMMResult {
    /// The number of emissions that this result stores.
    pub fn n_emissions(&self) -> usize {
        self.tables.len()
    }
    pub fn table(&self, t: usize) -> &PHMMTable {
        &self.tables[t]
    }
    pub fn first_table(&self) -> &PHMMTable {
        &self.tables[0]
    }
    pub fn last_table(&self) -> &PHMMTable {
        &self.tables[self.tables.len() - 1]
    }
}
