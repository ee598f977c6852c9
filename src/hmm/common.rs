//!
//! Definition of the signal profile HMM (topology builder)
//!
//! ```text
//!        stay        stay        stay
//!        ┌─┐         ┌─┐         ┌─┐
//!        v │  step   v │  step   v │
//!   ---> M_0 ------> M_1 ------> M_2 ---> ...
//!          \                   ^
//!           `-------skip------'
//! ```
//!
//! One match state `M_j` per k-mer position `j` of the reference window; `M_j`
//! emits from the Gaussian of the k-mer `window[j..j+k]`.
//!
use super::params::{ModelType, TransitionMatrix};
use crate::common::{sequence_to_string, ReferenceWindow};
use crate::distribution::Gaussian;
use crate::error::{Error, Result};
use crate::kmer::{Kmer, PoreModel};
use crate::prob::Prob;
use petgraph::graph::DiGraph;
pub use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

///
/// Type of a transition between two match states
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransKind {
    /// `j -> j`
    Stay,
    /// `j -> j+1`
    Step,
    /// `j -> j+1+s` jumping over `s` positions
    Skip(usize),
}

///
/// Match state for a reference position
///
#[derive(Clone, Debug)]
pub struct PNode {
    /// reference position `j` (the k-mer `window[j..j+k]`)
    pub position: usize,
    pub kmer: Kmer,
    pub emission: Gaussian,
    /// Begin state to this node
    pub init_prob: Prob,
    /// whether a path can end in this node
    pub is_terminal: bool,
}

impl PNode {
    /// emission probability (density) of the signal `x`
    pub fn p_emit(&self, x: f64) -> Prob {
        self.emission.emission(x)
    }
}

impl std::fmt::Display for PNode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}:{} {} (p_init={})",
            self.position,
            sequence_to_string(&self.kmer),
            self.emission,
            self.init_prob.to_value()
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PEdge {
    pub kind: TransKind,
    pub trans_prob: Prob,
}

impl std::fmt::Display for PEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?} p={}", self.kind, self.trans_prob.to_value())
    }
}

///
/// Profile HMM model
///
/// Node `NodeIndex::new(j)` is the match state of position `j`.
///
#[derive(Clone, Debug)]
pub struct PHMMModel {
    pub model_type: ModelType,
    pub k: usize,
    pub graph: DiGraph<PNode, PEdge>,
}

impl PHMMModel {
    ///
    /// Build the state graph of `window` under `pore_model` and `transitions`.
    ///
    /// Fails without building anything if the window is shorter than k, if the
    /// matrix does not have one row per position, or if a k-mer of the window is
    /// missing from the pore model.
    ///
    pub fn new(
        window: &ReferenceWindow,
        pore_model: &PoreModel,
        transitions: &TransitionMatrix,
        model_type: ModelType,
    ) -> Result<PHMMModel> {
        let k = pore_model.k();
        let n = window.n_positions(k)?;
        if transitions.n_rows() != n {
            return Err(Error::DimensionMismatch {
                rows: transitions.n_rows(),
                positions: n,
            });
        }
        let emissions = window
            .kmers(k)
            .map(|kmer| pore_model.get(kmer).map(|g| (kmer.to_vec(), *g)))
            .collect::<Result<Vec<_>>>()?;

        let slack = model_type.boundary_slack().min(n - 1);
        let p_init = Prob::from_prob(1.0 / (slack + 1) as f64);
        let nodes = emissions
            .into_iter()
            .enumerate()
            .map(|(position, (kmer, emission))| PNode {
                position,
                kmer,
                emission,
                init_prob: if position <= slack { p_init } else { Prob::zero() },
                is_terminal: position + slack + 1 >= n,
            })
            .collect();

        let max_skip = model_type.max_skip();
        let mut edges = Vec::new();
        for j in 0..n {
            let row = transitions.row(j);
            edges.push((j, j, TransKind::Stay, Prob::from_prob(row.stay)));
            if j + 1 < n {
                edges.push((j, j + 1, TransKind::Step, Prob::from_prob(row.step)));
            }
            let p_skip = Prob::from_prob(row.skip / max_skip as f64);
            for s in 1..=max_skip {
                if j + 1 + s < n {
                    edges.push((j, j + 1 + s, TransKind::Skip(s), p_skip));
                }
            }
        }

        Ok(PHMMModel::from_parts(model_type, k, nodes, edges))
    }
    ///
    /// Assemble the graph from nodes (in position order) and `(source, target, kind,
    /// prob)` edges. Edges are added in the given order.
    ///
    pub fn from_parts(
        model_type: ModelType,
        k: usize,
        nodes: Vec<PNode>,
        edges: Vec<(usize, usize, TransKind, Prob)>,
    ) -> PHMMModel {
        let mut graph = DiGraph::new();
        for node in nodes {
            graph.add_node(node);
        }
        for (s, t, kind, trans_prob) in edges {
            graph.add_edge(NodeIndex::new(s), NodeIndex::new(t), PEdge { kind, trans_prob });
        }
        PHMMModel {
            model_type,
            k,
            graph,
        }
    }
    ///
    /// Return the number of nodes (= modelled positions)
    ///
    pub fn n_nodes(&self) -> usize {
        self.graph.node_count()
    }
    pub fn n_edges(&self) -> usize {
        self.graph.edge_count()
    }
    ///
    /// Iterator of `(NodeIndex, &PNode)` in position order
    ///
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &PNode)> + '_ {
        self.graph
            .node_indices()
            .map(move |v| (v, &self.graph[v]))
    }
    ///
    /// Iterator of `(EdgeIndex, source, target, &PEdge)`
    ///
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, NodeIndex, NodeIndex, &PEdge)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.id(), e.source(), e.target(), e.weight()))
    }
    ///
    /// Iterator of parent edges of the node, `(EdgeIndex, parent, &PEdge)`
    ///
    pub fn parents(&self, node: NodeIndex) -> impl Iterator<Item = (EdgeIndex, NodeIndex, &PEdge)> + '_ {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.id(), e.source(), e.weight()))
    }
    ///
    /// Iterator of child edges of the node, `(EdgeIndex, child, &PEdge)`
    ///
    pub fn childs(&self, node: NodeIndex) -> impl Iterator<Item = (EdgeIndex, NodeIndex, &PEdge)> + '_ {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight()))
    }
    pub fn node(&self, node: NodeIndex) -> &PNode {
        &self.graph[node]
    }
    pub fn edge(&self, edge: EdgeIndex) -> &PEdge {
        &self.graph[edge]
    }
    ///
    /// Emission probability of observing `x` from the match state of `node`.
    ///
    pub fn p_emit(&self, node: NodeIndex, x: f64) -> Prob {
        self.graph[node].p_emit(x)
    }
    ///
    /// The fewest observations that can travel from a start state to a terminal
    /// state. Shorter sequences have zero likelihood.
    ///
    pub fn min_observations(&self) -> usize {
        let n = self.n_nodes();
        if n == 0 {
            return 0;
        }
        let slack = self.model_type.boundary_slack().min(n - 1);
        let distance = (n - 1).saturating_sub(2 * slack);
        let stride = 1 + self.model_type.max_skip();
        1 + (distance + stride - 1) / stride
    }
}

impl std::fmt::Display for PHMMModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "# model_type={} k={}", self.model_type, self.k)?;
        for (v, node) in self.nodes() {
            writeln!(f, "N\t{}\t{}", v.index(), node)?;
        }
        for (e, s, t, edge) in self.edges() {
            writeln!(f, "E\t{}\t{}\t{}\t{}", e.index(), s.index(), t.index(), edge)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::{mock_pore_model, mock_window};
    use crate::hmm::params::TransProb;

    #[test]
    fn phmm_build_anchored() {
        let window = mock_window();
        let pm = mock_pore_model();
        let tm = TransitionMatrix::uniform(7, TransProb::default()).unwrap();
        let phmm = PHMMModel::new(&window, &pm, &tm, ModelType::Anchored).unwrap();
        println!("{}", phmm);
        assert_eq!(phmm.n_nodes(), 7);
        // 7 stay + 6 step + 5 skip
        assert_eq!(phmm.n_edges(), 18);
        for (v, node) in phmm.nodes() {
            assert_eq!(v.index(), node.position);
            assert_eq!(node.kmer, window.as_bytes()[node.position..node.position + 4].to_vec());
            assert_eq!(node.init_prob.is_one(), node.position == 0);
            assert_eq!(node.is_terminal, node.position == 6);
        }
        // every outgoing row sums to one except where targets fall off the end
        for (v, _) in phmm.nodes() {
            let s: f64 = phmm.childs(v).map(|(_, _, e)| e.trans_prob.to_value()).sum();
            if v.index() < 5 {
                assert_abs_diff_eq!(s, 1.0, epsilon = 1e-12);
            } else {
                assert!(s < 1.0);
            }
        }
        assert_eq!(phmm.min_observations(), 4);
    }
    #[test]
    fn phmm_build_wide_skip_and_unanchored() {
        let window = mock_window();
        let pm = mock_pore_model();
        let tm = TransitionMatrix::uniform(7, TransProb::default()).unwrap();

        let phmm = PHMMModel::new(&window, &pm, &tm, ModelType::AnchoredWideSkip).unwrap();
        // 7 stay + 6 step + 5 skip1 + 4 skip2
        assert_eq!(phmm.n_edges(), 22);
        assert_eq!(phmm.min_observations(), 3);

        let phmm = PHMMModel::new(&window, &pm, &tm, ModelType::Unanchored).unwrap();
        let starts: Vec<usize> = phmm
            .nodes()
            .filter(|(_, n)| !n.init_prob.is_zero())
            .map(|(v, _)| v.index())
            .collect();
        let ends: Vec<usize> = phmm
            .nodes()
            .filter(|(_, n)| n.is_terminal)
            .map(|(v, _)| v.index())
            .collect();
        assert_eq!(starts, vec![0, 1, 2]);
        assert_eq!(ends, vec![4, 5, 6]);
        // from position 2 to 4 with a single skip
        assert_eq!(phmm.min_observations(), 2);
    }
    #[test]
    fn phmm_build_dimension_mismatch() {
        // 8bp window with k=4 implies 5 positions
        let window: ReferenceWindow = "ACGTACGT".parse().unwrap();
        let pm = mock_pore_model();
        let tm = TransitionMatrix::uniform(3, TransProb::default()).unwrap();
        let r = PHMMModel::new(&window, &pm, &tm, ModelType::Anchored);
        assert!(matches!(
            r,
            Err(Error::DimensionMismatch {
                rows: 3,
                positions: 5
            })
        ));
    }
    #[test]
    fn phmm_build_errors() {
        let pm = mock_pore_model();
        let tm = TransitionMatrix::uniform(1, TransProb::default()).unwrap();

        let short: ReferenceWindow = "ACG".parse().unwrap();
        assert!(matches!(
            PHMMModel::new(&short, &pm, &tm, ModelType::Anchored),
            Err(Error::WindowTooShort { len: 3, k: 4 })
        ));

        let unknown: ReferenceWindow = "ACGN".parse().unwrap();
        match PHMMModel::new(&unknown, &pm, &tm, ModelType::Anchored) {
            Err(Error::UnresolvedKmer(kmer)) => assert_eq!(kmer, "ACGN"),
            r => panic!("unexpected {:?}", r.map(|m| m.n_nodes())),
        }
    }
    #[test]
    fn phmm_single_position() {
        let window: ReferenceWindow = "ACGT".parse().unwrap();
        let pm = mock_pore_model();
        let tm = TransitionMatrix::uniform(1, TransProb::default()).unwrap();
        for t in &[ModelType::Anchored, ModelType::Unanchored] {
            let phmm = PHMMModel::new(&window, &pm, &tm, *t).unwrap();
            assert_eq!(phmm.n_nodes(), 1);
            assert_eq!(phmm.n_edges(), 1);
            assert_eq!(phmm.min_observations(), 1);
            assert!(phmm.node(NodeIndex::new(0)).init_prob.is_one());
        }
    }
}
