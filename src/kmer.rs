//!
//! k-mer emission model (pore model)
//!
//! Maps each k-mer to the Gaussian of the current level observed while the k-mer
//! occupies the pore.
//!
use crate::common::sequence_to_string;
use crate::distribution::Gaussian;
use crate::error::{Error, Result};
use fnv::FnvHashMap as HashMap;
use itertools::Itertools;

pub type Kmer = Vec<u8>;

#[derive(Clone, Debug, PartialEq)]
pub struct PoreModel {
    k: usize,
    emissions: HashMap<Kmer, Gaussian>,
}

impl PoreModel {
    ///
    /// Create an empty model for k-mers of length `k`
    ///
    pub fn new(k: usize) -> Self {
        PoreModel {
            k,
            emissions: HashMap::default(),
        }
    }
    ///
    /// Create a model from `(kmer, mean, stdv)` triples.
    /// All k-mers must have the same length.
    ///
    pub fn from_entries<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64, f64)>,
    {
        let mut model: Option<PoreModel> = None;
        for (i, (kmer, mean, stdv)) in entries.into_iter().enumerate() {
            let m = model.get_or_insert_with(|| PoreModel::new(kmer.len()));
            if kmer.len() != m.k() {
                return Err(Error::parse(
                    i + 1,
                    format!("k-mer {} does not have length k={}", kmer, m.k()),
                ));
            }
            m.insert(kmer.as_bytes(), Gaussian::new(mean, stdv))?;
        }
        model.ok_or_else(|| Error::parse(0, "emission model has no k-mers"))
    }
    pub fn k(&self) -> usize {
        self.k
    }
    pub fn len(&self) -> usize {
        self.emissions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }
    ///
    /// Add (or overwrite) the emission of a k-mer
    ///
    pub fn insert(&mut self, kmer: &[u8], emission: Gaussian) -> Result<()> {
        if kmer.len() != self.k {
            return Err(Error::parse(
                0,
                format!(
                    "k-mer {} has length {} but the model has k={}",
                    sequence_to_string(kmer),
                    kmer.len(),
                    self.k
                ),
            ));
        }
        self.emissions.insert(kmer.to_vec(), emission);
        Ok(())
    }
    ///
    /// Emission of the k-mer. A missing k-mer is an error.
    ///
    pub fn get(&self, kmer: &[u8]) -> Result<&Gaussian> {
        self.emissions
            .get(kmer)
            .ok_or_else(|| Error::UnresolvedKmer(sequence_to_string(kmer).to_string()))
    }
    pub fn contains(&self, kmer: &[u8]) -> bool {
        self.emissions.contains_key(kmer)
    }
    ///
    /// Iterate `(kmer, emission)` in lexicographic order of k-mers
    ///
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Gaussian)> + '_ {
        self.emissions
            .iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(kmer, g)| (kmer.as_slice(), g))
    }
    ///
    /// The largest absolute change of mean/stdv over k-mers present in both models.
    ///
    pub fn max_abs_diff(&self, other: &PoreModel) -> f64 {
        self.emissions
            .iter()
            .filter_map(|(kmer, g)| other.emissions.get(kmer).map(|h| g.max_abs_diff(h)))
            .fold(0.0, f64::max)
    }
    ///
    /// Copy of this model with every mean shifted by `delta`
    ///
    pub fn shifted(&self, delta: f64) -> PoreModel {
        PoreModel {
            k: self.k,
            emissions: self
                .emissions
                .iter()
                .map(|(kmer, g)| (kmer.clone(), Gaussian::new(g.mean + delta, g.stdv)))
                .collect(),
        }
    }
}

impl std::fmt::Display for PoreModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (kmer, g) in self.iter() {
            writeln!(f, "{}\t{}", sequence_to_string(kmer), g)?;
        }
        Ok(())
    }
}
