//!
//! Topology variants and transition parameters
//!
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of extra positions at each end of the window where an unanchored read may
/// start or end.
pub const BOUNDARY_SLACK: usize = 2;

/// Tolerance on `stay + step + skip == 1`
const ROW_SUM_TOLERANCE: f64 = 1e-6;

///
/// Topology configuration selected by a model identifier
///
/// | identifier           | max skip | start/end             |
/// |----------------------|----------|-----------------------|
/// | `anchored`           | 1        | first/last position   |
/// | `anchored-wide-skip` | 2        | first/last position   |
/// | `unanchored`         | 1        | first/last `BOUNDARY_SLACK + 1` positions |
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    Anchored,
    AnchoredWideSkip,
    Unanchored,
}

impl ModelType {
    ///
    /// Maximum number of positions jumped over by a single skip transition
    ///
    pub fn max_skip(&self) -> usize {
        match self {
            ModelType::Anchored | ModelType::Unanchored => 1,
            ModelType::AnchoredWideSkip => 2,
        }
    }
    ///
    /// Number of positions at each end (in addition to the first/last one) that can
    /// start/end the path.
    ///
    pub fn boundary_slack(&self) -> usize {
        match self {
            ModelType::Anchored | ModelType::AnchoredWideSkip => 0,
            ModelType::Unanchored => BOUNDARY_SLACK,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::Anchored => "anchored",
            ModelType::AnchoredWideSkip => "anchored-wide-skip",
            ModelType::Unanchored => "unanchored",
        }
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::Anchored
    }
}

impl std::str::FromStr for ModelType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "anchored" => Ok(ModelType::Anchored),
            "anchored-wide-skip" => Ok(ModelType::AnchoredWideSkip),
            "unanchored" => Ok(ModelType::Unanchored),
            _ => Err(Error::UnknownModelType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

///
/// Transition probabilities out of a single match state
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransProb {
    /// `j -> j`
    pub stay: f64,
    /// `j -> j+1`
    pub step: f64,
    /// `j -> j+1+s`, shared evenly by `s = 1..=max_skip`
    pub skip: f64,
}

impl TransProb {
    pub fn new(stay: f64, step: f64, skip: f64) -> Self {
        TransProb { stay, step, skip }
    }
    pub fn sum(&self) -> f64 {
        self.stay + self.step + self.skip
    }
    pub fn to_array(&self) -> [f64; 3] {
        [self.stay, self.step, self.skip]
    }
    pub fn from_array(xs: [f64; 3]) -> Self {
        TransProb::new(xs[0], xs[1], xs[2])
    }
    ///
    /// Scale the counts so that they sum to 1.
    /// All-zero counts are returned unchanged.
    ///
    pub fn normalized(&self) -> Self {
        let s = self.sum();
        if s > 0.0 {
            TransProb::new(self.stay / s, self.step / s, self.skip / s)
        } else {
            *self
        }
    }
    pub fn max_abs_diff(&self, other: &TransProb) -> f64 {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
    fn validate(&self, position: usize) -> Result<()> {
        for x in self.to_array().iter() {
            if !(0.0..=1.0).contains(x) {
                return Err(Error::InvalidTransition {
                    position,
                    reason: format!("probability {} is outside [0, 1]", x),
                });
            }
        }
        if (self.sum() - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(Error::InvalidTransition {
                position,
                reason: format!("row sums to {}", self.sum()),
            });
        }
        Ok(())
    }
}

///
/// stay=0.35, step=0.55, skip=0.10
///
impl Default for TransProb {
    fn default() -> Self {
        TransProb::new(0.35, 0.55, 0.10)
    }
}

impl std::fmt::Display for TransProb {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "stay:{}\tstep:{}\tskip:{}",
            self.stay, self.step, self.skip
        )
    }
}

///
/// One [`TransProb`] row per modelled reference position
///
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMatrix {
    rows: Vec<TransProb>,
}

impl TransitionMatrix {
    ///
    /// Create from rows, checking every row is a probability distribution
    ///
    pub fn new(rows: Vec<TransProb>) -> Result<Self> {
        for (position, row) in rows.iter().enumerate() {
            row.validate(position)?;
        }
        Ok(TransitionMatrix { rows })
    }
    ///
    /// Matrix of `n_positions` copies of `row`
    ///
    pub fn uniform(n_positions: usize, row: TransProb) -> Result<Self> {
        TransitionMatrix::new(vec![row; n_positions])
    }
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
    pub fn row(&self, position: usize) -> &TransProb {
        &self.rows[position]
    }
    pub fn rows(&self) -> &[TransProb] {
        &self.rows
    }
    ///
    /// The largest absolute change of a transition probability
    ///
    pub fn max_abs_diff(&self, other: &TransitionMatrix) -> f64 {
        self.rows
            .iter()
            .zip(other.rows.iter())
            .map(|(a, b)| a.max_abs_diff(b))
            .fold(0.0, f64::max)
    }
}
