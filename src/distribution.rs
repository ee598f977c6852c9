//!
//! Emission distributions
//!
use crate::prob::{lp, Prob};
use serde::{Deserialize, Serialize};

/// Smallest standard deviation used for evaluating or re-estimating a Gaussian.
/// Smaller spreads are floored to this value.
pub const MIN_STDV: f64 = 1e-3;

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

///
/// Normal distribution of the current level emitted by a k-mer
///
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub mean: f64,
    pub stdv: f64,
}

impl Gaussian {
    pub fn new(mean: f64, stdv: f64) -> Self {
        Gaussian { mean, stdv }
    }
    /// the standard deviation actually used in the density
    pub fn floored_stdv(&self) -> f64 {
        if self.stdv.is_nan() || self.stdv < MIN_STDV {
            MIN_STDV
        } else {
            self.stdv
        }
    }
    ///
    /// log density of `x`
    ///
    /// ```text
    /// log N(x; mu, sigma) = -log(sigma) - log(sqrt(2 pi)) - (x - mu)^2 / (2 sigma^2)
    /// ```
    pub fn ln_pdf(&self, x: f64) -> f64 {
        let s = self.floored_stdv();
        let z = (x - self.mean) / s;
        -s.ln() - LN_SQRT_2PI - 0.5 * z * z
    }
    pub fn emission(&self, x: f64) -> Prob {
        lp(self.ln_pdf(x))
    }
    ///
    /// The largest absolute difference of mean and stdv
    ///
    pub fn max_abs_diff(&self, other: &Gaussian) -> f64 {
        (self.mean - other.mean)
            .abs()
            .max((self.stdv - other.stdv).abs())
    }
}

impl std::fmt::Display for Gaussian {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "N({}, {})", self.mean, self.stdv)
    }
}

///
/// Accumulated weighted moments of observations assigned to a Gaussian
///
/// `weight = \sum w`, `sum = \sum w x`, `sum_sq = \sum w x^2`
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GaussianStats {
    pub weight: f64,
    pub sum: f64,
    pub sum_sq: f64,
}

impl GaussianStats {
    pub fn add(&mut self, x: f64, w: f64) {
        self.weight += w;
        self.sum += w * x;
        self.sum_sq += w * x * x;
    }
    ///
    /// Re-estimate the Gaussian with `pseudocount` pseudo-observations drawn from
    /// the prior `prior`.
    ///
    /// Without any weight (no data and no pseudocount) the prior is returned.
    ///
    pub fn estimate(&self, prior: &Gaussian, pseudocount: f64) -> Gaussian {
        let w = self.weight + pseudocount;
        if w <= 0.0 {
            return *prior;
        }
        let s = self.sum + pseudocount * prior.mean;
        let ss = self.sum_sq + pseudocount * (prior.stdv * prior.stdv + prior.mean * prior.mean);
        let mean = s / w;
        let var = (ss / w - mean * mean).max(0.0);
        Gaussian::new(mean, var.sqrt().max(MIN_STDV))
    }
}

impl std::ops::AddAssign<&GaussianStats> for GaussianStats {
    fn add_assign(&mut self, other: &GaussianStats) {
        self.weight += other.weight;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }
}
