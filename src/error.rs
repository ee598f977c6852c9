//!
//! Error definitions
//!
//! * Configuration errors abort the whole training/detection call.
//! * DataSufficiency errors abort the training call.
//! * Numerical errors are per read (or per training region); the caller skips the
//!   unit and continues with the rest of the batch.
//!
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transition matrix has {rows} rows but the reference window models {positions} positions")]
    DimensionMismatch { rows: usize, positions: usize },

    #[error("k-mer {0} is not in the emission model")]
    UnresolvedKmer(String),

    #[error("reference window of length {len} is shorter than k={k}")]
    WindowTooShort { len: usize, k: usize },

    #[error("unrecognised model type: {0}")]
    UnknownModelType(String),

    #[error("reference contains an unrecognised base `{base}` at {pos}; must be A, C, G, T or N")]
    UnrecognisedBase { base: char, pos: usize },

    #[error("training region index {index} is out of range (corpus has {n_regions} regions)")]
    InvalidRegionIndex { index: usize, n_regions: usize },

    #[error("invalid transition row at position {position}: {reason}")]
    InvalidTransition { position: usize, reason: String },

    #[error("segment length {segment_length} exceeds the {n_observations} observations given")]
    SegmentTooLong {
        segment_length: usize,
        n_observations: usize,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("not enough training regions: {n_regions} given, at least {min_regions} required")]
    InsufficientData {
        n_regions: usize,
        min_regions: usize,
    },

    #[error("observation sequence is empty")]
    EmptyObservations,

    #[error("observation {index} is not a finite value")]
    NonFiniteObservation { index: usize },

    #[error("{n_observations} observations cannot span the reference window (needs at least {min_observations})")]
    Irreconcilable {
        n_observations: usize,
        min_observations: usize,
    },

    #[error("log-likelihood is not finite ({0})")]
    NonFinite(f64),

    #[error("failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

///
/// Coarse category of an [`Error`]
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DataSufficiency,
    Numerical,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DimensionMismatch { .. }
            | Error::UnresolvedKmer(_)
            | Error::WindowTooShort { .. }
            | Error::UnknownModelType(_)
            | Error::UnrecognisedBase { .. }
            | Error::InvalidRegionIndex { .. }
            | Error::InvalidTransition { .. }
            | Error::SegmentTooLong { .. }
            | Error::Parse { .. }
            | Error::ThreadPool(_) => ErrorKind::Configuration,
            Error::InsufficientData { .. } => ErrorKind::DataSufficiency,
            Error::EmptyObservations
            | Error::NonFiniteObservation { .. }
            | Error::Irreconcilable { .. }
            | Error::NonFinite(_) => ErrorKind::Numerical,
            Error::Io(_) => ErrorKind::Io,
        }
    }
    ///
    /// Failure confined to a single read/region. The batch can continue without it.
    ///
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Numerical
    }
    pub(crate) fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        let e = Error::DimensionMismatch {
            rows: 3,
            positions: 5,
        };
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert!(!e.is_recoverable());
        println!("{}", e);

        let e = Error::InsufficientData {
            n_regions: 1,
            min_regions: 2,
        };
        assert_eq!(e.kind(), ErrorKind::DataSufficiency);
        assert!(!e.is_recoverable());

        let e = Error::NonFinite(f64::NEG_INFINITY);
        assert!(e.is_recoverable());
        assert_eq!(e.to_string(), "log-likelihood is not finite (-inf)");
    }
}
