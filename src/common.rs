//!
//! Common types shared across the crate
//!
use crate::error::{Error, Result};

/// A single current measurement (pA, already normalised to the pore model scale).
pub type Signal = f64;

/// Base sequence stored as ASCII bytes
pub type Sequence = Vec<u8>;

/// Convert the sequence bytes into `String`
pub fn sequence_to_string(seq: &[u8]) -> &str {
    std::str::from_utf8(seq).unwrap_or("<non-ascii>")
}

///
/// Reference sequence window in `{A,C,G,T,N}`
///
/// Lowercase bases are upper-cased on construction; any other byte is rejected.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceWindow(Sequence);

impl ReferenceWindow {
    pub fn new(bases: &[u8]) -> Result<Self> {
        let seq = bases
            .iter()
            .enumerate()
            .map(|(pos, &base)| match base {
                b'A' | b'a' => Ok(b'A'),
                b'C' | b'c' => Ok(b'C'),
                b'G' | b'g' => Ok(b'G'),
                b'T' | b't' => Ok(b'T'),
                b'N' | b'n' => Ok(b'N'),
                _ => Err(Error::UnrecognisedBase {
                    base: base as char,
                    pos,
                }),
            })
            .collect::<Result<Sequence>>()?;
        Ok(ReferenceWindow(seq))
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
    ///
    /// Number of k-mer positions `L - k + 1`, i.e. the number of match states.
    ///
    pub fn n_positions(&self, k: usize) -> Result<usize> {
        if k == 0 || self.len() < k {
            Err(Error::WindowTooShort { len: self.len(), k })
        } else {
            Ok(self.len() - k + 1)
        }
    }
    ///
    /// Iterate over the k-mers of the window in reference order
    ///
    pub fn kmers(&self, k: usize) -> impl Iterator<Item = &[u8]> + '_ {
        self.0.windows(k.max(1))
    }
    ///
    /// Sub-window `[start, end)`
    ///
    pub fn slice(&self, start: usize, end: usize) -> ReferenceWindow {
        ReferenceWindow(self.0[start..end].to_vec())
    }
}

impl std::str::FromStr for ReferenceWindow {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        ReferenceWindow::new(s.as_bytes())
    }
}

impl std::fmt::Display for ReferenceWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", sequence_to_string(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_window_sanitize() {
        let w: ReferenceWindow = "acgtN".parse().unwrap();
        assert_eq!(w.as_bytes(), b"ACGTN");
        assert_eq!(w.to_string(), "ACGTN");

        let e = ReferenceWindow::new(b"ACXGT").unwrap_err();
        match e {
            Error::UnrecognisedBase { base, pos } => {
                assert_eq!(base, 'X');
                assert_eq!(pos, 2);
            }
            e => panic!("unexpected error {}", e),
        }
    }
    #[test]
    fn reference_window_positions() {
        let w: ReferenceWindow = "ACGTACGTAC".parse().unwrap();
        assert_eq!(w.n_positions(4).unwrap(), 7);
        assert_eq!(w.n_positions(10).unwrap(), 1);
        assert!(matches!(
            w.n_positions(11),
            Err(Error::WindowTooShort { len: 10, k: 11 })
        ));
        let kmers: Vec<&[u8]> = w.kmers(4).collect();
        assert_eq!(kmers.len(), 7);
        assert_eq!(kmers[0], b"ACGT");
        assert_eq!(kmers[6], b"GTAC");
    }
}
