//! stats.rs
//!
//! Small numerical helpers shared by prior and reporting code.

use bio::stats::{PHREDProb, Prob};

/// Convert PHRED-scaled probability to linear probability.
pub(crate) fn phred_to_prob(phred: f64) -> f64 {
    *Prob::from(PHREDProb(phred))
}

/// Harmonic number H_n = 1 + 1/2 + ... + 1/n (H_0 = 0).
pub(crate) fn harmonic(n: u32) -> f64 {
    (1..=n).map(|i| 1.0 / i as f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phred_to_prob() {
        assert_relative_eq!(phred_to_prob(20.0), 0.01, epsilon = 1e-12);
        assert_relative_eq!(phred_to_prob(0.0), 1.0);
    }

    #[test]
    fn test_harmonic() {
        assert_relative_eq!(harmonic(0), 0.0);
        assert_relative_eq!(harmonic(3), 1.0 + 0.5 + 1.0 / 3.0);
    }
}
