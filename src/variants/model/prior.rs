use bio::stats::bayesian::model::Prior;
use bio::stats::LogProb;

use crate::errors::Error;
use crate::utils::stats::harmonic;
use crate::variants::genotype::{Genotype, GenotypeUniverse};

/// A choice of one genotype (index into the genotype universe) per sample.
pub type GenotypeCombination = Vec<usize>;

/// Prior used when every sample is genotyped on its own. Posteriors are then
/// self-normalized likelihoods.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatPrior;

impl FlatPrior {
    pub fn new() -> Self {
        FlatPrior
    }
}

impl Prior for FlatPrior {
    type Event = Genotype;

    fn compute(&self, _: &Self::Event) -> LogProb {
        LogProb::ln_one()
    }
}

/// Population prior over genotype combinations, following the infinite sites model
/// with the given heterozygosity (expected per-site rate of differences between two
/// chromosomes).
#[derive(Debug, Clone)]
pub struct PopulationPrior {
    heterozygosity: LogProb,
    ploidy: u32,
    /// Number of non-reference allele copies of each genotype in the universe.
    alt_copies: Vec<u32>,
    /// Bitmask of the distinct non-reference candidates of each genotype in the universe.
    alt_alleles: Vec<u64>,
}

impl PopulationPrior {
    pub fn new(heterozygosity: f64, universe: &GenotypeUniverse) -> Result<Self, Error> {
        if !(heterozygosity > 0.0 && heterozygosity < 1.0) {
            return Err(Error::InvalidHeterozygosity {
                value: heterozygosity,
            });
        }
        let reference = universe.candidates().reference_index();
        let is_alt = |allele: usize| Some(allele) != reference;

        let alt_copies = universe
            .genotypes()
            .iter()
            .map(|genotype| genotype.alleles().iter().filter(|a| is_alt(**a)).count() as u32)
            .collect();
        // one bit per candidate, the number of candidates is bounded by MAX_CANDIDATE_ALLELES
        let alt_alleles = universe
            .genotypes()
            .iter()
            .map(|genotype| {
                genotype
                    .alleles()
                    .iter()
                    .filter(|a| is_alt(**a))
                    .fold(0u64, |mask, a| mask | (1 << *a))
            })
            .collect();

        Ok(PopulationPrior {
            heterozygosity: LogProb(heterozygosity.ln()),
            ploidy: universe.ploidy(),
            alt_copies,
            alt_alleles,
        })
    }

    /// Prior probability of observing no variation on any of the `n` chromosomes.
    fn prob_no_variation(&self, n: u32) -> LogProb {
        let heterozygosity = self.heterozygosity.exp();
        let prob = 1.0 - heterozygosity * harmonic(n.saturating_sub(1));
        LogProb(prob.max(heterozygosity / n as f64).ln())
    }
}

impl Prior for PopulationPrior {
    type Event = GenotypeCombination;

    fn compute(&self, combination: &Self::Event) -> LogProb {
        if combination.is_empty() {
            return LogProb::ln_one();
        }
        let n = self.ploidy * combination.len() as u32;
        let m: u32 = combination.iter().map(|g| self.alt_copies[*g]).sum();

        if m == 0 {
            self.prob_no_variation(n)
        } else {
            let d = combination
                .iter()
                .fold(0u64, |mask, g| mask | self.alt_alleles[*g])
                .count_ones();
            // m alt copies of the first alt allele, each further distinct alt allele
            // requires another independent mutation
            LogProb(*self.heterozygosity * d as f64 - (m as f64).ln())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::allele::CandidateAlleles;
    use bio::stats::Prob;

    fn prior() -> (PopulationPrior, GenotypeUniverse) {
        let universe = GenotypeUniverse::new(2, CandidateAlleles::default()).unwrap();
        (PopulationPrior::new(0.001, &universe).unwrap(), universe)
    }

    #[test]
    fn test_no_variation() {
        let (prior, _) = prior();
        // two diploid samples: n = 4, H_3 = 11/6
        assert_relative_eq!(
            *Prob::from(prior.compute(&vec![0, 0])),
            1.0 - 0.001 * 11.0 / 6.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_alt_allele() {
        let (prior, _) = prior();
        // ref/A and A/A: three copies of A
        assert_relative_eq!(
            *Prob::from(prior.compute(&vec![1, 5])),
            0.001 / 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_multiple_alt_alleles() {
        let (prior, universe) = prior();
        let a_t = universe
            .genotypes()
            .iter()
            .position(|g| g.label() == "A/T")
            .unwrap();
        assert_relative_eq!(
            *Prob::from(prior.compute(&vec![a_t])),
            0.001 / 2.0 * 0.001,
            epsilon = 1e-12
        );
        assert!(prior.compute(&vec![a_t]) < prior.compute(&vec![5]));
    }

    #[test]
    fn test_rare_variants_less_likely() {
        let (prior, _) = prior();
        assert!(prior.compute(&vec![0, 0]) > prior.compute(&vec![0, 1]));
        // singletons are more frequent than common alleles
        assert!(prior.compute(&vec![0, 1]) > prior.compute(&vec![1, 1]));
    }

    #[test]
    fn test_floor() {
        let universe = GenotypeUniverse::new(2, CandidateAlleles::default()).unwrap();
        let prior = PopulationPrior::new(0.5, &universe).unwrap();
        // 1 - 0.5 * H_9 is negative, hence floored at theta / n
        assert_relative_eq!(
            *Prob::from(prior.compute(&vec![0; 5])),
            0.05,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_invalid_heterozygosity() {
        let universe = GenotypeUniverse::new(2, CandidateAlleles::default()).unwrap();
        assert_eq!(
            PopulationPrior::new(1.0, &universe).unwrap_err(),
            Error::InvalidHeterozygosity { value: 1.0 }
        );
        assert!(PopulationPrior::new(0.0, &universe).is_err());
    }

    #[test]
    fn test_flat_prior() {
        let universe = GenotypeUniverse::new(2, CandidateAlleles::default()).unwrap();
        assert_eq!(FlatPrior::new().compute(universe.get(3)), LogProb::ln_one());
    }
}
