// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::cmp;

use bio::stats::bayesian::model::Prior;
use bio::stats::LogProb;
use itertools::Itertools;

use crate::errors::Error;
use crate::utils::cap_at_one;
use crate::variants::genotype::GenotypeUniverse;
use crate::variants::model::prior::{FlatPrior, GenotypeCombination, PopulationPrior};

/// Posterior probability of a genotype, given as index into the genotype universe.
#[derive(Debug, Clone, Copy, PartialEq, new, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct GenotypeProbability {
    genotype: usize,
    prob: LogProb,
}

/// Normalize the given probabilities in place, such that they sum up to one.
/// Order is preserved.
///
/// Fails if all probabilities are zero, because then the distribution is undefined.
pub fn normalize(probs: &mut [GenotypeProbability]) -> Result<(), Error> {
    let marginal = LogProb::ln_sum_exp(&probs.iter().map(|p| p.prob).collect_vec());
    if marginal.is_nan() || marginal == LogProb::ln_zero() {
        return Err(Error::DegenerateDistribution);
    }
    for p in probs.iter_mut() {
        p.prob = cap_at_one(p.prob - marginal);
    }
    Ok(())
}

/// Uniform distribution over the first `n` genotypes of the universe.
pub fn uniform(n: usize) -> Vec<GenotypeProbability> {
    let prob = LogProb((1.0 / n as f64).ln());
    (0..n).map(|g| GenotypeProbability::new(g, prob)).collect()
}

/// Posterior distribution of a single sample, obtained by self-normalizing
/// the product of the likelihoods with a flat prior.
pub fn independent_posteriors(
    universe: &GenotypeUniverse,
    likelihoods: &[LogProb],
) -> Result<Vec<GenotypeProbability>, Error> {
    let prior = FlatPrior::new();
    let mut probs = universe
        .genotypes()
        .iter()
        .zip(likelihoods)
        .enumerate()
        .map(|(i, (genotype, likelihood))| {
            GenotypeProbability::new(i, *likelihood + prior.compute(genotype))
        })
        .collect_vec();
    normalize(&mut probs)?;
    Ok(probs)
}

/// Result of joint genotyping of multiple samples.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct JointPosterior {
    /// Marginal genotype posteriors, one distribution per sample.
    marginals: Vec<Vec<GenotypeProbability>>,
    /// Probability that at least one sample carries a non-reference allele.
    /// Undefined if the reference is no candidate.
    prob_variant: Option<LogProb>,
}

/// Joint genotyping of all samples of a position under a population prior.
///
/// Only the `dominant` most likely genotypes of each sample are combined, and the
/// number of combinations is bounded by `max_combinations`.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct JointGenotyper {
    #[getset(get = "pub")]
    prior: PopulationPrior,
    #[getset(get_copy = "pub")]
    dominant: usize,
    #[getset(get_copy = "pub")]
    max_combinations: usize,
}

impl JointGenotyper {
    pub fn new(
        prior: PopulationPrior,
        dominant: usize,
        max_combinations: usize,
    ) -> Result<Self, Error> {
        if dominant == 0 || max_combinations == 0 {
            return Err(Error::InvalidDominantGenotypes);
        }
        Ok(JointGenotyper {
            prior,
            dominant,
            max_combinations,
        })
    }

    /// Number of dominant genotypes per sample such that the number of
    /// combinations does not exceed the bound.
    fn n_dominant(&self, n_genotypes: usize, n_samples: usize) -> usize {
        let mut k = cmp::min(self.dominant, n_genotypes);
        let n_combinations =
            |k: usize| (0..n_samples).try_fold(1usize, |acc, _| acc.checked_mul(k));
        while k > 1 && n_combinations(k).map_or(true, |n| n > self.max_combinations) {
            k -= 1;
        }
        if k < cmp::min(self.dominant, n_genotypes) {
            debug!(
                "Reduced number of dominant genotypes per sample to {} ({} samples).",
                k, n_samples
            );
        }
        k
    }

    /// Genotype (indices) of one sample, ordered by decreasing likelihood.
    fn dominant_genotypes(likelihoods: &[LogProb], k: usize) -> Vec<usize> {
        (0..likelihoods.len())
            .sorted_by(|a, b| {
                likelihoods[*b]
                    .partial_cmp(&likelihoods[*a])
                    .unwrap_or(cmp::Ordering::Equal)
            })
            .take(k)
            .collect()
    }

    /// Calculate marginal posteriors of all samples, given their genotype likelihoods
    /// (one vector per sample, in universe order).
    pub fn compute(
        &self,
        universe: &GenotypeUniverse,
        likelihoods: &[Vec<LogProb>],
    ) -> Result<JointPosterior, Error> {
        let n_genotypes = universe.len();
        if likelihoods.is_empty() {
            return Ok(JointPosterior {
                marginals: Vec::new(),
                prob_variant: None,
            });
        }

        let k = self.n_dominant(n_genotypes, likelihoods.len());
        let dominant = likelihoods
            .iter()
            .map(|sample_likelihoods| Self::dominant_genotypes(sample_likelihoods, k))
            .collect_vec();

        // joint probability of each dominant genotype combination
        let mut combinations: Vec<(GenotypeCombination, LogProb)> = dominant
            .iter()
            .map(|genotypes| genotypes.iter().cloned())
            .multi_cartesian_product()
            .map(|combination| {
                let likelihood: LogProb = combination
                    .iter()
                    .zip(likelihoods)
                    .fold(LogProb::ln_one(), |prob, (g, sample_likelihoods)| {
                        prob + sample_likelihoods[*g]
                    });
                let prob = likelihood + self.prior.compute(&combination);
                (combination, prob)
            })
            .collect();

        let marginal =
            LogProb::ln_sum_exp(&combinations.iter().map(|(_, prob)| *prob).collect_vec());
        if marginal.is_nan() || marginal == LogProb::ln_zero() {
            return Err(Error::DegenerateDistribution);
        }
        for (_, prob) in combinations.iter_mut() {
            *prob = cap_at_one(*prob - marginal);
        }

        let mut summands = vec![vec![Vec::new(); n_genotypes]; likelihoods.len()];
        for (combination, prob) in &combinations {
            for (sample, g) in combination.iter().enumerate() {
                summands[sample][*g].push(*prob);
            }
        }
        let marginals = summands
            .into_iter()
            .map(|sample_summands| {
                sample_summands
                    .into_iter()
                    .enumerate()
                    .map(|(g, probs)| {
                        GenotypeProbability::new(g, cap_at_one(LogProb::ln_sum_exp(&probs)))
                    })
                    .collect_vec()
            })
            .collect_vec();

        let prob_variant = universe.hom_ref_index().map(|hom_ref| {
            let prob_hom_ref = LogProb::ln_sum_exp(
                &combinations
                    .iter()
                    .filter(|(combination, _)| combination.iter().all(|g| *g == hom_ref))
                    .map(|(_, prob)| *prob)
                    .collect_vec(),
            );
            prob_hom_ref.ln_one_minus_exp()
        });

        Ok(JointPosterior {
            marginals,
            prob_variant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::allele::CandidateAlleles;
    use bio::stats::Prob;

    fn universe() -> GenotypeUniverse {
        GenotypeUniverse::new(2, CandidateAlleles::default()).unwrap()
    }

    fn total(probs: &[GenotypeProbability]) -> f64 {
        *Prob::from(LogProb::ln_sum_exp(
            &probs.iter().map(|p| p.prob()).collect_vec(),
        ))
    }

    fn genotyper(universe: &GenotypeUniverse) -> JointGenotyper {
        JointGenotyper::new(PopulationPrior::new(0.001, universe).unwrap(), 3, 100_000).unwrap()
    }

    #[test]
    fn test_normalize() {
        let mut probs = vec![
            GenotypeProbability::new(0, LogProb(-1.0)),
            GenotypeProbability::new(1, LogProb(-2.0)),
            GenotypeProbability::new(2, LogProb(-30.0)),
        ];
        normalize(&mut probs).unwrap();
        assert_relative_eq!(total(&probs), 1.0, epsilon = 1e-9);
        assert!(probs[0].prob() > probs[1].prob());
        assert!(probs[1].prob() > probs[2].prob());
        assert_eq!(probs.iter().map(|p| p.genotype()).collect_vec(), vec![0, 1, 2]);

        let before = probs.clone();
        normalize(&mut probs).unwrap();
        for (a, b) in before.iter().zip(&probs) {
            assert_relative_eq!(*a.prob(), *b.prob(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normalize_degenerate() {
        let mut probs = vec![GenotypeProbability::new(0, LogProb::ln_zero()); 3];
        assert_eq!(normalize(&mut probs), Err(Error::DegenerateDistribution));
    }

    #[test]
    fn test_normalize_tiny() {
        let mut probs = vec![
            GenotypeProbability::new(0, LogProb(-100_000.0)),
            GenotypeProbability::new(1, LogProb(-100_001.0)),
        ];
        normalize(&mut probs).unwrap();
        assert_relative_eq!(total(&probs), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_uniform() {
        let probs = uniform(15);
        assert_eq!(probs.len(), 15);
        assert_relative_eq!(total(&probs), 1.0, epsilon = 1e-9);
        assert_relative_eq!(*Prob::from(probs[7].prob()), 1.0 / 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_independent_posteriors() {
        let universe = universe();
        let mut likelihoods = vec![LogProb(-50.0); universe.len()];
        likelihoods[0] = LogProb(-1.0);
        let probs = independent_posteriors(&universe, &likelihoods).unwrap();
        assert_relative_eq!(total(&probs), 1.0, epsilon = 1e-9);
        assert!(*Prob::from(probs[0].prob()) > 0.99);
    }

    #[test]
    fn test_n_dominant() {
        let universe = universe();
        let genotyper = JointGenotyper::new(
            PopulationPrior::new(0.001, &universe).unwrap(),
            3,
            100,
        )
        .unwrap();
        assert_eq!(genotyper.n_dominant(15, 4), 3);
        assert_eq!(genotyper.n_dominant(15, 5), 2);
        assert_eq!(genotyper.n_dominant(15, 100), 1);
        assert_eq!(genotyper.n_dominant(2, 1), 2);
    }

    #[test]
    fn test_joint_marginals() {
        let universe = universe();
        let genotyper = genotyper(&universe);
        let mut clear_alt = vec![LogProb(-60.0); universe.len()];
        // ref/A
        clear_alt[1] = LogProb(-2.0);
        clear_alt[0] = LogProb(-40.0);
        let mut clear_ref = vec![LogProb(-60.0); universe.len()];
        clear_ref[0] = LogProb(-2.0);
        clear_ref[1] = LogProb(-20.0);

        let posterior = genotyper
            .compute(&universe, &[clear_alt, clear_ref])
            .unwrap();
        assert_eq!(posterior.marginals().len(), 2);
        for marginal in posterior.marginals() {
            assert_eq!(marginal.len(), universe.len());
            assert_relative_eq!(total(marginal), 1.0, epsilon = 1e-9);
        }
        assert!(*Prob::from(posterior.marginals()[0][1].prob()) > 0.99);
        assert!(*Prob::from(posterior.marginals()[1][0].prob()) > 0.99);
        assert!(*Prob::from(posterior.prob_variant().unwrap()) > 0.99);
        // genotypes outside of the dominant set
        assert_eq!(posterior.marginals()[0][14].prob(), LogProb::ln_zero());
    }

    #[test]
    fn test_joint_single_sample_ranking() {
        let universe = universe();
        let genotyper = genotyper(&universe);
        let mut likelihoods = vec![LogProb(-30.0); universe.len()];
        likelihoods[0] = LogProb(-1.0);
        likelihoods[1] = LogProb(-3.0);
        likelihoods[5] = LogProb(-6.0);

        let joint = genotyper.compute(&universe, &[likelihoods.clone()]).unwrap();
        let independent = independent_posteriors(&universe, &likelihoods).unwrap();
        assert!(joint.marginals()[0][0].prob() > joint.marginals()[0][1].prob());
        assert!(joint.marginals()[0][1].prob() > joint.marginals()[0][5].prob());
        assert!(independent[0].prob() > independent[1].prob());
        assert!(independent[1].prob() > independent[5].prob());
        assert!(*Prob::from(joint.prob_variant().unwrap()) < 0.01);
    }

    #[test]
    fn test_joint_no_samples() {
        let universe = universe();
        let posterior = genotyper(&universe).compute(&universe, &[]).unwrap();
        assert!(posterior.marginals().is_empty());
        assert!(posterior.prob_variant().is_none());
    }

    #[test]
    fn test_joint_degenerate() {
        let universe = universe();
        let likelihoods = vec![LogProb::ln_zero(); universe.len()];
        assert_eq!(
            genotyper(&universe).compute(&universe, &[likelihoods]).unwrap_err(),
            Error::DegenerateDistribution
        );
    }
}
