// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use bio::stats::{bayesian::model::Likelihood, LogProb};

use crate::variants::evidence::bases::prob_read_allele;
use crate::variants::evidence::pileup::{BaseObservation, Pileup};
use crate::variants::genotype::{Genotype, GenotypeUniverse};

/// Likelihood model for the genotype of a single sample.
///
/// Each base call is an independent draw from one of the genotype's allele copies,
/// chosen uniformly. The call reproduces the drawn allele with probability one minus
/// its error probability, and shows any of the three other bases otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenotypeLikelihoodModel;

impl GenotypeLikelihoodModel {
    /// Create new model.
    pub fn new() -> Self {
        GenotypeLikelihoodModel
    }

    /// Likelihood to observe a base call given the genotype.
    fn likelihood_observation(
        &self,
        genotype: &Genotype,
        observation: &BaseObservation,
    ) -> LogProb {
        let ploidy = genotype.ploidy();
        let n_match = observation
            .candidate()
            .map_or(0, |candidate| genotype.count(candidate));

        let prob_match = || prob_read_allele(true, observation.quality());
        let prob_mismatch = || prob_read_allele(false, observation.quality());

        if n_match == ploidy {
            prob_match()
        } else if n_match == 0 {
            prob_mismatch()
        } else {
            let frac_match = n_match as f64 / ploidy as f64;
            (LogProb(frac_match.ln()) + prob_match())
                .ln_add_exp(LogProb((1.0 - frac_match).ln()) + prob_mismatch())
        }
    }

    /// Likelihoods of all genotypes of the universe, in universe order.
    pub fn genotype_likelihoods(
        &self,
        universe: &GenotypeUniverse,
        pileup: &Pileup,
    ) -> Vec<LogProb> {
        universe
            .genotypes()
            .iter()
            .map(|genotype| self.compute(genotype, pileup, &mut ()))
            .collect()
    }
}

impl Likelihood for GenotypeLikelihoodModel {
    type Event = Genotype;
    type Data = Pileup;

    /// Product of per-call likelihoods (calculated in log space). Without observations,
    /// every genotype has likelihood one.
    fn compute(&self, genotype: &Self::Event, pileup: &Self::Data, _: &mut ()) -> LogProb {
        let likelihood = pileup
            .observations()
            .iter()
            .fold(LogProb::ln_one(), |prob, obs| {
                prob + self.likelihood_observation(genotype, obs)
            });
        assert!(!likelihood.is_nan());
        likelihood
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

    fn pileup(calls: &[(Option<usize>, u8)]) -> Pileup {
        Pileup::from_observations(
            calls
                .iter()
                .map(|(candidate, qual)| BaseObservation::new(*candidate, *qual))
                .collect(),
        )
    }

    #[test]
    fn test_likelihood_observation() {
        let universe = universe();
        let model = GenotypeLikelihoodModel::new();
        // ref/ref, ref/A, A/A
        let (hom_ref, het, hom_alt) = (universe.get(0), universe.get(1), universe.get(5));
        let obs = BaseObservation::new(Some(1), 20);

        assert_relative_eq!(
            *Prob::from(model.likelihood_observation(hom_alt, &obs)),
            0.99,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            *Prob::from(model.likelihood_observation(hom_ref, &obs)),
            0.01 / 3.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            *Prob::from(model.likelihood_observation(het, &obs)),
            0.5 * 0.99 + 0.5 * 0.01 / 3.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_likelihood_pileup() {
        let universe = universe();
        let model = GenotypeLikelihoodModel::new();
        let mut calls = vec![(Some(0), 30); 5];
        calls.extend(vec![(Some(1), 30); 5]);
        let likelihoods = model.genotype_likelihoods(&universe, &pileup(&calls));
        let het = likelihoods[1];
        for (i, lh) in likelihoods.iter().enumerate() {
            if i != 1 {
                assert!(het > *lh);
            }
        }
    }

    #[test]
    fn test_no_observations() {
        let universe = universe();
        let model = GenotypeLikelihoodModel::new();
        let likelihoods = model.genotype_likelihoods(&universe, &Pileup::default());
        assert!(likelihoods.iter().all(|lh| *lh == LogProb::ln_one()));
    }

    #[test]
    fn test_unknown_allele_is_uninformative() {
        let universe = universe();
        let model = GenotypeLikelihoodModel::new();
        let likelihoods = model.genotype_likelihoods(&universe, &pileup(&[(None, 30)]));
        for lh in &likelihoods {
            assert_relative_eq!(**lh, *likelihoods[0]);
        }
    }

    #[test]
    fn test_no_underflow() {
        let universe = universe();
        let model = GenotypeLikelihoodModel::new();
        let likelihoods =
            model.genotype_likelihoods(&universe, &pileup(&vec![(Some(2), 60); 10000]));
        assert!(likelihoods.iter().all(|lh| lh.is_finite()));
        assert!(likelihoods[9] > likelihoods[0]);
    }
}
