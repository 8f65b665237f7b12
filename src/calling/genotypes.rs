// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::io::Write;

use anyhow::Result;
use bio::stats::LogProb;
use itertools::Itertools;
use progress_logger::ProgressLogger;

use crate::calling::report::{confidence_score, PositionReport, SampleReport};
use crate::constants::{DEFAULT_HETEROZYGOSITY, DEFAULT_PLOIDY, MAX_CONFIDENCE_SCORE};
use crate::errors::Error;
use crate::observations::{AlleleBatch, AlleleSource};
use crate::variants::allele::CandidateAlleles;
use crate::variants::evidence::pileup::Pileup;
use crate::variants::genotype::GenotypeUniverse;
use crate::variants::model::posterior::{independent_posteriors, uniform};
use crate::variants::model::{
    GenotypeLikelihoodModel, GenotypeProbability, JointGenotyper, PopulationPrior,
};
use crate::variants::sample::SampleGroups;

/// How the samples of a position are genotyped.
#[derive(Debug, Clone, PartialEq)]
pub enum GenotypingMode {
    /// Each sample on its own, by self-normalized likelihoods.
    Independent,
    /// All samples jointly, under a population prior.
    Joint {
        dominant: usize,
        max_combinations: usize,
        heterozygosity: f64,
    },
}

impl Default for GenotypingMode {
    fn default() -> Self {
        GenotypingMode::Independent
    }
}

impl GenotypingMode {
    pub fn joint() -> Self {
        GenotypingMode::Joint {
            dominant: 3,
            max_combinations: 100_000,
            heterozygosity: DEFAULT_HETEROZYGOSITY,
        }
    }
}

#[derive(Debug, Clone, Builder, Getters, CopyGetters)]
pub struct GenotypingParams {
    #[builder(default = "DEFAULT_PLOIDY")]
    #[getset(get_copy = "pub")]
    ploidy: u32,
    #[builder(default)]
    #[getset(get = "pub")]
    candidates: CandidateAlleles,
    #[builder(default)]
    #[getset(get = "pub")]
    mode: GenotypingMode,
    #[builder(default = "MAX_CONFIDENCE_SCORE")]
    #[getset(get_copy = "pub")]
    max_score: f64,
    /// Report only this many genotypes per sample, the most probable first.
    #[builder(default)]
    #[getset(get_copy = "pub")]
    max_genotypes: Option<usize>,
    /// Report registered samples without observations at a covered position.
    #[builder(default)]
    #[getset(get_copy = "pub")]
    report_all_samples: bool,
    #[builder(default)]
    #[getset(get_copy = "pub")]
    log_each_position: bool,
}

/// Per-sample observations of one position.
struct SampleObservations<'a> {
    name: &'a str,
    coverage: usize,
    likelihoods: Vec<LogProb>,
}

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct Caller<S, W>
where
    S: AlleleSource,
    W: Write,
{
    source: S,
    output: W,
    params: GenotypingParams,
}

impl<S, W> Caller<S, W>
where
    S: AlleleSource,
    W: Write,
{
    pub fn call(&mut self) -> Result<()> {
        let universe =
            GenotypeUniverse::new(self.params.ploidy(), self.params.candidates().clone())?;
        let joint = match self.params.mode() {
            GenotypingMode::Independent => None,
            GenotypingMode::Joint {
                dominant,
                max_combinations,
                heterozygosity,
            } => Some(JointGenotyper::new(
                PopulationPrior::new(*heterozygosity, &universe)?,
                *dominant,
                *max_combinations,
            )?),
        };
        info!(
            "Genotyping {} candidate genotypes per sample (ploidy {}, candidates {}).",
            universe.len(),
            universe.ploidy(),
            self.params.candidates()
        );

        let mut batch = AlleleBatch::default();
        let mut progress_logger = ProgressLogger::builder()
            .with_items_name("positions")
            .with_frequency(std::time::Duration::from_secs(20))
            .start();
        while self.source.next_position(&mut batch)? {
            if self.params.log_each_position() {
                info!(
                    "Processing position {}:{}",
                    batch.contig(),
                    batch.pos() + 1
                );
            }
            if let Some(report) = self.genotype_position(&batch, &universe, joint.as_ref()) {
                report.write(&mut self.output)?;
            }
            progress_logger.update(1u64);
        }
        progress_logger.stop();
        Ok(())
    }

    /// Genotype all samples of the given position. Returns `None` if there is no
    /// usable observation.
    fn genotype_position(
        &self,
        batch: &AlleleBatch,
        universe: &GenotypeUniverse,
        joint: Option<&JointGenotyper>,
    ) -> Option<PositionReport> {
        let samples = self.source.samples();
        let mut groups = SampleGroups::group(batch.alleles(), samples);
        if groups.n_rejected() > 0 {
            debug!(
                "Rejected {} alleles at {}:{}.",
                groups.n_rejected(),
                batch.contig(),
                batch.pos() + 1
            );
        }
        if groups.coverage() == 0 {
            debug!(
                "No usable observations at {}:{}, skipping.",
                batch.contig(),
                batch.pos() + 1
            );
            return None;
        }
        if self.params.report_all_samples() {
            groups.include_all(samples);
        }

        let likelihood_model = GenotypeLikelihoodModel::new();
        let observations = groups
            .iter()
            .map(|(name, alleles)| {
                let pileup = Pileup::new(alleles, universe.candidates());
                SampleObservations {
                    name,
                    coverage: pileup.depth(),
                    likelihoods: likelihood_model.genotype_likelihoods(universe, &pileup),
                }
            })
            .collect_vec();

        let (posteriors, prob_variant) = match joint {
            None => (
                observations
                    .iter()
                    .map(|sample| self.independent(universe, sample, batch))
                    .collect_vec(),
                None,
            ),
            Some(joint) => self.joint(universe, joint, &observations, batch),
        };

        let mut report = PositionReport::new(batch.contig(), batch.pos());
        for (sample, posteriors) in observations.iter().zip(posteriors) {
            report.insert(
                sample.name,
                SampleReport::new(
                    universe,
                    &posteriors,
                    sample.coverage,
                    self.params.max_score(),
                    self.params.max_genotypes(),
                ),
            );
        }
        if let Some(prob_variant) = prob_variant {
            report.set_variant(confidence_score(
                prob_variant.ln_one_minus_exp(),
                self.params.max_score(),
            ));
        }
        Some(report)
    }

    fn independent(
        &self,
        universe: &GenotypeUniverse,
        sample: &SampleObservations,
        batch: &AlleleBatch,
    ) -> Vec<GenotypeProbability> {
        independent_posteriors(universe, &sample.likelihoods).unwrap_or_else(|e| {
            warn!(
                "Sample {} at {}:{}: {}, using uniform distribution.",
                sample.name,
                batch.contig(),
                batch.pos() + 1,
                e
            );
            uniform(universe.len())
        })
    }

    /// Jointly genotype all samples with informative observations. Samples without
    /// observations, or for which every genotype is impossible, get a uniform
    /// distribution and do not take part in the joint model.
    fn joint(
        &self,
        universe: &GenotypeUniverse,
        joint: &JointGenotyper,
        observations: &[SampleObservations],
        batch: &AlleleBatch,
    ) -> (Vec<Vec<GenotypeProbability>>, Option<LogProb>) {
        let is_informative = observations
            .iter()
            .map(|sample| {
                if sample.coverage == 0 {
                    return false;
                }
                if LogProb::ln_sum_exp(&sample.likelihoods) == LogProb::ln_zero() {
                    warn!(
                        "Sample {} at {}:{}: {}, using uniform distribution.",
                        sample.name,
                        batch.contig(),
                        batch.pos() + 1,
                        Error::DegenerateDistribution
                    );
                    return false;
                }
                true
            })
            .collect_vec();
        let informative = observations
            .iter()
            .zip(&is_informative)
            .filter(|(_, informative)| **informative)
            .map(|(sample, _)| sample.likelihoods.clone())
            .collect_vec();

        let (mut marginals, prob_variant) = match joint.compute(universe, &informative) {
            Ok(posterior) => (
                posterior.marginals().clone().into_iter(),
                *posterior.prob_variant(),
            ),
            Err(e) => {
                warn!(
                    "Joint genotyping at {}:{}: {}, using uniform distributions.",
                    batch.contig(),
                    batch.pos() + 1,
                    e
                );
                (
                    vec![uniform(universe.len()); informative.len()].into_iter(),
                    None,
                )
            }
        };

        let posteriors = is_informative
            .iter()
            .map(|informative| {
                if *informative {
                    marginals
                        .next()
                        .unwrap_or_else(|| uniform(universe.len()))
                } else {
                    uniform(universe.len())
                }
            })
            .collect();
        (posteriors, prob_variant)
    }
}
