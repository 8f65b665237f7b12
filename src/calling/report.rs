// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-position result records, written as one JSON object per line.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use bio::stats::{LogProb, PHREDProb};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::utils::cap_at_one;
use crate::variants::genotype::GenotypeUniverse;
use crate::variants::model::GenotypeProbability;

/// PHRED scaled confidence for the given error probability. Errors of zero and
/// scores above `max_score` are reported as `max_score`.
pub fn confidence_score(error: LogProb, max_score: f64) -> f64 {
    let score = PHREDProb::from(cap_at_one(error)).abs();
    if score.is_finite() && score <= max_score {
        score
    } else {
        max_score
    }
}

/// Confidence that the genotype with the given posterior is the true one.
pub fn posterior_score(posterior: LogProb, max_score: f64) -> f64 {
    confidence_score(cap_at_one(posterior).ln_one_minus_exp(), max_score)
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct SampleReport {
    #[getset(get_copy = "pub")]
    coverage: usize,
    /// Genotype labels and their scores, in reporting order.
    #[getset(get = "pub")]
    genotypes: Vec<(String, f64)>,
}

impl SampleReport {
    /// Report the given posteriors. With `max_genotypes`, only the most probable
    /// genotypes are kept, ordered by decreasing posterior.
    pub fn new(
        universe: &GenotypeUniverse,
        posteriors: &[GenotypeProbability],
        coverage: usize,
        max_score: f64,
        max_genotypes: Option<usize>,
    ) -> Self {
        let selected = match max_genotypes {
            Some(n) => posteriors
                .iter()
                .sorted_by_key(|p| std::cmp::Reverse(OrderedFloat(*p.prob())))
                .take(n)
                .collect_vec(),
            None => posteriors.iter().collect_vec(),
        };
        SampleReport {
            coverage,
            genotypes: selected
                .into_iter()
                .map(|p| {
                    (
                        universe.get(p.genotype()).label().to_owned(),
                        posterior_score(p.prob(), max_score),
                    )
                })
                .collect(),
        }
    }
}

struct GenotypeScores<'a>(&'a [(String, f64)]);

impl<'a> Serialize for GenotypeScores<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, score) in self.0 {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}

impl Serialize for SampleReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("coverage", &self.coverage)?;
        map.serialize_entry("genotypes", &GenotypeScores(&self.genotypes))?;
        map.end()
    }
}

/// Result record of one position.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
#[getset(get = "pub")]
pub struct PositionReport {
    sequence: String,
    /// 1-based position.
    position: String,
    /// Confidence that any sample carries a non-reference allele (joint mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    variant: Option<f64>,
    samples: BTreeMap<String, SampleReport>,
}

impl PositionReport {
    /// Create a new report. The given position is 0-based.
    pub fn new(sequence: &str, pos: u64) -> Self {
        PositionReport {
            sequence: sequence.to_owned(),
            position: (pos + 1).to_string(),
            variant: None,
            samples: BTreeMap::new(),
        }
    }

    pub fn set_variant(&mut self, score: f64) {
        self.variant = Some(score);
    }

    pub fn insert(&mut self, sample: &str, report: SampleReport) {
        self.samples.insert(sample.to_owned(), report);
    }

    /// Write as a single line and flush.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        serde_json::to_writer(&mut *out, self)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}
