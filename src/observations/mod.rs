// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Sources of per-position allele observations.

use anyhow::Result;
use bio_types::genome::{self, AbstractLocus};

use crate::variants::allele::Allele;
use crate::variants::sample::Samples;

pub mod bam;
pub mod json;

pub use bam::{BamSource, PileupParams, PileupParamsBuilder};
pub use json::JsonSource;

/// Observed alleles of a single reference position.
///
/// The batch is filled by an [`AlleleSource`] and reused for the next position.
#[derive(Debug, Getters)]
pub struct AlleleBatch {
    /// Contig and 0-based position.
    #[getset(get = "pub")]
    locus: genome::Locus,
    #[getset(get = "pub")]
    alleles: Vec<Allele>,
}

impl Default for AlleleBatch {
    fn default() -> Self {
        AlleleBatch {
            locus: genome::Locus::new(String::new(), 0),
            alleles: Vec::new(),
        }
    }
}

impl AlleleBatch {
    /// Reset the batch to the given locus, keeping the allocated allele buffer.
    pub fn reset(&mut self, contig: &str, pos: u64) {
        self.locus = genome::Locus::new(contig.to_owned(), pos);
        self.alleles.clear();
    }

    pub fn contig(&self) -> &str {
        self.locus.contig()
    }

    pub fn pos(&self) -> u64 {
        self.locus.pos()
    }

    pub fn push(&mut self, allele: Allele) {
        self.alleles.push(allele);
    }

    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }
}

/// A stream of positions with their observed alleles.
pub trait AlleleSource {
    /// Fill the given batch with the next position. Returns `false` once the
    /// stream is exhausted.
    fn next_position(&mut self, batch: &mut AlleleBatch) -> Result<bool>;

    /// Registry of all samples the source has seen so far.
    fn samples(&self) -> &Samples;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::allele::AlleleKind;
    use crate::variants::sample::SampleId;

    #[test]
    fn test_batch_reuse() {
        let mut batch = AlleleBatch::default();
        batch.reset("chr1", 10);
        batch.push(Allele::observed(AlleleKind::Reference, vec![], 30, SampleId(0)));
        assert_eq!(batch.alleles().len(), 1);

        batch.reset("chr2", 3);
        assert!(batch.is_empty());
        assert_eq!(batch.contig(), "chr2");
        assert_eq!(batch.pos(), 3);
    }
}
