// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

/// Diploid organisms.
pub const DEFAULT_PLOIDY: u32 = 2;

/// Candidate allele universe: reference and the four SNV bases, in reporting order.
pub const DEFAULT_CANDIDATES: &str = "ref,A,T,G,C";

/// Confidence reported when the error probability of a genotype vanishes.
pub const MAX_CONFIDENCE_SCORE: f64 = 1000.0;

/// Placeholder quality of synthetic candidate alleles.
pub const CANDIDATE_ALLELE_QUALITY: u8 = 1;

pub const DEFAULT_HETEROZYGOSITY: f64 = 0.001;

/// Candidate sets of genotypes are kept as 64 bit masks.
pub const MAX_CANDIDATE_ALLELES: usize = 64;
