// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use itertools::Itertools;

use crate::errors::Error;
use crate::utils::multichoose;
use crate::variants::allele::{Allele, CandidateAlleles};

/// An unordered multiset of candidate alleles, stored as sorted candidate indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Getters)]
pub struct Genotype {
    #[getset(get = "pub")]
    alleles: Vec<usize>,
    #[getset(get = "pub")]
    label: String,
}

impl Genotype {
    pub fn new(mut alleles: Vec<usize>, candidates: &CandidateAlleles) -> Self {
        alleles.sort_unstable();
        let label = alleles
            .iter()
            .map(|allele| candidates.get(*allele).label())
            .join("/");
        Genotype { alleles, label }
    }

    /// Build a genotype from alleles, irrespective of their order. Returns `None` if
    /// any allele is not a candidate.
    pub fn from_alleles(alleles: &[Allele], candidates: &CandidateAlleles) -> Option<Self> {
        let indices = alleles
            .iter()
            .map(|allele| candidates.index_of(allele))
            .collect::<Option<Vec<_>>>()?;
        Some(Genotype::new(indices, candidates))
    }

    pub fn ploidy(&self) -> usize {
        self.alleles.len()
    }

    /// Number of copies of the given candidate allele.
    pub fn count(&self, allele: usize) -> usize {
        self.alleles.iter().filter(|a| **a == allele).count()
    }

    pub fn is_homozygous(&self) -> bool {
        self.alleles.iter().all_equal()
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// All genotypes of the given ploidy over the candidate alleles. Built once and
/// shared read-only across samples and positions.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct GenotypeUniverse {
    #[getset(get = "pub")]
    candidates: CandidateAlleles,
    #[getset(get_copy = "pub")]
    ploidy: u32,
    #[getset(get = "pub")]
    genotypes: Vec<Genotype>,
}

impl GenotypeUniverse {
    pub fn new(ploidy: u32, candidates: CandidateAlleles) -> Result<Self, Error> {
        if ploidy == 0 {
            return Err(Error::InvalidPloidy { ploidy });
        }
        let indices = (0..candidates.len()).collect_vec();
        let genotypes = multichoose(ploidy as usize, &indices)
            .into_iter()
            .map(|alleles| Genotype::new(alleles, &candidates))
            .collect();
        Ok(GenotypeUniverse {
            candidates,
            ploidy,
            genotypes,
        })
    }

    pub fn len(&self) -> usize {
        self.genotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genotypes.is_empty()
    }

    pub fn get(&self, index: usize) -> &Genotype {
        &self.genotypes[index]
    }

    pub fn index_of(&self, genotype: &Genotype) -> Option<usize> {
        self.genotypes.iter().position(|g| g == genotype)
    }

    /// Index of the homozygous reference genotype, if the reference is a candidate.
    pub fn hom_ref_index(&self) -> Option<usize> {
        let reference = self.candidates.reference_index()?;
        self.genotypes
            .iter()
            .position(|g| g.count(reference) == g.ploidy())
    }
}
