// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use itertools::Itertools;
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::constants::{CANDIDATE_ALLELE_QUALITY, MAX_CANDIDATE_ALLELES};
use crate::errors::Error;
use crate::variants::sample::SampleId;

#[derive(
    Display, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, IntoStaticStr,
)]
pub enum AlleleKind {
    #[strum(to_string = "reference", serialize = "ref")]
    Reference,
    #[strum(to_string = "snv", serialize = "snp")]
    Snv,
    #[strum(to_string = "insertion", serialize = "ins")]
    Insertion,
    #[strum(to_string = "deletion", serialize = "del")]
    Deletion,
    #[strum(to_string = "ambiguous")]
    Ambiguous,
}

impl AlleleKind {
    /// Parse a kind as delivered by upstream collaborators (case insensitive).
    pub fn parse(kind: &str) -> Result<Self, Error> {
        AlleleKind::from_str(&kind.to_ascii_lowercase()).map_err(|_| Error::UnknownAlleleKind {
            kind: kind.to_owned(),
        })
    }

    /// Only reference and SNV alleles take part in genotyping.
    pub fn is_genotypable(&self) -> bool {
        matches!(self, AlleleKind::Reference | AlleleKind::Snv)
    }
}

/// An observed base call or a synthetic candidate allele.
///
/// Identity is defined by kind and sequence only. Quality and sample are observational
/// metadata and do not take part in comparisons.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Allele {
    #[getset(get_copy = "pub")]
    kind: AlleleKind,
    #[getset(get = "pub")]
    sequence: Vec<u8>,
    #[getset(get_copy = "pub")]
    quality: u8,
    #[getset(get_copy = "pub")]
    sample: Option<SampleId>,
}

impl Allele {
    /// Allele observed in a read at the current position.
    pub fn observed(kind: AlleleKind, sequence: Vec<u8>, quality: u8, sample: SampleId) -> Self {
        Allele {
            kind,
            sequence,
            quality,
            sample: Some(sample),
        }
    }

    /// Allele of the genotype universe.
    pub fn candidate(kind: AlleleKind, sequence: Vec<u8>) -> Self {
        Allele {
            kind,
            sequence,
            quality: CANDIDATE_ALLELE_QUALITY,
            sample: None,
        }
    }

    pub fn reference() -> Self {
        Allele::candidate(AlleleKind::Reference, Vec::new())
    }

    pub fn snv(base: u8) -> Self {
        Allele::candidate(AlleleKind::Snv, vec![base.to_ascii_uppercase()])
    }

    /// Check that an observed allele can enter likelihood computation.
    pub fn validate_observation(&self) -> Result<(), Error> {
        if !self.kind.is_genotypable() {
            return Err(Error::UnsupportedAlleleKind {
                kind: self.kind.to_string(),
            });
        }
        if self.kind == AlleleKind::Snv && self.sequence.is_empty() {
            return Err(Error::EmptySnvSequence);
        }
        if self.sample.is_none() {
            return Err(Error::MissingSampleId);
        }
        Ok(())
    }

    /// Human readable representation used in genotype labels.
    pub fn label(&self) -> String {
        match self.kind {
            AlleleKind::Reference => "ref".to_owned(),
            _ => String::from_utf8_lossy(&self.sequence).into_owned(),
        }
    }
}

impl PartialEq for Allele {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.sequence == other.sequence
    }
}

impl Eq for Allele {}

impl Hash for Allele {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.sequence.hash(state);
    }
}

impl Ord for Allele {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.kind.cmp(&other.kind) {
            Ordering::Equal => self.sequence.cmp(&other.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for Allele {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The fixed universe of alleles genotypes are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAlleles {
    inner: Vec<Allele>,
}

impl CandidateAlleles {
    pub fn new(alleles: Vec<Allele>) -> Result<Self, Error> {
        if alleles.is_empty() {
            return Err(Error::EmptyCandidateAlleles);
        }
        if alleles.len() > MAX_CANDIDATE_ALLELES {
            return Err(Error::TooManyCandidateAlleles {
                n: alleles.len(),
                max: MAX_CANDIDATE_ALLELES,
            });
        }
        for (i, allele) in alleles.iter().enumerate() {
            if !allele.kind().is_genotypable() {
                return Err(Error::UnsupportedAlleleKind {
                    kind: allele.kind().to_string(),
                });
            }
            if alleles[..i].contains(allele) {
                return Err(Error::DuplicateCandidateAllele {
                    allele: allele.label(),
                });
            }
        }
        Ok(CandidateAlleles { inner: alleles })
    }

    /// Index of the candidate matching the given (observed) allele.
    pub fn index_of(&self, allele: &Allele) -> Option<usize> {
        self.inner.iter().position(|candidate| candidate == allele)
    }

    pub fn reference_index(&self) -> Option<usize> {
        self.inner
            .iter()
            .position(|candidate| candidate.kind() == AlleleKind::Reference)
    }

    pub fn get(&self, index: usize) -> &Allele {
        &self.inner[index]
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allele> {
        self.inner.iter()
    }
}

impl Default for CandidateAlleles {
    fn default() -> Self {
        CandidateAlleles {
            inner: vec![
                Allele::reference(),
                Allele::snv(b'A'),
                Allele::snv(b'T'),
                Allele::snv(b'G'),
                Allele::snv(b'C'),
            ],
        }
    }
}

impl FromStr for CandidateAlleles {
    type Err = Error;

    /// Parse a comma separated list like `ref,A,T,G,C`.
    fn from_str(s: &str) -> Result<Self, Error> {
        let alleles = s
            .split(',')
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(|item| match item.to_ascii_lowercase().as_str() {
                "ref" | "reference" => Ok(Allele::reference()),
                base if base.len() == 1 && b"acgt".contains(&base.as_bytes()[0]) => {
                    Ok(Allele::snv(base.as_bytes()[0]))
                }
                _ => Err(Error::InvalidCandidateAllele {
                    value: item.to_owned(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        CandidateAlleles::new(alleles)
    }
}

impl fmt::Display for CandidateAlleles {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner.iter().map(Allele::label).join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CANDIDATES;

    #[test]
    fn test_identity_ignores_quality_and_sample() {
        let a = Allele::observed(AlleleKind::Snv, b"A".to_vec(), 30, SampleId(0));
        let b = Allele::observed(AlleleKind::Snv, b"A".to_vec(), 10, SampleId(3));
        assert_eq!(a, b);
        assert_eq!(a, Allele::snv(b'A'));
        assert_ne!(a, Allele::snv(b'T'));
        assert_ne!(Allele::reference(), Allele::snv(b'A'));
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(AlleleKind::parse("reference").unwrap(), AlleleKind::Reference);
        assert_eq!(AlleleKind::parse("SNV").unwrap(), AlleleKind::Snv);
        assert_eq!(AlleleKind::parse("del").unwrap(), AlleleKind::Deletion);
        assert_eq!(
            AlleleKind::parse("complex"),
            Err(Error::UnknownAlleleKind {
                kind: "complex".to_owned()
            })
        );
    }

    #[test]
    fn test_validate_observation() {
        let indel = Allele::observed(AlleleKind::Insertion, b"AC".to_vec(), 30, SampleId(0));
        assert!(indel.validate_observation().is_err());
        let unowned = Allele::snv(b'G');
        assert_eq!(
            unowned.validate_observation(),
            Err(Error::MissingSampleId)
        );
        let ok = Allele::observed(AlleleKind::Reference, vec![], 30, SampleId(0));
        assert!(ok.validate_observation().is_ok());
    }

    #[test]
    fn test_default_candidates() {
        let candidates = CandidateAlleles::default();
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates.reference_index(), Some(0));
        assert_eq!(candidates.to_string(), DEFAULT_CANDIDATES);
        assert_eq!(
            DEFAULT_CANDIDATES.parse::<CandidateAlleles>().unwrap(),
            candidates
        );
        let observed = Allele::observed(AlleleKind::Snv, b"G".to_vec(), 20, SampleId(1));
        assert_eq!(candidates.index_of(&observed), Some(3));
    }

    #[test]
    fn test_invalid_candidates() {
        assert!("ref,A,A".parse::<CandidateAlleles>().is_err());
        assert!("ref,N".parse::<CandidateAlleles>().is_err());
        assert_eq!("".parse::<CandidateAlleles>(), Err(Error::EmptyCandidateAlleles));

        let many = (0..=MAX_CANDIDATE_ALLELES)
            .map(|i| Allele::candidate(AlleleKind::Snv, format!("A{}", i).into_bytes()))
            .collect_vec();
        assert_eq!(
            CandidateAlleles::new(many),
            Err(Error::TooManyCandidateAlleles {
                n: MAX_CANDIDATE_ALLELES + 1,
                max: MAX_CANDIDATE_ALLELES
            })
        );
    }
}
