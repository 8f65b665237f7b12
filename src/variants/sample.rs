// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{BTreeMap, HashMap};

use crate::errors::Error;
use crate::variants::allele::Allele;

/// Compact handle of a sample name registered in [`Samples`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(pub usize);

/// Registry of sample names. Observed alleles only carry the id.
#[derive(Debug, Default, Clone)]
pub struct Samples {
    names: Vec<String>,
    index: HashMap<String, SampleId>,
}

impl Samples {
    /// Register the given name (if necessary) and return its id.
    pub fn intern(&mut self, name: &str) -> SampleId {
        if let Some(id) = self.index.get(name) {
            *id
        } else {
            let id = SampleId(self.names.len());
            self.names.push(name.to_owned());
            self.index.insert(name.to_owned(), id);
            id
        }
    }

    pub fn get(&self, name: &str) -> Option<SampleId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: SampleId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Observed alleles of one position, grouped by sample and ordered by sample name.
#[derive(Debug, Default)]
pub struct SampleGroups<'a> {
    inner: BTreeMap<&'a str, Vec<&'a Allele>>,
    n_rejected: usize,
}

impl<'a> SampleGroups<'a> {
    /// Partition the given alleles by sample. Alleles that cannot be genotyped are
    /// skipped and counted, the remaining ones are kept.
    pub fn group(alleles: &'a [Allele], samples: &'a Samples) -> Self {
        let mut groups = SampleGroups::default();
        for allele in alleles {
            if let Err(e) = allele.validate_observation() {
                match e {
                    Error::UnsupportedAlleleKind { .. } => debug!("Skipping allele: {}", e),
                    _ => warn!("Skipping allele: {}", e),
                }
                groups.n_rejected += 1;
                continue;
            }
            let name = allele.sample().and_then(|sample| samples.name(sample));
            if let Some(name) = name {
                groups.inner.entry(name).or_insert_with(Vec::new).push(allele);
            } else {
                warn!("Skipping allele: sample is not registered");
                groups.n_rejected += 1;
            }
        }
        groups
    }

    /// Add all registered samples without observations as empty groups.
    pub fn include_all(&mut self, samples: &'a Samples) {
        for name in samples.names() {
            self.inner.entry(name).or_insert_with(Vec::new);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[&'a Allele])> {
        self.inner
            .iter()
            .map(|(name, alleles)| (*name, alleles.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of alleles that were rejected during grouping.
    pub fn n_rejected(&self) -> usize {
        self.n_rejected
    }

    /// Total number of grouped alleles.
    pub fn coverage(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::allele::AlleleKind;

    #[test]
    fn test_intern() {
        let mut samples = Samples::default();
        let a = samples.intern("a");
        let b = samples.intern("b");
        assert_eq!(samples.intern("a"), a);
        assert_ne!(a, b);
        assert_eq!(samples.name(b), Some("b"));
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_group() {
        let mut samples = Samples::default();
        let b = samples.intern("b");
        let a = samples.intern("a");
        let alleles = vec![
            Allele::observed(AlleleKind::Reference, vec![], 30, b),
            Allele::observed(AlleleKind::Snv, b"A".to_vec(), 30, a),
            Allele::observed(AlleleKind::Deletion, b"A".to_vec(), 30, a),
            Allele::observed(AlleleKind::Reference, vec![], 20, b),
            Allele::snv(b'T'),
        ];
        let groups = SampleGroups::group(&alleles, &samples);
        let grouped: Vec<_> = groups
            .iter()
            .map(|(name, alleles)| (name, alleles.len()))
            .collect();
        assert_eq!(grouped, vec![("a", 1), ("b", 2)]);
        assert_eq!(groups.n_rejected(), 2);
        assert_eq!(groups.coverage(), 3);
    }

    #[test]
    fn test_include_all() {
        let mut samples = Samples::default();
        let a = samples.intern("a");
        samples.intern("c");
        let alleles = vec![Allele::observed(AlleleKind::Reference, vec![], 30, a)];
        let mut groups = SampleGroups::group(&alleles, &samples);
        groups.include_all(&samples);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.iter().nth(1).unwrap().1.len(), 0);
    }
}
