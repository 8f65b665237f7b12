use crate::variants::allele::{Allele, CandidateAlleles};

/// A single base call, reduced to what the likelihood model needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct BaseObservation {
    /// Index of the matching candidate allele, `None` if the call matches no candidate.
    candidate: Option<usize>,
    quality: u8,
}

/// Observations of one sample at one position.
#[derive(Debug, Clone, Default, Getters)]
#[getset(get = "pub")]
pub struct Pileup {
    observations: Vec<BaseObservation>,
}

impl Pileup {
    pub fn new(alleles: &[&Allele], candidates: &CandidateAlleles) -> Self {
        Pileup {
            observations: alleles
                .iter()
                .map(|allele| BaseObservation::new(candidates.index_of(allele), allele.quality()))
                .collect(),
        }
    }

    pub fn from_observations(observations: Vec<BaseObservation>) -> Self {
        Pileup { observations }
    }

    pub fn depth(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::allele::AlleleKind;
    use crate::variants::sample::SampleId;

    #[test]
    fn test_pileup() {
        let candidates: CandidateAlleles = "ref,A".parse().unwrap();
        let alleles = vec![
            Allele::observed(AlleleKind::Snv, b"A".to_vec(), 30, SampleId(0)),
            Allele::observed(AlleleKind::Snv, b"G".to_vec(), 12, SampleId(0)),
            Allele::observed(AlleleKind::Reference, vec![], 40, SampleId(0)),
        ];
        let pileup = Pileup::new(&alleles.iter().collect::<Vec<_>>(), &candidates);
        assert_eq!(pileup.depth(), 3);
        assert_eq!(
            pileup.observations(),
            &vec![
                BaseObservation::new(Some(1), 30),
                BaseObservation::new(None, 12),
                BaseObservation::new(Some(0), 40),
            ]
        );
    }
}
