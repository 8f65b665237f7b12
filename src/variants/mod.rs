// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

pub mod allele;
pub mod evidence;
pub mod genotype;
pub mod model;
pub mod sample;

pub use allele::{Allele, AlleleKind, CandidateAlleles};
pub use genotype::{Genotype, GenotypeUniverse};
pub use sample::{SampleId, Samples};
