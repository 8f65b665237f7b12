use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("unknown allele kind '{kind}', must be one of reference, snv, insertion, deletion or ambiguous")]
    UnknownAlleleKind { kind: String },
    #[error("observed allele without sample identifier")]
    MissingSampleId,
    #[error("invalid base quality {value}, must be an integer between 0 and 255")]
    InvalidBaseQuality { value: String },
    #[error("allele of kind {kind} cannot be genotyped, only reference and SNV alleles are supported")]
    UnsupportedAlleleKind { kind: String },
    #[error("SNV allele must carry a non-empty sequence")]
    EmptySnvSequence,
    #[error("all genotype likelihoods are zero, the posterior distribution is undefined")]
    DegenerateDistribution,
    #[error("invalid ploidy {ploidy}, must be at least 1")]
    InvalidPloidy { ploidy: u32 },
    #[error("candidate allele {allele} is given more than once")]
    DuplicateCandidateAllele { allele: String },
    #[error("too many candidate alleles ({n}), at most {max} are supported")]
    TooManyCandidateAlleles { n: usize, max: usize },
    #[error("at least one candidate allele must be given")]
    EmptyCandidateAlleles,
    #[error("invalid candidate allele '{value}', use 'ref' or a single base")]
    InvalidCandidateAllele { value: String },
    #[error("invalid heterozygosity {value}, must be in the open interval (0, 1)")]
    InvalidHeterozygosity { value: f64 },
    #[error("number of dominant genotypes must be at least 1")]
    InvalidDominantGenotypes,
    #[error("invalid observation record in line {line}: {msg}")]
    InvalidObservationRecord { line: usize, msg: String },
    #[error("contig {contig} not found in the BAM header")]
    UnknownContig { contig: String },
    #[error("contig {contig} not found in the reference")]
    UnknownReferenceContig { contig: String },
    #[error("invalid target region {contig}:{start}-{end}")]
    InvalidRegion { contig: String, start: u64, end: u64 },
    #[error("at least one BAM file must be provided")]
    EmptyBams,
    #[error("unable to derive a sample name from {path}")]
    InvalidSampleName { path: PathBuf },
}
