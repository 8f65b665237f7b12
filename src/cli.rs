// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

use crate::calling::{CallerBuilder, GenotypingMode, GenotypingParams, GenotypingParamsBuilder};
use crate::conversion;
use crate::errors;
use crate::observations::bam::read_regions;
use crate::observations::{AlleleSource, BamSource, JsonSource, PileupParamsBuilder};
use crate::variants::allele::CandidateAlleles;

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    name = "genocaller",
    about = "A bayesian genotype caller for pileups of one or more samples.",
    setting = structopt::clap::AppSettings::ColoredHelp
)]
pub enum Genocaller {
    #[structopt(
        name = "call-genotypes",
        about = "Calculate genotype posteriors for each position with observations. \
                 Results are written as one JSON object per position, with genotype \
                 posteriors given as PHRED scaled confidence (i.e. -10 * log10 of the \
                 probability that the genotype is wrong).",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    CallGenotypes {
        #[structopt(subcommand)]
        source: ObservationSource,
    },
    #[structopt(
        name = "decode-phred",
        about = "Decode PHRED-scaled genotype confidences of call-genotypes results \
                 (read from STDIN) into linear posterior probabilities (written to STDOUT).",
        usage = "genocaller decode-phred < results.jsonl > decoded.jsonl",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    DecodePhred {
        #[structopt(short, long, help = "Verbose output.")]
        verbose: bool,
    },
}

#[derive(Debug, StructOpt, Clone)]
pub enum ObservationSource {
    #[structopt(
        name = "observations",
        about = "Genotype allele observations given as JSON lines, one position per line.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Observations {
        #[structopt(
            long,
            parse(from_os_str),
            help = "JSON lines file with allele observations (if omitted, read from STDIN)."
        )]
        input: Option<PathBuf>,
        #[structopt(flatten)]
        genotyping: GenotypingOptions,
    },
    #[structopt(
        name = "bam",
        about = "Genotype each position of the target regions from a pileup of the given BAM files.",
        setting = structopt::clap::AppSettings::ColoredHelp
    )]
    Bam {
        #[structopt(
            long,
            parse(from_os_str),
            help = "FASTA file with reference genome. Has to be indexed with samtools faidx."
        )]
        reference: PathBuf,
        #[structopt(
            long,
            required = true,
            parse(from_os_str),
            help = "Indexed BAM files. Samples are taken from the SM tag of the read groups, \
                    or from the file name if there are none."
        )]
        bams: Vec<PathBuf>,
        #[structopt(
            long,
            parse(from_os_str),
            help = "BED file with target regions (if omitted, all contigs of the first BAM file)."
        )]
        regions: Option<PathBuf>,
        #[structopt(long, default_value = "0", help = "Minimum mapping quality of reads.")]
        min_mapq: u8,
        #[structopt(long, default_value = "0", help = "Minimum base quality of base calls.")]
        min_baseq: u8,
        #[structopt(
            long,
            default_value = "8000",
            help = "Maximum number of reads piled up per position and BAM file."
        )]
        max_depth: u32,
        #[structopt(
            long,
            default_value = "10000",
            help = "Number of positions that are piled up at once."
        )]
        window: u64,
        #[structopt(
            long,
            help = "Do not mask reads with insertions or deletions in their alignment."
        )]
        keep_indel_reads: bool,
        #[structopt(flatten)]
        genotyping: GenotypingOptions,
    },
}

#[derive(Debug, StructOpt, Clone)]
pub struct GenotypingOptions {
    #[structopt(long, default_value = "2", help = "Ploidy of all samples.")]
    ploidy: u32,
    #[structopt(
        long,
        default_value = "ref,A,T,G,C",
        help = "Comma separated candidate alleles: 'ref' for the reference and single bases for SNVs. \
                Genotypes are reported in the order implied by this list."
    )]
    candidates: CandidateAlleles,
    #[structopt(
        long,
        help = "Genotype all samples jointly under a population prior, and report the \
                confidence that the position is variant in any sample."
    )]
    joint: bool,
    #[structopt(
        long,
        default_value = "3",
        help = "Number of most likely genotypes per sample considered in joint mode."
    )]
    dominant_genotypes: usize,
    #[structopt(
        long,
        default_value = "100000",
        help = "Maximum number of genotype combinations considered in joint mode."
    )]
    max_combinations: usize,
    #[structopt(
        long,
        default_value = "0.001",
        help = "Expected heterozygosity of the population (joint mode)."
    )]
    heterozygosity: f64,
    #[structopt(
        long,
        default_value = "1000",
        help = "Confidence reported for genotypes without any remaining uncertainty."
    )]
    max_score: f64,
    #[structopt(
        long,
        help = "Report only this many genotypes per sample, most probable first."
    )]
    max_genotypes: Option<usize>,
    #[structopt(
        long,
        help = "Also report known samples without observations at a position."
    )]
    all_samples: bool,
    #[structopt(long, help = "Log each processed position.")]
    log_each_position: bool,
    #[structopt(
        long,
        parse(from_os_str),
        help = "Output file (if omitted, write to STDOUT)."
    )]
    output: Option<PathBuf>,
    #[structopt(short, long, help = "Verbose output.")]
    verbose: bool,
}

impl GenotypingOptions {
    pub fn params(&self) -> Result<GenotypingParams> {
        let mode = if self.joint {
            if self.dominant_genotypes == 0 || self.max_combinations == 0 {
                return Err(errors::Error::InvalidDominantGenotypes.into());
            }
            if !(self.heterozygosity > 0.0 && self.heterozygosity < 1.0) {
                return Err(errors::Error::InvalidHeterozygosity {
                    value: self.heterozygosity,
                }
                .into());
            }
            GenotypingMode::Joint {
                dominant: self.dominant_genotypes,
                max_combinations: self.max_combinations,
                heterozygosity: self.heterozygosity,
            }
        } else {
            GenotypingMode::Independent
        };
        if self.ploidy == 0 {
            return Err(errors::Error::InvalidPloidy { ploidy: self.ploidy }.into());
        }

        Ok(GenotypingParamsBuilder::default()
            .ploidy(self.ploidy)
            .candidates(self.candidates.clone())
            .mode(mode)
            .max_score(self.max_score)
            .max_genotypes(self.max_genotypes)
            .report_all_samples(self.all_samples)
            .log_each_position(self.log_each_position)
            .build()?)
    }
}

impl Genocaller {
    pub fn verbose(&self) -> bool {
        match self {
            Genocaller::CallGenotypes {
                source: ObservationSource::Observations { genotyping, .. },
            }
            | Genocaller::CallGenotypes {
                source: ObservationSource::Bam { genotyping, .. },
            } => genotyping.verbose,
            Genocaller::DecodePhred { verbose } => *verbose,
        }
    }
}

pub fn run(opt: Genocaller) -> Result<()> {
    match opt {
        Genocaller::CallGenotypes { source } => match source {
            ObservationSource::Observations { input, genotyping } => {
                let source = JsonSource::from_path(input.as_deref())?;
                call_genotypes(source, &genotyping)
            }
            ObservationSource::Bam {
                reference,
                bams,
                regions,
                min_mapq,
                min_baseq,
                max_depth,
                window,
                keep_indel_reads,
                genotyping,
            } => {
                let regions = regions.map(read_regions).transpose()?;
                let params = PileupParamsBuilder::default()
                    .min_mapq(min_mapq)
                    .min_baseq(min_baseq)
                    .max_depth(max_depth)
                    .window(window)
                    .keep_indel_reads(keep_indel_reads)
                    .build()?;
                let source = BamSource::new(&reference, &bams, regions, params)?;
                call_genotypes(source, &genotyping)
            }
        },
        Genocaller::DecodePhred { .. } => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            conversion::decode_phred::decode_phred(stdin.lock(), stdout.lock())
        }
    }
}

fn call_genotypes<S: AlleleSource>(source: S, options: &GenotypingOptions) -> Result<()> {
    let params = options.params()?;
    let output: Box<dyn Write> = match &options.output {
        Some(path) => Box::new(io::BufWriter::new(File::create(path).with_context(|| {
            format!("error creating output file {}", path.display())
        })?)),
        None => Box::new(io::stdout()),
    };

    let mut caller = CallerBuilder::default()
        .source(source)
        .output(output)
        .params(params)
        .build()?;
    caller.call()
}
