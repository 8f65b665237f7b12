// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Allele observations from a pileup of indexed BAM files against an indexed reference.

use std::cmp;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bio::io::bed;
use bio_types::genome::{self, AbstractInterval};
use rust_htslib::bam::{self, record::Aux, record::Cigar, Read};

use crate::errors::Error;
use crate::observations::{AlleleBatch, AlleleSource};
use crate::reference;
use crate::variants::allele::{Allele, AlleleKind};
use crate::variants::sample::{SampleId, Samples};

const REFERENCE_BUFFER_CAPACITY: usize = 2;
/// Base quality of reads stored without qualities.
const MISSING_BASE_QUALITY: u8 = 255;

/// Read and base filters applied while piling up.
#[derive(Debug, Clone, Builder, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct PileupParams {
    #[builder(default = "0")]
    min_mapq: u8,
    #[builder(default = "0")]
    min_baseq: u8,
    #[builder(default = "8000")]
    max_depth: u32,
    /// Number of positions loaded at once.
    #[builder(default = "10_000")]
    window: u64,
    /// Keep reads with insertions or deletions in their alignment.
    #[builder(default = "false")]
    keep_indel_reads: bool,
}

impl PileupParams {
    fn is_valid_read(&self, record: &bam::Record) -> bool {
        if record.is_unmapped()
            || record.is_secondary()
            || record.is_supplementary()
            || record.is_quality_check_failed()
            || record.is_duplicate()
            || record.mapq() < self.min_mapq
        {
            return false;
        }
        // indel masking
        self.keep_indel_reads
            || !record
                .cigar()
                .iter()
                .any(|op| matches!(op, Cigar::Ins(_) | Cigar::Del(_)))
    }
}

/// Read target regions from a BED file.
pub fn read_regions<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Vec<genome::Interval>> {
    let mut reader = bed::Reader::from_file(&path)
        .with_context(|| format!("error reading BED file {}", path.as_ref().display()))?;
    let mut regions = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.start() > record.end() {
            return Err(Error::InvalidRegion {
                contig: record.chrom().to_owned(),
                start: record.start(),
                end: record.end(),
            }
            .into());
        }
        regions.push(genome::Interval::new(
            record.chrom().to_owned(),
            record.start()..record.end(),
        ));
    }
    Ok(regions)
}

/// Classify a base call against the reference base.
fn classify_base(base: u8, ref_base: u8) -> (AlleleKind, Vec<u8>) {
    let base = base.to_ascii_uppercase();
    if base == ref_base.to_ascii_uppercase() {
        (AlleleKind::Reference, Vec::new())
    } else {
        match base {
            b'A' | b'C' | b'G' | b'T' => (AlleleKind::Snv, vec![base]),
            _ => (AlleleKind::Ambiguous, vec![base]),
        }
    }
}

struct Input {
    reader: bam::IndexedReader,
    /// Read group ID to sample.
    read_groups: HashMap<String, SampleId>,
    /// Sample name for reads without (known) read group.
    fallback_sample: String,
}

impl Input {
    fn new(path: &Path, samples: &mut Samples) -> Result<Self> {
        let reader = bam::IndexedReader::from_path(path)
            .with_context(|| format!("error reading indexed BAM file {}", path.display()))?;
        let fallback_sample = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::InvalidSampleName {
                path: path.to_owned(),
            })?
            .to_owned();

        let mut read_groups = HashMap::new();
        let header = bam::Header::from_template(reader.header()).to_hashmap();
        for read_group in header.get("RG").into_iter().flatten() {
            if let (Some(id), Some(sample)) = (read_group.get("ID"), read_group.get("SM")) {
                read_groups.insert(id.to_owned(), samples.intern(sample));
            }
        }
        if read_groups.is_empty() {
            debug!(
                "No read groups with sample names in {}, using sample {}.",
                path.display(),
                fallback_sample
            );
            samples.intern(&fallback_sample);
        }

        Ok(Input {
            reader,
            read_groups,
            fallback_sample,
        })
    }
}

fn record_sample(
    record: &bam::Record,
    read_groups: &HashMap<String, SampleId>,
    fallback_sample: &str,
    samples: &mut Samples,
) -> SampleId {
    match record.aux(b"RG") {
        Ok(Aux::String(id)) => match read_groups.get(id) {
            Some(sample) => *sample,
            None => samples.intern(fallback_sample),
        },
        _ => samples.intern(fallback_sample),
    }
}

/// Visits every position of the target regions, piling up all BAM files.
pub struct BamSource {
    inputs: Vec<Input>,
    reference: reference::Buffer,
    params: PileupParams,
    samples: Samples,
    regions: VecDeque<genome::Interval>,
    contig: String,
    /// Position of the first entry of the window.
    pos: u64,
    window: VecDeque<Vec<Allele>>,
}

impl BamSource {
    /// Create a new source. Without target regions, all contigs of the first BAM
    /// file are visited entirely.
    pub fn new<P: AsRef<Path> + std::fmt::Debug>(
        reference: P,
        bams: &[PathBuf],
        regions: Option<Vec<genome::Interval>>,
        params: PileupParams,
    ) -> Result<Self> {
        if bams.is_empty() {
            return Err(Error::EmptyBams.into());
        }
        let mut samples = Samples::default();
        let inputs = bams
            .iter()
            .map(|path| Input::new(path, &mut samples))
            .collect::<Result<Vec<_>>>()?;

        let regions = match regions {
            Some(regions) => regions,
            None => {
                let header = inputs[0].reader.header();
                (0..header.target_count())
                    .map(|tid| {
                        genome::Interval::new(
                            String::from_utf8_lossy(header.tid2name(tid)).into_owned(),
                            0..header.target_len(tid).unwrap_or(0),
                        )
                    })
                    .collect()
            }
        };

        Ok(BamSource {
            inputs,
            reference: reference::Buffer::from_path(reference, REFERENCE_BUFFER_CAPACITY)?,
            params,
            samples,
            regions: regions.into(),
            contig: String::new(),
            pos: 0,
            window: VecDeque::new(),
        })
    }

    /// Pile up the given interval of all BAM files.
    fn load_window(&mut self, contig: &str, start: u64, end: u64) -> Result<()> {
        let ref_seq = self.reference.seq(contig)?;
        if end > ref_seq.len() as u64 {
            return Err(Error::InvalidRegion {
                contig: contig.to_owned(),
                start,
                end,
            }
            .into());
        }

        let mut window = vec![Vec::new(); (end - start) as usize];
        for input in self.inputs.iter_mut() {
            let tid = input
                .reader
                .header()
                .tid(contig.as_bytes())
                .ok_or_else(|| Error::UnknownContig {
                    contig: contig.to_owned(),
                })?;
            input.reader.fetch((tid, start as i64, end as i64))?;

            let mut pileups = input.reader.pileup();
            pileups.set_max_depth(self.params.max_depth());
            for pileup in pileups {
                let pileup = pileup?;
                let pos = pileup.pos() as u64;
                if pos < start || pos >= end {
                    continue;
                }
                let observations = &mut window[(pos - start) as usize];
                for alignment in pileup.alignments() {
                    if alignment.is_del() || alignment.is_refskip() {
                        continue;
                    }
                    let qpos = match alignment.qpos() {
                        Some(qpos) => qpos,
                        None => continue,
                    };
                    let record = alignment.record();
                    if !self.params.is_valid_read(&record) {
                        continue;
                    }
                    let qual = record.qual()[qpos];
                    if qual == MISSING_BASE_QUALITY || qual < self.params.min_baseq() {
                        continue;
                    }
                    let sample = record_sample(
                        &record,
                        &input.read_groups,
                        &input.fallback_sample,
                        &mut self.samples,
                    );
                    let (kind, sequence) = classify_base(record.seq()[qpos], ref_seq[pos as usize]);
                    observations.push(Allele::observed(kind, sequence, qual, sample));
                }
            }
        }

        self.contig.clear();
        self.contig.push_str(contig);
        self.pos = start;
        self.window = window.into();
        Ok(())
    }
}

impl AlleleSource for BamSource {
    fn next_position(&mut self, batch: &mut AlleleBatch) -> Result<bool> {
        loop {
            if let Some(alleles) = self.window.pop_front() {
                batch.reset(&self.contig, self.pos);
                for allele in alleles {
                    batch.push(allele);
                }
                self.pos += 1;
                return Ok(true);
            }

            let region = match self.regions.pop_front() {
                None => return Ok(false),
                Some(region) => region,
            };
            let range = region.range();
            let end = cmp::min(range.start + self.params.window(), range.end);
            if end < range.end {
                self.regions.push_front(genome::Interval::new(
                    region.contig().to_owned(),
                    end..range.end,
                ));
            }
            let start = range.start;
            let contig = region.contig();
            if start < end {
                debug!("Loading window {}:{}-{}.", contig, start + 1, end);
                self.load_window(contig, start, end)?;
            }
        }
    }

    fn samples(&self) -> &Samples {
        &self.samples
    }
}
