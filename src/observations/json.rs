// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Observations given as JSON lines, one reference position per line:
//!
//! ```json
//! {"sequence": "chr1", "position": 100, "alleles": [{"kind": "snv", "sequence": "A", "quality": 30, "sample": "NA12878"}]}
//! ```
//!
//! Positions are 1-based.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::Error;
use crate::observations::{AlleleBatch, AlleleSource};
use crate::variants::allele::{Allele, AlleleKind};
use crate::variants::sample::Samples;

#[derive(Debug, Deserialize)]
struct PositionRecord {
    sequence: String,
    position: u64,
    #[serde(default)]
    alleles: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AlleleRecord {
    kind: String,
    #[serde(default)]
    sequence: String,
    quality: serde_json::Value,
    #[serde(default)]
    sample: Option<String>,
}

pub struct JsonSource<R: BufRead> {
    reader: R,
    buffer: String,
    line: usize,
    samples: Samples,
}

impl JsonSource<Box<dyn BufRead>> {
    /// Read from the given file, or from STDIN if no path is given.
    pub fn from_path(path: Option<&Path>) -> Result<Self> {
        let reader: Box<dyn BufRead> = match path {
            Some(path) => Box::new(io::BufReader::new(fs::File::open(path).with_context(
                || format!("error opening observation file {}", path.display()),
            )?)),
            None => Box::new(io::BufReader::new(io::stdin())),
        };
        Ok(JsonSource::new(reader))
    }
}

impl<R: BufRead> JsonSource<R> {
    pub fn new(reader: R) -> Self {
        JsonSource {
            reader,
            buffer: String::new(),
            line: 0,
            samples: Samples::default(),
        }
    }

    fn parse_allele(&mut self, value: serde_json::Value) -> Result<Allele, Error> {
        let record: AlleleRecord =
            serde_json::from_value(value).map_err(|e| Error::InvalidObservationRecord {
                line: self.line,
                msg: e.to_string(),
            })?;
        let kind = AlleleKind::parse(&record.kind)?;
        let quality = record
            .quality
            .as_u64()
            .filter(|qual| *qual <= u8::MAX as u64)
            .ok_or_else(|| Error::InvalidBaseQuality {
                value: record.quality.to_string(),
            })? as u8;
        let sample = record.sample.ok_or(Error::MissingSampleId)?;
        let sample = self.samples.intern(&sample);
        // reference alleles are identified by their kind alone
        let sequence = match kind {
            AlleleKind::Reference => Vec::new(),
            _ => record.sequence.to_ascii_uppercase().into_bytes(),
        };

        Ok(Allele::observed(kind, sequence, quality, sample))
    }
}

impl<R: BufRead> AlleleSource for JsonSource<R> {
    fn next_position(&mut self, batch: &mut AlleleBatch) -> Result<bool> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line += 1;
            if !self.buffer.trim().is_empty() {
                break;
            }
        }

        let record: PositionRecord =
            serde_json::from_str(&self.buffer).map_err(|e| Error::InvalidObservationRecord {
                line: self.line,
                msg: e.to_string(),
            })?;
        if record.position == 0 {
            return Err(Error::InvalidObservationRecord {
                line: self.line,
                msg: "positions are 1-based".to_owned(),
            }
            .into());
        }

        batch.reset(&record.sequence, record.position - 1);
        for value in record.alleles {
            match self.parse_allele(value) {
                Ok(allele) => batch.push(allele),
                Err(e) => warn!(
                    "Skipping allele at {}:{}: {}",
                    record.sequence, record.position, e
                ),
            }
        }
        Ok(true)
    }

    fn samples(&self) -> &Samples {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(input: &str) -> JsonSource<&[u8]> {
        JsonSource::new(input.as_bytes())
    }

    #[test]
    fn test_next_position() {
        let mut source = source(
            r#"{"sequence": "chr1", "position": 100, "alleles": [{"kind": "snv", "sequence": "a", "quality": 30, "sample": "s1"}, {"kind": "reference", "quality": 20, "sample": "s2"}]}

{"sequence": "chr1", "position": 101, "alleles": []}
"#,
        );
        let mut batch = AlleleBatch::default();

        assert!(source.next_position(&mut batch).unwrap());
        assert_eq!(batch.contig(), "chr1");
        assert_eq!(batch.pos(), 99);
        assert_eq!(batch.alleles().len(), 2);
        assert_eq!(batch.alleles()[0].sequence(), b"A");
        assert_eq!(batch.alleles()[1].kind(), AlleleKind::Reference);
        assert_eq!(source.samples().len(), 2);

        assert!(source.next_position(&mut batch).unwrap());
        assert_eq!(batch.pos(), 100);
        assert!(batch.is_empty());

        assert!(!source.next_position(&mut batch).unwrap());
    }

    #[test]
    fn test_reference_with_base() {
        let mut source = source(
            r#"{"sequence": "chr1", "position": 5, "alleles": [{"kind": "reference", "sequence": "g", "quality": 30, "sample": "s1"}]}"#,
        );
        let mut batch = AlleleBatch::default();
        assert!(source.next_position(&mut batch).unwrap());
        assert_eq!(batch.alleles()[0], Allele::reference());
        assert!(batch.alleles()[0].sequence().is_empty());
    }

    #[test]
    fn test_malformed_alleles() {
        let mut source = source(
            r#"{"sequence": "chr1", "position": 5, "alleles": [{"kind": "foo", "quality": 30, "sample": "s1"}, {"kind": "snv", "sequence": "A", "quality": 300, "sample": "s1"}, {"kind": "snv", "sequence": "A", "quality": 2.5, "sample": "s1"}, {"kind": "snv", "sequence": "A", "quality": 30}, {"kind": "snv", "sequence": "C", "quality": 30, "sample": "s1"}]}"#,
        );
        let mut batch = AlleleBatch::default();
        assert!(source.next_position(&mut batch).unwrap());
        assert_eq!(batch.alleles().len(), 1);
        assert_eq!(batch.alleles()[0].sequence(), b"C");
    }

    #[test]
    fn test_malformed_line() {
        let mut source =
            source("{\"sequence\": \"chr1\", \"position\": 1}\n{\"sequence\": \"chr1\"\n");
        let mut batch = AlleleBatch::default();
        assert!(source.next_position(&mut batch).unwrap());
        let err = source.next_position(&mut batch).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidObservationRecord { line, .. }) => assert_eq!(*line, 2),
            _ => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_zero_position() {
        let mut source = source(r#"{"sequence": "chr1", "position": 0}"#);
        let mut batch = AlleleBatch::default();
        assert!(source.next_position(&mut batch).is_err());
    }
}
