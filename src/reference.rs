use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use bio::io::fasta;
use lru_time_cache::LruCache;

use crate::errors::Error;

/// A lazy buffer for reference sequences.
pub(crate) struct Buffer {
    reader: fasta::IndexedReader<fs::File>,
    sequences: LruCache<String, Rc<Vec<u8>>>,
}

impl Buffer {
    pub(crate) fn from_path<P: AsRef<Path> + std::fmt::Debug>(path: P, capacity: usize) -> Result<Self> {
        let reader = fasta::IndexedReader::from_file(&path).with_context(|| {
            format!(
                "error reading indexed reference {}",
                path.as_ref().display()
            )
        })?;
        Ok(Buffer {
            reader,
            sequences: LruCache::with_capacity(capacity),
        })
    }

    /// Load given contig and return it. This is O(1) if the contig was loaded before.
    pub(crate) fn seq(&mut self, contig: &str) -> Result<Rc<Vec<u8>>> {
        if let Some(sequence) = self.sequences.get(contig) {
            return Ok(Rc::clone(sequence));
        }

        let mut sequence = Vec::new();
        self.reader
            .fetch_all(contig)
            .context(Error::UnknownReferenceContig {
                contig: contig.to_owned(),
            })?;
        self.reader.read(&mut sequence)?;
        let sequence = Rc::new(sequence);
        self.sequences.insert(contig.to_owned(), Rc::clone(&sequence));
        Ok(sequence)
    }
}
