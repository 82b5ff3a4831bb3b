//! Ingest of digit samples into the motif store.
//!
//! A sample is text such as `3.14159...`. ASCII digits are grouped in order
//! into motifs of `motif_length` digits; anything else (whitespace, line
//! breaks) is skipped. A leading integer part of at most
//! [`MAX_MOTIF_LENGTH`] digits terminated by the first `.` is discarded, and
//! a trailing group shorter than `motif_length` is dropped.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MotifRecord, MAX_MOTIF_LENGTH};
use crate::domain::ports::MotifStore;

const READ_CHUNK: usize = 64 * 1024;

/// Summary of one ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Motifs inserted, at positions `0..motifs`.
    pub motifs: u64,
    /// Digits consumed after the integer part.
    pub digits_read: u64,
    /// Digits in the dropped incomplete trailing group.
    pub discarded_tail: usize,
}

enum Prefix {
    /// Still inside a possible integer part; holds its digits.
    Scanning(Vec<u8>),
    Done,
}

/// Turns a digit stream into motif records.
struct DigitGrouper {
    motif_length: usize,
    prefix: Prefix,
    value: i64,
    digits_in_group: usize,
    next_position: i64,
    digits_read: u64,
    pending: Vec<MotifRecord>,
}

impl DigitGrouper {
    fn new(motif_length: usize) -> Self {
        Self {
            motif_length,
            prefix: Prefix::Scanning(Vec::new()),
            value: 0,
            digits_in_group: 0,
            next_position: 0,
            digits_read: 0,
            pending: Vec::new(),
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if let Prefix::Scanning(held) = &mut self.prefix {
                match byte {
                    b'.' => {
                        self.prefix = Prefix::Done;
                        continue;
                    }
                    b'0'..=b'9' if held.len() < MAX_MOTIF_LENGTH => {
                        held.push(byte);
                        continue;
                    }
                    _ => self.release_prefix(),
                }
            }
            if byte.is_ascii_digit() {
                self.push_digit(byte);
            }
        }
    }

    /// The held digits were not an integer part after all.
    fn release_prefix(&mut self) {
        if let Prefix::Scanning(held) = std::mem::replace(&mut self.prefix, Prefix::Done) {
            for digit in held {
                self.push_digit(digit);
            }
        }
    }

    fn push_digit(&mut self, digit: u8) {
        self.value = self.value * 10 + i64::from(digit - b'0');
        self.digits_in_group += 1;
        self.digits_read += 1;

        if self.digits_in_group == self.motif_length {
            self.pending.push(MotifRecord::new(self.next_position, self.value));
            self.next_position += 1;
            self.value = 0;
            self.digits_in_group = 0;
        }
    }

    fn take_pending(&mut self) -> Vec<MotifRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Flush held digits at end of input and return the dropped tail length.
    fn finish(&mut self) -> usize {
        self.release_prefix();
        self.digits_in_group
    }
}

/// Loads digit samples into a [`MotifStore`] in batches.
pub struct SampleLoader<S: MotifStore> {
    store: Arc<S>,
    motif_length: usize,
    batch_size: usize,
}

impl<S: MotifStore> SampleLoader<S> {
    pub fn new(store: Arc<S>, motif_length: usize, batch_size: usize) -> DomainResult<Self> {
        if motif_length == 0 || motif_length > MAX_MOTIF_LENGTH {
            return Err(DomainError::ValidationFailed(format!(
                "motif_length must be between 1 and {MAX_MOTIF_LENGTH}, got {motif_length}"
            )));
        }
        if batch_size == 0 {
            return Err(DomainError::ValidationFailed(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            store,
            motif_length,
            batch_size,
        })
    }

    /// Stream a digit file into the store. The store is expected to be empty.
    #[instrument(skip(self), fields(motif_length = self.motif_length))]
    pub async fn load_file(&self, path: &Path) -> DomainResult<LoadReport> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| DomainError::IngestFailed(format!("{}: {e}", path.display())))?;
        self.load_reader(BufReader::new(file)).await
    }

    /// Load digits held in memory. The store is expected to be empty.
    pub async fn load_digits(&self, digits: &str) -> DomainResult<LoadReport> {
        self.load_reader(digits.as_bytes()).await
    }

    async fn load_reader<R: AsyncRead + Unpin>(&self, mut reader: R) -> DomainResult<LoadReport> {
        let mut grouper = DigitGrouper::new(self.motif_length);
        let mut buffer = vec![0u8; READ_CHUNK];
        let mut motifs = 0u64;

        loop {
            let read = reader.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            grouper.feed(&buffer[..read]);
            if grouper.pending.len() >= self.batch_size {
                motifs += self.flush(&mut grouper).await?;
            }
        }

        let discarded_tail = grouper.finish();
        motifs += self.flush(&mut grouper).await?;

        let report = LoadReport {
            motifs,
            digits_read: grouper.digits_read,
            discarded_tail,
        };
        info!(
            motifs = report.motifs,
            digits_read = report.digits_read,
            discarded_tail = report.discarded_tail,
            "sample loaded"
        );
        Ok(report)
    }

    async fn flush(&self, grouper: &mut DigitGrouper) -> DomainResult<u64> {
        let mut inserted = 0;
        let pending = grouper.take_pending();
        for batch in pending.chunks(self.batch_size) {
            inserted += self.store.insert_batch(batch).await?;
            debug!(inserted, "inserted motif batch");
        }
        Ok(inserted)
    }
}
