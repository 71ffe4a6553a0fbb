use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bucket-frequency histogram of a single band. Buckets absent from the
/// map denote zero. BTreeMap keeps iteration deterministic, which keeps
/// candidate collection and the wire encoding reproducible.
pub type BandHistogram = BTreeMap<u16, i64>;

/// A multi-band bucket-frequency signature.
///
/// Bands are 1-indexed, `1..=band_count`. The band count is fixed at
/// construction and matches the configured `bands` of the index the
/// signature belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bands: Vec<BandHistogram>,
}

impl Signature {
    /// An all-zero signature with `bands` empty bands.
    pub fn new(bands: u8) -> Self {
        Self {
            bands: vec![BandHistogram::new(); bands as usize],
        }
    }

    /// Build a signature directly from per-band histograms.
    pub fn from_histograms(bands: Vec<BandHistogram>) -> Self {
        Self { bands }
    }

    pub fn band_count(&self) -> u8 {
        self.bands.len() as u8
    }

    /// Histogram of a 1-indexed band, or `None` when out of range.
    pub fn band(&self, band: u8) -> Option<&BandHistogram> {
        if band == 0 {
            return None;
        }
        self.bands.get(band as usize - 1)
    }

    /// Accumulate `count` into `(band, bucket)`. Bands outside
    /// `1..=band_count` are silently ignored; unknown bands in stored
    /// data must not fail decoding.
    pub fn add_count(&mut self, band: u8, bucket: u16, count: i64) {
        if band == 0 || band as usize > self.bands.len() {
            return;
        }
        *self.bands[band as usize - 1].entry(bucket).or_insert(0) += count;
    }

    /// Whether the signature is empty. Band 1 acts as the sentinel: a
    /// signature with no entries in its first band is treated as empty
    /// regardless of the other bands.
    pub fn is_empty(&self) -> bool {
        self.bands.first().map_or(true, |band| band.is_empty())
    }

    /// Iterate bands in order as `(band_number, histogram)` pairs,
    /// band numbers starting at 1.
    pub fn bands(&self) -> impl Iterator<Item = (u8, &BandHistogram)> {
        self.bands
            .iter()
            .enumerate()
            .map(|(idx, hist)| (idx as u8 + 1, hist))
    }

    /// Total number of `(band, bucket)` entries present.
    pub fn entry_count(&self) -> usize {
        self.bands.iter().map(|band| band.len()).sum()
    }
}
