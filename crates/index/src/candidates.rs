use hashbrown::HashMap;

use crate::{codec, IndexError, IndexParams, KvBackend, Signature, TimeWindowedSet};

/// Set of band numbers a candidate collided in. Bands are `u8`, so a
/// fixed 256-bit bitset covers the whole space without allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandSet {
    bits: [u64; 4],
}

impl BandSet {
    pub fn insert(&mut self, band: u8) {
        self.bits[(band >> 6) as usize] |= 1u64 << (band & 63);
    }

    pub fn contains(&self, band: u8) -> bool {
        self.bits[(band >> 6) as usize] & (1u64 << (band & 63)) != 0
    }

    /// Number of bands present; the `collision_bands_count` of a
    /// candidate.
    pub fn count(&self) -> u32 {
        self.bits.iter().map(|word| word.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == [0; 4]
    }
}

/// Inverted index from `(feature, band, bucket)` to the items observed
/// in each time bucket. Each shard is a [`TimeWindowedSet`] keyed by the
/// candidate-set key layout from [`codec`].
pub struct CandidateIndex<'a> {
    store: &'a dyn KvBackend,
    params: &'a IndexParams,
}

impl<'a> CandidateIndex<'a> {
    pub fn new(store: &'a dyn KvBackend, params: &'a IndexParams) -> Self {
        Self { store, params }
    }

    fn shard(&self, feature: &str, band: u8, bucket: u16) -> TimeWindowedSet<impl Fn(i64) -> Vec<u8>> {
        let prefix = codec::candidate_key_prefix(&self.params.scope, feature, band, bucket);
        TimeWindowedSet::new(self.params.window, self.params.retention, move |time_bucket| {
            codec::candidate_key(&prefix, time_bucket)
        })
    }

    /// Record that `item` was observed at `(feature, band, bucket)` in
    /// the time bucket of `timestamp`. Returns the number of newly
    /// added members (0 or 1).
    pub fn insert(
        &self,
        feature: &str,
        band: u8,
        bucket: u16,
        timestamp: i64,
        item: &str,
    ) -> Result<usize, IndexError> {
        self.shard(feature, band, bucket)
            .insert(self.store, timestamp, &[item])
    }

    /// Collect every item that shares at least one `(band, bucket)` with
    /// `signature` inside the current retention window, together with
    /// the set of bands it collided in.
    pub fn query(
        &self,
        feature: &str,
        signature: &Signature,
        timestamp: i64,
    ) -> Result<HashMap<String, BandSet>, IndexError> {
        let mut collisions: HashMap<String, BandSet> = HashMap::new();
        for (band, histogram) in signature.bands() {
            for &bucket in histogram.keys() {
                let members = self
                    .shard(feature, band, bucket)
                    .members(self.store, timestamp)?;
                for item in members.into_keys() {
                    collisions.entry(item).or_default().insert(band);
                }
            }
        }
        Ok(collisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBackend;

    fn params() -> IndexParams {
        IndexParams {
            scope: "s".into(),
            bands: 2,
            window: 60,
            retention: 1,
        }
    }

    fn signature(band1: &[u16], band2: &[u16]) -> Signature {
        let mut sig = Signature::new(2);
        for &bucket in band1 {
            sig.add_count(1, bucket, 1);
        }
        for &bucket in band2 {
            sig.add_count(2, bucket, 1);
        }
        sig
    }

    #[test]
    fn band_set_counts_distinct_bands() {
        let mut bands = BandSet::default();
        assert!(bands.is_empty());
        bands.insert(1);
        bands.insert(1);
        bands.insert(200);
        assert_eq!(bands.count(), 2);
        assert!(bands.contains(200));
        assert!(!bands.contains(2));
    }

    #[test]
    fn query_reports_collision_bands() {
        let backend = InMemoryBackend::new();
        let params = params();
        let index = CandidateIndex::new(&backend, &params);

        index.insert("m", 1, 10, 120, "a").unwrap();
        index.insert("m", 2, 20, 120, "a").unwrap();
        index.insert("m", 1, 10, 120, "b").unwrap();

        let hits = index.query("m", &signature(&[10], &[20]), 120).unwrap();
        assert_eq!(hits.get("a").map(BandSet::count), Some(2));
        assert_eq!(hits.get("b").map(BandSet::count), Some(1));
    }

    #[test]
    fn query_is_scoped_by_feature() {
        let backend = InMemoryBackend::new();
        let params = params();
        let index = CandidateIndex::new(&backend, &params);

        index.insert("m", 1, 10, 120, "a").unwrap();

        let hits = index.query("n", &signature(&[10], &[]), 120).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn query_honors_retention_window() {
        let backend = InMemoryBackend::new();
        let params = params();
        let index = CandidateIndex::new(&backend, &params);

        index.insert("m", 1, 10, 0, "old").unwrap(); // bucket 0
        index.insert("m", 1, 10, 120, "fresh").unwrap(); // bucket 2

        // At timestamp 180 the live window is buckets [2, 3].
        let hits = index.query("m", &signature(&[10], &[]), 180).unwrap();
        assert!(hits.contains_key("fresh"));
        assert!(!hits.contains_key("old"));
    }

    #[test]
    fn repeated_observations_count_once_per_band() {
        let backend = InMemoryBackend::new();
        let params = params();
        let index = CandidateIndex::new(&backend, &params);

        // Same item observed in two consecutive buckets of one shard.
        index.insert("m", 1, 10, 60, "a").unwrap();
        index.insert("m", 1, 10, 120, "a").unwrap();

        let hits = index.query("m", &signature(&[10], &[]), 120).unwrap();
        assert_eq!(hits.get("a").map(BandSet::count), Some(1));
    }
}
