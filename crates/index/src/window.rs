use hashbrown::HashMap;

use crate::{IndexError, KvBackend};

/// A logical set whose membership is partitioned into time buckets and
/// read across a retention window.
///
/// `key_for_bucket` maps a time bucket to the storage key of that
/// bucket's set; the caller decides the key layout. Writes land in the
/// bucket of the write timestamp and stamp an absolute expiry one full
/// retention span past the bucket, so stale buckets fall off by TTL
/// without any bookkeeping.
pub struct TimeWindowedSet<F>
where
    F: Fn(i64) -> Vec<u8>,
{
    window: i64,
    retention: i64,
    key_for_bucket: F,
}

impl<F> TimeWindowedSet<F>
where
    F: Fn(i64) -> Vec<u8>,
{
    pub fn new(window: i64, retention: i64, key_for_bucket: F) -> Self {
        Self {
            window,
            retention,
            key_for_bucket,
        }
    }

    /// The time bucket a timestamp falls into: `floor(timestamp / window)`.
    pub fn time_bucket(&self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.window)
    }

    /// Add `members` to the set of the bucket containing `timestamp`.
    /// When at least one member is new, the bucket's expiry is pushed to
    /// `(bucket + 1 + retention) * window`. Returns the number of newly
    /// added members.
    pub fn insert(
        &self,
        store: &dyn KvBackend,
        timestamp: i64,
        members: &[&str],
    ) -> Result<usize, IndexError> {
        let bucket = self.time_bucket(timestamp);
        let key = (self.key_for_bucket)(bucket);
        let raw: Vec<&[u8]> = members.iter().map(|member| member.as_bytes()).collect();
        let added = store.sadd(&key, &raw)?;
        if added > 0 {
            store.expireat(&key, (bucket + 1 + self.retention) * self.window)?;
        }
        Ok(added)
    }

    /// Union of the sets in `[current - retention, current]`, returned
    /// as member → number of time buckets the member appeared in.
    /// Missing buckets contribute nothing.
    pub fn members(
        &self,
        store: &dyn KvBackend,
        timestamp: i64,
    ) -> Result<HashMap<String, u32>, IndexError> {
        let current = self.time_bucket(timestamp);
        let mut counts = HashMap::new();
        for bucket in (current - self.retention)..=current {
            for member in store.smembers(&(self.key_for_bucket)(bucket))? {
                let member = String::from_utf8_lossy(&member).into_owned();
                *counts.entry(member).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
