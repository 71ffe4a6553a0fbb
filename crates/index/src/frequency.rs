use crate::{codec, IndexError, IndexParams, KvBackend, Signature};

/// Per-item bucket-frequency histograms, persisted as one hash per
/// `(feature, item)` pair with packed `(band, bucket)` fields.
pub struct FrequencyStore<'a> {
    store: &'a dyn KvBackend,
    params: &'a IndexParams,
}

impl<'a> FrequencyStore<'a> {
    pub fn new(store: &'a dyn KvBackend, params: &'a IndexParams) -> Self {
        Self { store, params }
    }

    /// Fetch the stored signature for `(feature, item)`. Fields whose
    /// band falls outside `1..=bands` are silently ignored so that data
    /// written by a wider configuration still decodes; a field that is
    /// not a valid pack fails the request.
    pub fn get(&self, feature: &str, item: &str) -> Result<Signature, IndexError> {
        let key = codec::frequency_key(&self.params.scope, feature, item);
        let mut signature = Signature::new(self.params.bands);
        for (field, value) in self.store.hgetall(&key)? {
            let (band, bucket) = codec::unpack(&field)?;
            signature.add_count(band, bucket, value);
        }
        Ok(signature)
    }

    /// Accumulate `signature` into the stored histogram for
    /// `(feature, item)` and refresh the hash expiry to
    /// `timestamp + retention * window`. Zero counts are not written.
    pub fn add(
        &self,
        feature: &str,
        item: &str,
        signature: &Signature,
        timestamp: i64,
    ) -> Result<(), IndexError> {
        let key = codec::frequency_key(&self.params.scope, feature, item);
        for (band, histogram) in signature.bands() {
            for (&bucket, &count) in histogram {
                if count == 0 {
                    continue;
                }
                self.store.hincrby(&key, &codec::pack(band, bucket), count)?;
            }
        }
        self.store
            .expireat(&key, timestamp + self.params.retention * self.params.window)?;
        Ok(())
    }
}
