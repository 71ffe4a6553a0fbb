//! Packing of `(band, bucket)` pairs and storage key construction.
//!
//! A packed field is exactly three bytes, big-endian: `band: u8` then
//! `bucket: u16`. Fixed-width packing keeps hash-field cardinality
//! predictable and avoids delimiter ambiguity between numeric values.
//! Candidate-set keys embed the pack between colon-delimited text, so
//! every key built here is an opaque byte string, not UTF-8.

use crate::IndexError;

/// Width of a packed `(band, bucket)` hash field.
pub const PACKED_FIELD_LEN: usize = 3;

/// Pack a 1-indexed band and a bucket into a fixed-width field.
pub fn pack(band: u8, bucket: u16) -> [u8; PACKED_FIELD_LEN] {
    let bucket = bucket.to_be_bytes();
    [band, bucket[0], bucket[1]]
}

/// Decode a packed field back into `(band, bucket)`.
pub fn unpack(field: &[u8]) -> Result<(u8, u16), IndexError> {
    if field.len() != PACKED_FIELD_LEN {
        return Err(IndexError::KeyFormat {
            expected: PACKED_FIELD_LEN,
            len: field.len(),
        });
    }
    Ok((field[0], u16::from_be_bytes([field[1], field[2]])))
}

/// Key of the frequency hash for one `(feature, item)` pair:
/// `"{scope}:f:{feature}:{item}"`.
pub fn frequency_key(scope: &str, feature: &str, item: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + feature.len() + item.len() + 4);
    key.extend_from_slice(scope.as_bytes());
    key.extend_from_slice(b":f:");
    key.extend_from_slice(feature.as_bytes());
    key.push(b':');
    key.extend_from_slice(item.as_bytes());
    key
}

/// Prefix of the candidate-set keys for one `(feature, band, bucket)`
/// shard: `"{scope}:{feature}:" + pack(band, bucket) + ":"`. The full
/// key appends the decimal time bucket.
pub fn candidate_key_prefix(scope: &str, feature: &str, band: u8, bucket: u16) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(scope.len() + feature.len() + PACKED_FIELD_LEN + 3);
    prefix.extend_from_slice(scope.as_bytes());
    prefix.push(b':');
    prefix.extend_from_slice(feature.as_bytes());
    prefix.push(b':');
    prefix.extend_from_slice(&pack(band, bucket));
    prefix.push(b':');
    prefix
}

/// Full candidate-set key for one time bucket.
pub fn candidate_key(prefix: &[u8], time_bucket: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 20);
    key.extend_from_slice(prefix);
    key.extend_from_slice(time_bucket.to_string().as_bytes());
    key
}
