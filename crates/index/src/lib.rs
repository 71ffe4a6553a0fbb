//! # simdex index primitives
//!
//! This crate provides the storage-facing half of the simdex similarity
//! engine: a typed adapter over an external key-value store, the binary
//! key codec, and the index structures built on top of them.
//!
//! ## Core pieces
//!
//! - [`KvBackend`]: the capability set required from the KV store
//!   (hash increment, hash scan, set add, set members, absolute expiry).
//!   An [`InMemoryBackend`] ships for tests and ephemeral deployments;
//!   production deployments implement the trait against their own store.
//! - [`codec`]: fixed-width packing of `(band, bucket)` pairs and the
//!   storage key builders. Keys are opaque byte strings.
//! - [`Signature`]: a per-item, per-feature histogram of
//!   `(band, bucket)` counts.
//! - [`TimeWindowedSet`]: a logical set partitioned into time buckets
//!   and read across a retention window.
//! - [`FrequencyStore`]: the per-item bucket-frequency hash.
//! - [`CandidateIndex`]: the inverted index from `(feature, band,
//!   bucket)` to the items observed in each time bucket.
//! - [`similarity`]: the banded Manhattan similarity kernel.
//!
//! All index structures borrow a backend and an [`IndexParams`]; they own
//! no state of their own, so one backend can serve any number of scopes.

mod backend;
mod candidates;
pub mod codec;
mod frequency;
mod signature;
pub mod similarity;
mod window;

pub use backend::{BackendConfig, InMemoryBackend, KvBackend, StorageError};
pub use candidates::{BandSet, CandidateIndex};
pub use frequency::FrequencyStore;
pub use signature::{BandHistogram, Signature};
pub use window::TimeWindowedSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable parameters describing one logical index.
///
/// `scope` namespaces every storage key; `bands` fixes the signature
/// shape; `window` and `retention` control the sliding time window used
/// by the candidate index and the TTLs applied to everything written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParams {
    /// Namespace prefix isolating one logical index in the store.
    pub scope: String,
    /// Number of bands in every signature handled by this index.
    pub bands: u8,
    /// Width of one time bucket, in the same unit as timestamps.
    pub window: i64,
    /// Number of time buckets kept live behind the current one.
    pub retention: i64,
}

/// Errors produced by the index layer.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A fetched hash field did not decode as a packed `(band, bucket)`
    /// pair. Treated as data corruption; the request fails fast.
    #[error("malformed packed band/bucket field: expected {expected} bytes, got {len}")]
    KeyFormat { expected: usize, len: usize },
    /// The storage backend failed; fatal to the request.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
