//! Workspace umbrella crate for the simdex similarity index.
//!
//! simdex records items described by multi-band bucket-frequency
//! signatures, indexes them for approximate nearest-neighbor recall by
//! shared hash buckets, and scores candidates with a banded similarity
//! metric. The `simdex` crate re-exports the [`index`] and [`engine`]
//! layers so applications can drive the whole engine through a single
//! dependency, and adds the deployment surface: YAML configuration, the
//! feature-alias registry, and a typed wrapper that speaks the
//! positional wire protocol for you.
//!
//! ## Quick start
//!
//! ```
//! use simdex::{FilterMode, IndexParams, RecordRequest, ClassifyQuery, Response, Signature, Simdex};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let params = IndexParams {
//!     scope: "s".into(),
//!     bands: 2,
//!     window: 60,
//!     retention: 1,
//! };
//! let simdex = Simdex::in_memory(params)?;
//!
//! let mut signature = Signature::new(2);
//! signature.add_count(1, 10, 1);
//! signature.add_count(2, 20, 1);
//!
//! simdex.record(
//!     120,
//!     &[RecordRequest {
//!         item: "a".into(),
//!         feature: "m".into(),
//!         signature: signature.clone(),
//!     }],
//! )?;
//!
//! let response = simdex.classify(
//!     120,
//!     FilterMode::Lenient,
//!     &[ClassifyQuery {
//!         feature: "m".into(),
//!         threshold: 1,
//!         signature,
//!     }],
//! )?;
//! match response {
//!     Response::Classify(hits) => assert_eq!(hits[0].item, "a"),
//!     _ => unreachable!(),
//! }
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```
//!
//! Deployments that already own the argument vector (for example when
//! the engine runs inside a scripted atomic context) call
//! [`Engine::execute`] directly; [`record_argv`] and [`classify_argv`]
//! build that vector from typed requests for clients on the other side
//! of the wire.

pub mod aliases;
pub mod config;

pub use aliases::{AliasError, FeatureAliases};
pub use config::{ConfigLoadError, SimdexConfig};
pub use engine::{
    set_engine_metrics, ArgumentError, ClassifyHit, ClassifyQuery, CommandKind, Engine,
    EngineError, EngineMetrics, FilterMode, RecordRequest, RequestConfig, Response,
};
pub use index::{
    BackendConfig, BandHistogram, CandidateIndex, FrequencyStore, InMemoryBackend, IndexError,
    IndexParams, KvBackend, Signature, StorageError,
};

use thiserror::Error;

/// Errors building a [`Simdex`] from a deployment configuration.
#[derive(Debug, Error)]
pub enum SimdexError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("alias table error: {0}")]
    Aliases(#[from] AliasError),
}

/// A configured deployment: an engine plus the index parameters and
/// feature aliases every invocation shares.
pub struct Simdex {
    engine: Engine,
    params: IndexParams,
    aliases: FeatureAliases,
}

impl Simdex {
    /// Build a deployment from a loaded configuration.
    pub fn from_config(config: &SimdexConfig) -> Result<Self, SimdexError> {
        let engine = Engine::new(config.backend_config())?;
        Ok(Self {
            engine,
            params: config.index_params(),
            aliases: config.feature_aliases()?,
        })
    }

    /// Build an in-memory deployment with the given parameters and no
    /// aliases. Convenient for tests and demos.
    pub fn in_memory(params: IndexParams) -> Result<Self, SimdexError> {
        let engine = Engine::new(BackendConfig::in_memory())?;
        Ok(Self {
            engine,
            params,
            aliases: FeatureAliases::default(),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    pub fn aliases(&self) -> &FeatureAliases {
        &self.aliases
    }

    /// Record signatures at `timestamp` through the wire protocol.
    pub fn record(
        &self,
        timestamp: i64,
        requests: &[RecordRequest],
    ) -> Result<Response, EngineError> {
        self.engine
            .execute(&record_argv(&self.params, timestamp, requests))
    }

    /// Classify queries at `timestamp` through the wire protocol.
    pub fn classify(
        &self,
        timestamp: i64,
        mode: FilterMode,
        queries: &[ClassifyQuery],
    ) -> Result<Response, EngineError> {
        self.engine
            .execute(&classify_argv(&self.params, timestamp, mode, queries))
    }
}

fn push_config(argv: &mut Vec<String>, params: &IndexParams, timestamp: i64) {
    argv.push(params.scope.clone());
    argv.push(params.bands.to_string());
    argv.push(params.window.to_string());
    argv.push(params.retention.to_string());
    argv.push(timestamp.to_string());
}

fn push_signature(argv: &mut Vec<String>, signature: &Signature) {
    for (_, histogram) in signature.bands() {
        argv.push(histogram.len().to_string());
        for (bucket, count) in histogram {
            argv.push(bucket.to_string());
            argv.push(count.to_string());
        }
    }
}

/// Build the RECORD argument vector for typed requests. Every request's
/// signature must carry the configured number of bands.
pub fn record_argv(
    params: &IndexParams,
    timestamp: i64,
    requests: &[RecordRequest],
) -> Vec<String> {
    let mut argv = Vec::new();
    push_config(&mut argv, params, timestamp);
    argv.push("RECORD".to_string());
    for request in requests {
        debug_assert_eq!(request.signature.band_count(), params.bands);
        argv.push(request.item.clone());
        argv.push(request.feature.clone());
        push_signature(&mut argv, &request.signature);
    }
    argv
}

/// Build the CLASSIFY argument vector for typed queries.
pub fn classify_argv(
    params: &IndexParams,
    timestamp: i64,
    mode: FilterMode,
    queries: &[ClassifyQuery],
) -> Vec<String> {
    let mut argv = Vec::new();
    push_config(&mut argv, params, timestamp);
    argv.push("CLASSIFY".to_string());
    if mode == FilterMode::Strict {
        argv.push("STRICT".to_string());
    }
    for query in queries {
        debug_assert_eq!(query.signature.band_count(), params.bands);
        argv.push(query.feature.clone());
        argv.push(query.threshold.to_string());
        push_signature(&mut argv, &query.signature);
    }
    argv
}
