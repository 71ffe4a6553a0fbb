//! # simdex engine
//!
//! Command dispatch and orchestration over the index primitives. The
//! engine accepts one positional argument vector per invocation, the
//! way a scripted atomic context hands arguments across:
//!
//! ```text
//! <scope> <bands> <window> <retention> <timestamp>
//! <RECORD | CLASSIFY>
//! <command-specific arguments…>
//! ```
//!
//! `RECORD` writes banded bucket-frequency signatures into the
//! frequency store and the candidate index. `CLASSIFY` retrieves
//! candidates by shared hash buckets, filters them against per-query
//! collision thresholds (lenient or strict discipline), and scores the
//! survivors with the banded similarity kernel.
//!
//! One invocation runs to completion before any other invocation
//! observes its mutations; the engine itself takes no locks and relies
//! on the host's atomic execution envelope for isolation.
//!
//! ```
//! use engine::{Engine, Response};
//! use index::BackendConfig;
//!
//! let engine = Engine::new(BackendConfig::in_memory()).unwrap();
//! let argv: Vec<String> = "s 2 60 1 120 RECORD a m 1 10 1 1 20 1"
//!     .split_whitespace()
//!     .map(String::from)
//!     .collect();
//! let response = engine.execute(&argv).unwrap();
//! assert!(matches!(response, Response::Record { requests: 1 }));
//! ```

mod args;
mod engine;
mod metrics;
mod types;

pub use args::{flag_set, repeated, variadic, ArgumentError, Cursor};
pub use engine::Engine;
pub use metrics::{set_engine_metrics, CommandKind, EngineMetrics};
pub use types::{ClassifyHit, ClassifyQuery, FilterMode, RecordRequest, RequestConfig, Response};

use index::IndexError;
use thiserror::Error;

/// Errors surfaced by one engine invocation. All of them are fatal to
/// the request; none are swallowed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed argument vector. No state was mutated.
    #[error("argument error: {0}")]
    Argument(#[from] ArgumentError),
    /// Index or storage failure.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    /// The command token names a reserved extension point.
    #[error("command {0:?} is reserved but not implemented")]
    NotImplemented(String),
}
