// Metrics hooks for the engine.
//
// Callers install a global `EngineMetrics` implementation via
// [`set_engine_metrics`]; every `Engine::execute` then reports the
// command kind, wall-clock latency, and result size. This keeps
// instrumentation decoupled from any specific metrics backend.
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use once_cell::sync::Lazy;

/// The command an invocation resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Record,
    Classify,
}

/// Metrics observer for engine invocations.
pub trait EngineMetrics: Send + Sync {
    /// Record one completed command. `items` is the number of requests
    /// written (RECORD) or hits emitted (CLASSIFY).
    fn record_command(&self, command: CommandKind, latency: Duration, items: usize);
}

// A recorder panicking mid-swap leaves nothing half-written in the
// slot, so a poisoned lock is safe to read through on both paths.
static RECORDER: Lazy<RwLock<Option<Arc<dyn EngineMetrics>>>> = Lazy::new(Default::default);

pub(crate) fn metrics_recorder() -> Option<Arc<dyn EngineMetrics>> {
    RECORDER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Install or clear the global engine metrics recorder.
///
/// Typically called once during service startup so every `Engine`
/// instance shares the same metrics backend.
pub fn set_engine_metrics(recorder: Option<Arc<dyn EngineMetrics>>) {
    *RECORDER.write().unwrap_or_else(PoisonError::into_inner) = recorder;
}
