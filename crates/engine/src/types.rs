use index::{IndexParams, Signature};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::args::ArgumentError;

/// Per-request configuration decoded from the leading positional
/// arguments. Lives for the request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub scope: String,
    pub bands: u8,
    pub window: i64,
    pub retention: i64,
    pub timestamp: i64,
}

impl RequestConfig {
    /// Bounds-check the decoded configuration. The config block always
    /// sits at the head of the argument vector, so the reported
    /// positions are the fixed offsets of each field.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.bands == 0 {
            return Err(ArgumentError::Constraint {
                position: 1,
                message: "bands must be at least 1",
            });
        }
        if self.window <= 0 {
            return Err(ArgumentError::Constraint {
                position: 2,
                message: "window must be positive",
            });
        }
        if self.retention < 0 {
            return Err(ArgumentError::Constraint {
                position: 3,
                message: "retention must be non-negative",
            });
        }
        Ok(())
    }

    /// The index parameters shared by every component this request
    /// touches.
    pub fn params(&self) -> IndexParams {
        IndexParams {
            scope: self.scope.clone(),
            bands: self.bands,
            window: self.window,
            retention: self.retention,
        }
    }

    /// The time bucket the request timestamp falls into.
    pub fn time_bucket(&self) -> i64 {
        self.timestamp.div_euclid(self.window)
    }
}

/// One RECORD request: a signature to accumulate under
/// `(feature, item)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRequest {
    pub item: String,
    pub feature: String,
    pub signature: Signature,
}

/// One CLASSIFY query against a single feature index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyQuery {
    pub feature: String,
    /// Minimum number of colliding bands a candidate needs for this
    /// query to count it as matched.
    pub threshold: u32,
    pub signature: Signature,
}

/// Candidate filter discipline for CLASSIFY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Keep a candidate when at least one query meets its threshold.
    #[default]
    Lenient,
    /// Keep a candidate only when every query meets its threshold, and
    /// reject it outright when query and stored signatures disagree on
    /// emptiness for any query.
    Strict,
}

/// One emitted classification result: the candidate item and one score
/// per query, in input order. `None` is the "no comparable signal"
/// sentinel; it serializes as `-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyHit {
    pub item: String,
    pub scores: Vec<Option<f64>>,
}

impl ClassifyHit {
    /// Scores in the wire representation, sentinel included.
    pub fn wire_scores(&self) -> Vec<f64> {
        self.scores
            .iter()
            .map(|score| score.unwrap_or(-1.0))
            .collect()
    }
}

// The wire shape is the pair `[item, [score, ...]]`; the sentinel
// exists only here, never in the in-memory representation.
impl Serialize for ClassifyHit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_seq(Some(2))?;
        pair.serialize_element(&self.item)?;
        pair.serialize_element(&self.wire_scores())?;
        pair.end()
    }
}

/// Result of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// RECORD acknowledgement: the number of requests processed.
    Record { requests: usize },
    /// CLASSIFY result list, ordered by item key.
    Classify(Vec<ClassifyHit>),
}
