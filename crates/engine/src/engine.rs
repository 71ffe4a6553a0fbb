use std::time::Instant;

use hashbrown::HashMap;
use index::{
    similarity, BackendConfig, CandidateIndex, FrequencyStore, IndexError, KvBackend, Signature,
};
use tracing::debug;

use crate::args::{flag_set, repeated, variadic, ArgumentError, Cursor};
use crate::metrics::{metrics_recorder, CommandKind};
use crate::types::{ClassifyHit, ClassifyQuery, FilterMode, RecordRequest, RequestConfig, Response};
use crate::EngineError;

#[cfg(test)]
mod tests;

const STRICT_FLAG: &str = "STRICT";

/// Commands that exist in the wire vocabulary as extension points but
/// have no implementation yet.
const RESERVED_COMMANDS: [&str; 3] = ["MERGE", "DELETE", "COMPARE"];

/// The command dispatcher. Owns the storage backend; every invocation
/// decodes its own configuration from the argument vector, so one
/// engine serves any number of scopes.
pub struct Engine {
    backend: Box<dyn KvBackend>,
}

impl Engine {
    /// Build an engine with the backend described by `config`.
    pub fn new(config: BackendConfig) -> Result<Self, EngineError> {
        let backend = config.build().map_err(IndexError::from)?;
        Ok(Self::with_backend(backend))
    }

    /// Build an engine around an existing backend (e.g. a shared
    /// in-memory store in tests).
    pub fn with_backend(backend: Box<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Execute one command invocation. Argument errors never mutate
    /// state: both commands decode their full request list before the
    /// first write or read.
    pub fn execute(&self, argv: &[String]) -> Result<Response, EngineError> {
        let start = Instant::now();
        let mut cursor = Cursor::new(argv);
        let config = decode_config(&mut cursor)?;
        let command_position = cursor.position();
        let command = cursor.next("command")?;

        let (kind, response) = match command {
            "RECORD" => (CommandKind::Record, self.record(&mut cursor, &config)?),
            "CLASSIFY" => (CommandKind::Classify, self.classify(&mut cursor, &config)?),
            reserved if RESERVED_COMMANDS.contains(&reserved) => {
                return Err(EngineError::NotImplemented(reserved.to_string()));
            }
            other => {
                return Err(ArgumentError::UnknownCommand {
                    position: command_position,
                    command: other.to_string(),
                }
                .into());
            }
        };

        if let Some(recorder) = metrics_recorder() {
            let items = match &response {
                Response::Record { requests } => *requests,
                Response::Classify(hits) => hits.len(),
            };
            recorder.record_command(kind, start.elapsed(), items);
        }
        Ok(response)
    }

    fn record(
        &self,
        cursor: &mut Cursor<'_>,
        config: &RequestConfig,
    ) -> Result<Response, EngineError> {
        let requests = variadic(cursor, |cur| decode_record_request(cur, config.bands))?;
        let params = config.params();
        let frequencies = FrequencyStore::new(self.backend.as_ref(), &params);
        let candidates = CandidateIndex::new(self.backend.as_ref(), &params);

        for request in &requests {
            // Frequency writes for a pair land before any candidate
            // writes referencing it.
            frequencies.add(
                &request.feature,
                &request.item,
                &request.signature,
                config.timestamp,
            )?;
            for (band, histogram) in request.signature.bands() {
                for (&bucket, &count) in histogram {
                    if count == 0 {
                        continue;
                    }
                    candidates.insert(
                        &request.feature,
                        band,
                        bucket,
                        config.timestamp,
                        &request.item,
                    )?;
                }
            }
        }

        debug!(
            scope = %config.scope,
            requests = requests.len(),
            "record complete"
        );
        Ok(Response::Record {
            requests: requests.len(),
        })
    }

    fn classify(
        &self,
        cursor: &mut Cursor<'_>,
        config: &RequestConfig,
    ) -> Result<Response, EngineError> {
        let mode = if flag_set(cursor, &[STRICT_FLAG]).contains(STRICT_FLAG) {
            FilterMode::Strict
        } else {
            FilterMode::Lenient
        };
        let queries = variadic(cursor, |cur| decode_classify_query(cur, config.bands))?;
        let params = config.params();
        let candidate_index = CandidateIndex::new(self.backend.as_ref(), &params);
        let frequencies = FrequencyStore::new(self.backend.as_ref(), &params);

        // Stage 1: collect candidates across every query before any
        // filtering or scoring runs.
        let mut collisions: HashMap<String, HashMap<&str, u32>> = HashMap::new();
        for query in &queries {
            let hits = candidate_index.query(&query.feature, &query.signature, config.timestamp)?;
            for (item, bands) in hits {
                collisions
                    .entry(item)
                    .or_default()
                    .insert(query.feature.as_str(), bands.count());
            }
        }

        // Stage 2: threshold filter under the selected discipline. A
        // feature the candidate never collided in counts as zero.
        let meets = |counts: &HashMap<&str, u32>, query: &ClassifyQuery| {
            counts.get(query.feature.as_str()).copied().unwrap_or(0) >= query.threshold
        };
        let mut survivors: Vec<String> = collisions
            .into_iter()
            .filter(|(_, counts)| match mode {
                FilterMode::Lenient => queries.iter().any(|query| meets(counts, query)),
                FilterMode::Strict => queries.iter().all(|query| meets(counts, query)),
            })
            .map(|(item, _)| item)
            .collect();
        // Deterministic emission order: item key ascending.
        survivors.sort();

        // Stage 3: score survivors query by query. A candidate's
        // frequency fetches all happen before its result is emitted.
        let mut hits = Vec::with_capacity(survivors.len());
        'candidates: for item in survivors {
            let mut scores = Vec::with_capacity(queries.len());
            for query in &queries {
                let stored = frequencies.get(&query.feature, &item)?;
                let query_empty = query.signature.is_empty();
                let stored_empty = stored.is_empty();
                let score = match mode {
                    FilterMode::Lenient => {
                        if query_empty || stored_empty {
                            None
                        } else {
                            Some(similarity::score(&query.signature, &stored))
                        }
                    }
                    FilterMode::Strict => {
                        // Emptiness must agree on both sides; a mismatch
                        // rejects the candidate outright.
                        if query_empty != stored_empty {
                            continue 'candidates;
                        }
                        if query_empty {
                            None
                        } else {
                            Some(similarity::score(&query.signature, &stored))
                        }
                    }
                };
                scores.push(score);
            }
            hits.push(ClassifyHit { item, scores });
        }

        debug!(
            scope = %config.scope,
            queries = queries.len(),
            hits = hits.len(),
            strict = matches!(mode, FilterMode::Strict),
            "classify complete"
        );
        Ok(Response::Classify(hits))
    }
}

/// Decode the leading configuration block:
/// `scope bands window retention timestamp`.
fn decode_config(cursor: &mut Cursor<'_>) -> Result<RequestConfig, ArgumentError> {
    let config = RequestConfig {
        scope: cursor.next("scope")?.to_string(),
        bands: cursor.parse("bands")?,
        window: cursor.parse("window")?,
        retention: cursor.parse("retention")?,
        timestamp: cursor.parse("timestamp")?,
    };
    config.validate()?;
    Ok(config)
}

/// Decode the shared frequencies block: for each band in order, a count
/// followed by that many `bucket count` pairs. The band count is fixed
/// by the configuration and never repeated on the wire.
fn decode_signature(cursor: &mut Cursor<'_>, bands: u8) -> Result<Signature, ArgumentError> {
    let mut signature = Signature::new(bands);
    for band in 1..=bands {
        let entries: Vec<(u16, i64)> = repeated(cursor, |cur| {
            let bucket = cur.parse("bucket")?;
            let count = cur.parse("bucket count")?;
            Ok((bucket, count))
        })?;
        for (bucket, count) in entries {
            signature.add_count(band, bucket, count);
        }
    }
    Ok(signature)
}

fn decode_record_request(
    cursor: &mut Cursor<'_>,
    bands: u8,
) -> Result<RecordRequest, ArgumentError> {
    let item = cursor.next("item key")?.to_string();
    let feature = cursor.next("feature index")?.to_string();
    let signature = decode_signature(cursor, bands)?;
    Ok(RecordRequest {
        item,
        feature,
        signature,
    })
}

fn decode_classify_query(
    cursor: &mut Cursor<'_>,
    bands: u8,
) -> Result<ClassifyQuery, ArgumentError> {
    let feature = cursor.next("feature index")?.to_string();
    let threshold = cursor.parse("threshold")?;
    let signature = decode_signature(cursor, bands)?;
    Ok(ClassifyQuery {
        feature,
        threshold,
        signature,
    })
}
