use std::error::Error;

use simdex::{
    ClassifyQuery, FilterMode, IndexParams, RecordRequest, Signature, Simdex, SimdexConfig,
};

fn signature(bands: u8, entries: &[(u8, u16, i64)]) -> Signature {
    let mut sig = Signature::new(bands);
    for &(band, bucket, count) in entries {
        sig.add_count(band, bucket, count);
    }
    sig
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().init();

    let simdex = match std::env::args().nth(1) {
        Some(path) => Simdex::from_config(&SimdexConfig::from_file(path)?)?,
        None => Simdex::in_memory(IndexParams {
            scope: "demo".into(),
            bands: 2,
            window: 60,
            retention: 1,
        })?,
    };
    let bands = simdex.params().bands;

    simdex.record(
        120,
        &[
            RecordRequest {
                item: "a".into(),
                feature: "m".into(),
                signature: signature(bands, &[(1, 10, 1), (2, 20, 1)]),
            },
            RecordRequest {
                item: "b".into(),
                feature: "m".into(),
                signature: signature(bands, &[(1, 10, 1), (1, 11, 1), (2, 20, 1)]),
            },
        ],
    )?;

    let response = simdex.classify(
        120,
        FilterMode::Lenient,
        &[ClassifyQuery {
            feature: "m".into(),
            threshold: 1,
            signature: signature(bands, &[(1, 10, 1), (2, 20, 1)]),
        }],
    )?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
