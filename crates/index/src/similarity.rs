//! Banded similarity over normalized bucket-frequency histograms.
//!
//! Each band's histogram is L1-normalized into a probability
//! distribution; the per-band Manhattan distance between the two
//! distributions is twice the total-variation distance and lies in
//! `[0, 2]`. Affine inversion maps it to a `[0, 1]` similarity that
//! averages across bands.

use std::collections::BTreeSet;

use crate::{BandHistogram, Signature};

/// Distance assigned to a band whose histogram sums to zero on either
/// side. Maximal by convention; this also avoids dividing by zero.
const VACANT_BAND_DISTANCE: f64 = 2.0;

static EMPTY_BAND: BandHistogram = BandHistogram::new();

/// Similarity of two signatures in `[0, 1]`: the mean over bands of
/// `1 - distance / 2`.
pub fn score(a: &Signature, b: &Signature) -> f64 {
    let bands = a.band_count().max(b.band_count());
    if bands == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for band in 1..=bands {
        let left = a.band(band).unwrap_or(&EMPTY_BAND);
        let right = b.band(band).unwrap_or(&EMPTY_BAND);
        total += 1.0 - band_distance(left, right) / 2.0;
    }
    total / f64::from(bands)
}

/// Manhattan distance between the L1-normalized forms of two band
/// histograms, over the union of buckets present in either.
fn band_distance(a: &BandHistogram, b: &BandHistogram) -> f64 {
    let total_a: i64 = a.values().sum();
    let total_b: i64 = b.values().sum();
    if total_a == 0 || total_b == 0 {
        return VACANT_BAND_DISTANCE;
    }
    let total_a = total_a as f64;
    let total_b = total_b as f64;

    let buckets: BTreeSet<&u16> = a.keys().chain(b.keys()).collect();
    let mut distance = 0.0;
    for bucket in buckets {
        let p = a.get(bucket).copied().unwrap_or(0) as f64 / total_a;
        let q = b.get(bucket).copied().unwrap_or(0) as f64 / total_b;
        distance += (p - q).abs();
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(bands: &[&[(u16, i64)]]) -> Signature {
        let mut sig = Signature::new(bands.len() as u8);
        for (idx, band) in bands.iter().enumerate() {
            for &(bucket, count) in *band {
                sig.add_count(idx as u8 + 1, bucket, count);
            }
        }
        sig
    }

    #[test]
    fn identical_signatures_score_one() {
        let sig = signature(&[&[(10, 1)], &[(20, 1)]]);
        assert!((score(&sig, &sig) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_signatures_score_zero() {
        let a = signature(&[&[(10, 1)], &[(20, 1)]]);
        let b = signature(&[&[(11, 1)], &[(21, 1)]]);
        assert_eq!(score(&a, &b), 0.0);
    }

    #[test]
    fn score_is_symmetric_and_bounded() {
        let a = signature(&[&[(10, 1), (11, 1)], &[(20, 1)]]);
        let b = signature(&[&[(10, 1)], &[(20, 1), (21, 3)]]);
        let ab = score(&a, &b);
        let ba = score(&b, &a);
        assert!((ab - ba).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn partial_overlap_matches_hand_computation() {
        // Band 1: {10:1, 11:1} vs {10:1} -> d = |1/2 - 1| + |1/2 - 0| = 1,
        // similarity 0.5. Band 2 identical -> 1.0. Mean 0.75.
        let a = signature(&[&[(10, 1), (11, 1)], &[(20, 1)]]);
        let b = signature(&[&[(10, 1)], &[(20, 1)]]);
        assert!((score(&a, &b) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn normalization_ignores_scale() {
        let a = signature(&[&[(10, 1), (11, 1)]]);
        let b = signature(&[&[(10, 50), (11, 50)]]);
        assert!((score(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn vacant_band_contributes_zero_similarity() {
        // Band 2 is empty on one side: distance 2 by convention, so the
        // final score is the mean of 1.0 and 0.0.
        let a = signature(&[&[(10, 1)], &[(20, 1)]]);
        let b = signature(&[&[(10, 1)], &[]]);
        assert!((score(&a, &b) - 0.5).abs() < 1e-12);
    }
}
