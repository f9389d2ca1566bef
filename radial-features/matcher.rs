use radial_core::{Descriptor, Match};
use rayon::prelude::*;

#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Brute-force nearest neighbour matching: one match per query descriptor,
/// pointing at the train descriptor with the smallest Hamming distance (the
/// lowest index wins ties).
pub fn match_descriptors(query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
    if train.is_empty() {
        return Vec::new();
    }

    query
        .par_iter()
        .enumerate()
        .map(|(qi, q)| {
            let (ti, dist) = train
                .iter()
                .enumerate()
                .map(|(ti, t)| (ti, hamming_distance(q, t)))
                .fold((0, u32::MAX), |best, cur| if cur.1 < best.1 { cur } else { best });
            Match::new(qi, ti, dist as f32)
        })
        .collect()
}
