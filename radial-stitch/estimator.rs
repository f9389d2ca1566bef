use log::{debug, warn};
use radial_core::{Keypoint, Match, StitchError, StitchResult, Translation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the hypothesis match of each consensus trial is chosen.
///
/// Either way exactly one trial is run per match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum TrialOrder {
    /// Trial `i` draws its hypothesis uniformly from `[0, N)` with a seeded generator.
    Random { seed: u64 },
    /// Trial `i` uses match `i`.
    Exhaustive,
}

impl Default for TrialOrder {
    fn default() -> Self {
        TrialOrder::Random { seed: 0 }
    }
}

/// What to report when the consensus search gives no usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FallbackPolicy {
    /// Each axis of the winning translation that is exactly 0 is replaced by
    /// that axis of the last trial's hypothesis. Reproduces the legacy
    /// stitcher, including the case where a true zero offset gets replaced.
    #[default]
    ExactZeroAxis,
    /// The last trial's hypothesis is used only when no trial found any
    /// consistent match.
    NoConsensus,
}

/// Consensus search settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EstimatorConfig {
    /// Per-axis agreement tolerance in pixels
    pub tolerance: f64,
    pub trial_order: TrialOrder,
    pub fallback: FallbackPolicy,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            tolerance: 3.0,
            trial_order: TrialOrder::default(),
            fallback: FallbackPolicy::default(),
        }
    }
}

/// Outcome of one pairwise registration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub translation: Translation,
    /// Matches (other than the hypothesis itself) agreeing with the winner
    pub consensus: usize,
    /// Trial that produced the winner; `None` when no trial found consensus
    pub trial: Option<usize>,
    pub fallback_applied: bool,
}

/// Consensus (RANSAC-style) search for the single translation relating image
/// A to image B.
#[derive(Debug, Clone)]
pub struct TranslationEstimator {
    cfg: EstimatorConfig,
}

impl TranslationEstimator {
    pub fn new(cfg: EstimatorConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.cfg
    }

    /// Match index used as hypothesis by each of the `n` trials.
    pub fn hypotheses(&self, n: usize) -> Vec<usize> {
        match self.cfg.trial_order {
            TrialOrder::Exhaustive => (0..n).collect(),
            TrialOrder::Random { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            }
        }
    }

    /// Estimates the translation `B - A` from matched keypoints.
    ///
    /// Trials are scored independently and reduced to the highest consensus,
    /// the earliest trial winning ties. A trial with zero consensus never
    /// wins; the configured [`FallbackPolicy`] decides what happens then.
    pub fn estimate(&self, matches: &[Match], kps_a: &[Keypoint], kps_b: &[Keypoint]) -> StitchResult<Estimate> {
        if matches.is_empty() {
            return Err(StitchError::InsufficientCorrespondences { frame: None, found: 0 });
        }

        let offsets = match_offsets(matches, kps_a, kps_b)?;
        let picks = self.hypotheses(offsets.len());
        let tolerance = self.cfg.tolerance;

        let best = picks
            .par_iter()
            .enumerate()
            .map(|(trial, &idx)| (trial, consensus(&offsets, idx, tolerance), offsets[idx]))
            .filter(|&(_, count, _)| count > 0)
            .reduce_with(|a, b| if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) { b } else { a });

        let (mut translation, consensus, trial) = match best {
            Some((trial, count, t)) => (t, count, Some(trial)),
            None => (Translation::ZERO, 0, None),
        };

        // `picks` has one entry per match, so it is never empty here
        let last = offsets[picks[picks.len() - 1]];
        let mut fallback_applied = false;
        match self.cfg.fallback {
            FallbackPolicy::ExactZeroAxis => {
                if translation.dx == 0.0 {
                    translation.dx = last.dx;
                    fallback_applied = true;
                }
                if translation.dy == 0.0 {
                    translation.dy = last.dy;
                    fallback_applied = true;
                }
            }
            FallbackPolicy::NoConsensus => {
                if consensus == 0 {
                    translation = last;
                    fallback_applied = true;
                }
            }
        }

        if fallback_applied {
            warn!(
                "fallback to last hypothesis ({:.1}, {:.1}), consensus {} of {} matches",
                translation.dx,
                translation.dy,
                consensus,
                matches.len()
            );
        }
        debug!(
            "translation ({:.2}, {:.2}) with consensus {}/{} (trial {:?}, fallback {})",
            translation.dx,
            translation.dy,
            consensus,
            matches.len(),
            trial,
            fallback_applied
        );

        Ok(Estimate { translation, consensus, trial, fallback_applied })
    }
}

fn match_offsets(matches: &[Match], kps_a: &[Keypoint], kps_b: &[Keypoint]) -> StitchResult<Vec<Translation>> {
    matches
        .iter()
        .map(|m| {
            let a = kps_a.get(m.query).ok_or(StitchError::InvalidMatch {
                index: m.query,
                available: kps_a.len(),
            })?;
            let b = kps_b.get(m.train).ok_or(StitchError::InvalidMatch {
                index: m.train,
                available: kps_b.len(),
            })?;
            Ok(Translation::between(a, b))
        })
        .collect()
}

/// Number of matches other than `hypothesis` whose offset agrees with it on
/// both axes.
fn consensus(offsets: &[Translation], hypothesis: usize, tolerance: f64) -> usize {
    let h = offsets[hypothesis];
    offsets
        .iter()
        .enumerate()
        .filter(|&(j, o)| {
            j != hypothesis && (h.dx - o.dx).abs() < tolerance && (h.dy - o.dy).abs() < tolerance
        })
        .count()
}

/// Drops matches that are not "good": only distances strictly below
/// `factor` times the minimum distance survive. The minimum starts at
/// `ceiling`, and matches at exactly the minimum are always kept so that a
/// perfect (zero distance) match does not empty the set.
pub fn retain_good_matches(matches: &[Match], factor: f32, ceiling: f32) -> Vec<Match> {
    let min = matches.iter().map(|m| m.distance).fold(ceiling, f32::min);
    let limit = factor * min;
    matches
        .iter()
        .filter(|m| m.distance < limit || m.distance == min)
        .copied()
        .collect()
}
