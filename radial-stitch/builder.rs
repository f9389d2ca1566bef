use radial_core::{CorrespondenceProvider, ProjectionMode, StitchResult};
use radial_features::{OrbCorrespondence, OrbFeatureConfig};

use crate::config::StitchConfig;
use crate::estimator::{FallbackPolicy, TrialOrder};
use crate::stitcher::Stitcher;

/// Builder for creating a `Stitcher`
#[derive(Debug, Clone, Default)]
pub struct StitcherBuilder {
    config: StitchConfig,
}

impl StitcherBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projection surface
    pub fn projection(mut self, mode: ProjectionMode) -> Self {
        self.config.projection = mode;
        self
    }

    /// Set the focal length in pixels
    pub fn focal_length(mut self, focal_length: f64) -> Self {
        self.config.focal_length = focal_length;
        self
    }

    /// Set the per-axis consensus tolerance in pixels
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.estimator.tolerance = tolerance;
        self
    }

    /// Use seeded random hypothesis draws
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.estimator.trial_order = TrialOrder::Random { seed };
        self
    }

    /// Try every match once as hypothesis
    pub fn exhaustive_trials(mut self) -> Self {
        self.config.estimator.trial_order = TrialOrder::Exhaustive;
        self
    }

    /// Set the fallback used when consensus search gives no answer
    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.config.estimator.fallback = policy;
        self
    }

    /// Set good-match trimming factor and minimum-distance ceiling
    pub fn good_matches(mut self, factor: f32, ceiling: f32) -> Self {
        self.config.good_match_factor = factor;
        self.config.good_match_ceiling = ceiling;
        self
    }

    /// Set the expected overlap between neighbouring frames
    pub fn overlap(mut self, overlap: f64) -> Self {
        self.config.layout.overlap = overlap;
        self
    }

    /// Set the canvas height as a multiple of the frame height
    pub fn height_scale(mut self, scale: f64) -> Self {
        self.config.layout.height_scale = scale;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Replace the feature extraction settings
    pub fn features(mut self, features: OrbFeatureConfig) -> Self {
        self.config.features = features;
        self
    }

    /// Set the number of strongest corners kept per frame
    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config.features.max_features = max_features;
        self
    }

    /// Set the FAST threshold (1-127)
    pub fn fast_threshold(mut self, threshold: u8) -> Self {
        self.config.features.fast_threshold = threshold;
        self
    }

    /// Apply the robust preset
    pub fn preset_robust(mut self) -> Self {
        let preset = StitchConfig::robust_preset();
        self.config.estimator = preset.estimator;
        self
    }

    /// Build a `Stitcher` backed by ORB features
    pub fn build(self) -> StitchResult<Stitcher<OrbCorrespondence>> {
        Stitcher::new(self.config)
    }

    /// Build a `Stitcher` around a custom correspondence provider
    pub fn build_with_provider<P: CorrespondenceProvider>(self, provider: P) -> StitchResult<Stitcher<P>> {
        Stitcher::with_provider(self.config, provider)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Create a builder from an existing `StitchConfig`
    pub fn from_config(config: StitchConfig) -> Self {
        Self { config }
    }

    /// Convert the builder into a `StitchConfig`
    pub fn to_config(self) -> StitchConfig {
        self.config
    }
}
