use radial_core::{default_threads, ProjectionMode, StitchError, StitchResult};
use radial_features::OrbFeatureConfig;

use crate::builder::StitcherBuilder;
use crate::estimator::{EstimatorConfig, FallbackPolicy, TrialOrder};
use crate::layout::OverlapLayout;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Focal length (pixels) the reference rig was calibrated with
pub const DEFAULT_FOCAL_LENGTH: f64 = 2800.0;

/// Complete stitcher configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StitchConfig {
    pub projection: ProjectionMode,
    /// Focal length in pixels
    pub focal_length: f64,
    pub estimator: EstimatorConfig,
    /// Matches survive trimming when closer than this multiple of the best distance
    pub good_match_factor: f32,
    /// Upper bound on the best distance used for trimming
    pub good_match_ceiling: f32,
    pub layout: OverlapLayout,
    pub features: OrbFeatureConfig,
    pub n_threads: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionMode::Spherical,
            focal_length: DEFAULT_FOCAL_LENGTH,
            estimator: EstimatorConfig::default(),
            good_match_factor: 3.0,
            good_match_ceiling: 100.0,
            layout: OverlapLayout::default(),
            features: OrbFeatureConfig::default(),
            n_threads: default_threads(),
            name: None,
            description: None,
        }
    }
}

impl StitchConfig {
    /// Reference behaviour: spherical surface, seeded random trials and the
    /// exact-zero fallback
    pub fn reference_preset() -> Self {
        Self {
            name: Some("Reference".to_string()),
            description: Some("Seeded random consensus trials with the legacy zero-axis fallback".to_string()),
            ..Self::default()
        }
    }

    /// Every match is tried once as hypothesis and the fallback only fires
    /// when no trial found consensus
    pub fn robust_preset() -> Self {
        Self {
            estimator: EstimatorConfig {
                trial_order: TrialOrder::Exhaustive,
                fallback: FallbackPolicy::NoConsensus,
                ..EstimatorConfig::default()
            },
            name: Some("Robust".to_string()),
            description: Some("Exhaustive consensus trials, fallback only without consensus".to_string()),
            ..Self::default()
        }
    }

    /// Cylindrical surface for sweeps with little vertical field of view
    pub fn cylindrical_preset(focal_length: f64) -> Self {
        Self {
            projection: ProjectionMode::Cylindrical,
            focal_length,
            name: Some("Cylindrical".to_string()),
            description: Some("Horizontal sweep projected onto a cylinder".to_string()),
            ..Self::default()
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    /// Convert to StitcherBuilder for further customization
    pub fn to_builder(self) -> StitcherBuilder {
        StitcherBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        let trials = match self.estimator.trial_order {
            TrialOrder::Random { seed } => format!("random(seed={})", seed),
            TrialOrder::Exhaustive => "exhaustive".to_string(),
        };
        format!(
            "StitchConfig: {} f={:.1}, tolerance={:.1}, trials={}, fallback={:?}, good_match={}x (ceiling {}), overlap={:.2}, threads={}",
            self.projection,
            self.focal_length,
            self.estimator.tolerance,
            trials,
            self.estimator.fallback,
            self.good_match_factor,
            self.good_match_ceiling,
            self.layout.overlap,
            self.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> StitchResult<()> {
        if !self.focal_length.is_finite() || self.focal_length <= 0.0 {
            return Err(StitchError::InvalidFocalLength(self.focal_length));
        }
        if !self.estimator.tolerance.is_finite() || self.estimator.tolerance <= 0.0 {
            return Err(StitchError::InvalidConfig(format!(
                "tolerance {} must be > 0",
                self.estimator.tolerance
            )));
        }
        if !self.good_match_factor.is_finite() || self.good_match_factor < 1.0 {
            return Err(StitchError::InvalidConfig(format!(
                "good match factor {} must be >= 1",
                self.good_match_factor
            )));
        }
        if !self.good_match_ceiling.is_finite() || self.good_match_ceiling <= 0.0 {
            return Err(StitchError::InvalidConfig(format!(
                "good match ceiling {} must be > 0",
                self.good_match_ceiling
            )));
        }
        if self.n_threads == 0 {
            return Err(StitchError::InvalidConfig("n_threads must be > 0".to_string()));
        }
        self.layout.validate()?;
        self.features.validate()
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from a `.json` or `.toml` file, picked by extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::load_toml(path),
            _ => Self::load_json(path),
        }
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
