use image::RgbImage;
use radial_core::{CorrespondenceProvider, StitchResult};
use radial_features::OrbCorrespondence;

use crate::assembler::{Panorama, PanoramaAssembler};
use crate::config::StitchConfig;

/// Validated configuration bound to a correspondence provider
pub struct Stitcher<P = OrbCorrespondence> {
    config: StitchConfig,
    provider: P,
}

impl Stitcher<OrbCorrespondence> {
    /// Stitcher using ORB features with the configured settings
    pub fn new(config: StitchConfig) -> StitchResult<Self> {
        let provider = OrbCorrespondence::new(config.features.clone())?;
        Self::with_provider(config, provider)
    }
}

impl<P: CorrespondenceProvider> Stitcher<P> {
    pub fn with_provider(config: StitchConfig, provider: P) -> StitchResult<Self> {
        config.validate()?;
        Ok(Self { config, provider })
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Assembler over `frames` that borrows this stitcher's provider
    pub fn assembler(&self, frames: &[RgbImage]) -> StitchResult<PanoramaAssembler<&P>> {
        PanoramaAssembler::new(frames, &self.config, &self.provider)
    }

    /// Stitches `frames` (left to right) into one panorama
    pub fn stitch(&self, frames: &[RgbImage]) -> StitchResult<Panorama> {
        self.assembler(frames)?.run()
    }

    /// Get configuration summary
    pub fn config_summary(&self) -> String {
        self.config.summary()
    }
}
