//! ORB feature extraction and matching used to register neighbouring frames.
//!
//! This is the concrete feature collaborator behind
//! [`radial_core::CorrespondenceProvider`]: FAST-9 corners oriented by their
//! intensity centroid, steered BRIEF-256 descriptors, and brute-force Hamming
//! matching.

use image::{imageops, GrayImage, RgbImage};
use log::debug;
use radial_core::{CorrespondenceProvider, Correspondences, Descriptor, Keypoint, StitchError, StitchResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod descriptor;
pub mod detector;
pub mod matcher;

pub use descriptor::BriefGenerator;
pub use detector::{CornerDetector, ScoredKeypoint};
pub use matcher::{hamming_distance, match_descriptors};

/// Feature extraction settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbFeatureConfig {
    /// Strongest corners kept per image
    pub max_features: usize,
    /// FAST intensity threshold (1-127)
    pub fast_threshold: u8,
    /// Odd side length of the orientation / descriptor patch
    pub patch_size: usize,
    /// Seed of the BRIEF sampling pattern
    pub pattern_seed: u64,
}

impl Default for OrbFeatureConfig {
    fn default() -> Self {
        Self {
            max_features: 2000,
            fast_threshold: 20,
            patch_size: 31,
            pattern_seed: 0,
        }
    }
}

impl OrbFeatureConfig {
    pub fn validate(&self) -> StitchResult<()> {
        if self.fast_threshold == 0 || self.fast_threshold > 127 {
            return Err(StitchError::InvalidConfig(format!(
                "FAST threshold {} must be 1-127",
                self.fast_threshold
            )));
        }
        if self.patch_size % 2 == 0 || self.patch_size < 3 {
            return Err(StitchError::InvalidConfig(format!(
                "patch size {} must be odd and >= 3",
                self.patch_size
            )));
        }
        if self.max_features == 0 {
            return Err(StitchError::InvalidConfig("max_features must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Keypoint detector + descriptor generator
#[derive(Debug, Clone)]
pub struct OrbFeatures {
    cfg: OrbFeatureConfig,
    detector: CornerDetector,
    brief: BriefGenerator,
}

impl OrbFeatures {
    pub fn new(cfg: OrbFeatureConfig) -> StitchResult<Self> {
        cfg.validate()?;
        let detector = CornerDetector::new(cfg.fast_threshold, cfg.patch_size);
        let brief = BriefGenerator::new(cfg.patch_size, cfg.pattern_seed);
        Ok(Self { cfg, detector, brief })
    }

    pub fn config(&self) -> &OrbFeatureConfig {
        &self.cfg
    }

    /// Detect keypoints and generate descriptors in one step
    pub fn detect_and_describe(&self, img: &GrayImage) -> (Vec<Keypoint>, Vec<Descriptor>) {
        let kps = self.detector.detect(img, self.cfg.max_features);
        let desc = self.brief.generate_descriptors(img, &kps);
        (kps, desc)
    }
}

/// [`CorrespondenceProvider`] backed by ORB features on the luma channel
#[derive(Debug, Clone)]
pub struct OrbCorrespondence {
    features: OrbFeatures,
}

impl OrbCorrespondence {
    pub fn new(cfg: OrbFeatureConfig) -> StitchResult<Self> {
        Ok(Self { features: OrbFeatures::new(cfg)? })
    }

    pub fn features(&self) -> &OrbFeatures {
        &self.features
    }
}

impl CorrespondenceProvider for OrbCorrespondence {
    fn correspond(&self, current: &RgbImage, previous: &RgbImage) -> StitchResult<Correspondences> {
        let (keypoints_a, desc_a) = self.features.detect_and_describe(&imageops::grayscale(current));
        let (keypoints_b, desc_b) = self.features.detect_and_describe(&imageops::grayscale(previous));
        let matches = match_descriptors(&desc_a, &desc_b);
        debug!(
            "{} / {} keypoints, {} raw matches",
            keypoints_a.len(),
            keypoints_b.len(),
            matches.len()
        );
        Ok(Correspondences { keypoints_a, keypoints_b, matches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Deterministic per-pixel noise, defined in world coordinates so that
    /// overlapping crops see identical content
    fn scene(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let h = (x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263)).wrapping_mul(2_246_822_519);
            let v = (h >> 24) as u8;
            Rgb([v, v, v])
        })
    }

    fn crop(img: &RgbImage, x0: u32, width: u32) -> RgbImage {
        imageops::crop_imm(img, x0, 0, width, img.height()).to_image()
    }

    #[test]
    fn test_config_validation() {
        let mut cfg = OrbFeatureConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.fast_threshold = 0;
        assert!(matches!(cfg.validate(), Err(StitchError::InvalidConfig(_))));

        cfg = OrbFeatureConfig { patch_size: 16, ..OrbFeatureConfig::default() };
        assert!(cfg.validate().is_err());

        cfg = OrbFeatureConfig { max_features: 0, ..OrbFeatureConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_detect_and_describe_lengths_agree() {
        let orb = OrbFeatures::new(OrbFeatureConfig { patch_size: 15, ..Default::default() }).unwrap();
        let gray = imageops::grayscale(&scene(96, 64));
        let (kps, desc) = orb.detect_and_describe(&gray);
        assert!(!kps.is_empty());
        assert_eq!(kps.len(), desc.len());
    }

    #[test]
    fn test_shifted_crops_produce_consistent_matches() {
        let world = scene(160, 64);
        let previous = crop(&world, 0, 100);
        let current = crop(&world, 30, 100);

        let provider = OrbCorrespondence::new(OrbFeatureConfig { patch_size: 15, ..Default::default() }).unwrap();
        let c = provider.correspond(&current, &previous).unwrap();
        assert_eq!(c.matches.len(), c.keypoints_a.len());

        // Exact (distance 0) matches between shifted crops of the same scene
        // must agree on the 30 px offset for at least one keypoint.
        let agreeing = c
            .matches
            .iter()
            .filter(|m| m.distance == 0.0)
            .filter(|m| {
                let a = c.keypoints_a[m.query];
                let b = c.keypoints_b[m.train];
                b.x - a.x == 30.0 && b.y == a.y
            })
            .count();
        assert!(agreeing > 0);
    }
}
