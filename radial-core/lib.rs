use image::{ImageBuffer, Luma, RgbImage};
use nalgebra::{Matrix3, Vector2};
use std::ops::{Add, AddAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::{StitchError, StitchResult};
pub use image::GrayImage;

/// Row-major single channel feathering weights, one `f64` in [0, 1] per pixel
pub type AlphaMask = ImageBuffer<Luma<f64>, Vec<f64>>;

/// Key-point ≙ corner location (subpixel) + orientation (radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, angle: 0.0 }
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

/// Candidate correspondence between keypoint `query` of image A and keypoint
/// `train` of image B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub query: usize,
    pub train: usize,
    pub distance: f32,
}

impl Match {
    pub fn new(query: usize, train: usize, distance: f32) -> Self {
        Self { query, train, distance }
    }
}

/// Everything one pairwise registration step needs from the feature
/// collaborator. Image A is the frame being placed, image B its left neighbour.
#[derive(Debug, Clone, Default)]
pub struct Correspondences {
    pub keypoints_a: Vec<Keypoint>,
    pub keypoints_b: Vec<Keypoint>,
    pub matches: Vec<Match>,
}

/// 2-D offset that shifts image A content onto image B
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Translation {
    pub dx: f64,
    pub dy: f64,
}

impl Translation {
    pub const ZERO: Translation = Translation { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Offset implied by a single match: `b - a`.
    pub fn between(a: &Keypoint, b: &Keypoint) -> Self {
        Self {
            dx: b.x as f64 - a.x as f64,
            dy: b.y as f64 - a.y as f64,
        }
    }
}

impl Add for Translation {
    type Output = Translation;

    fn add(self, rhs: Translation) -> Translation {
        Translation::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

impl AddAssign for Translation {
    fn add_assign(&mut self, rhs: Translation) {
        self.dx += rhs.dx;
        self.dy += rhs.dy;
    }
}

/// Placement of one projected frame on the shared canvas.
///
/// Only translations are ever chained, so the transform is stored as an offset
/// and expanded into the homogeneous form on demand.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlobalTransform {
    offset: Translation,
}

impl GlobalTransform {
    pub fn from_translation(offset: Translation) -> Self {
        Self { offset }
    }

    /// Transform of the next frame in the chain.
    pub fn then(&self, pairwise: Translation) -> Self {
        Self { offset: self.offset + pairwise }
    }

    pub fn translation(&self) -> Translation {
        self.offset
    }

    /// Offset snapped to the pixel grid used for canvas placement.
    pub fn pixel_offset(&self) -> (i64, i64) {
        (self.offset.dx.round() as i64, self.offset.dy.round() as i64)
    }

    /// 3×3 homogeneous matrix with only the translation column populated.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new_translation(&Vector2::new(self.offset.dx, self.offset.dy))
    }
}

/// Radial surface frames are re-sampled onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProjectionMode {
    Cylindrical,
    #[default]
    Spherical,
}

impl std::fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionMode::Cylindrical => write!(f, "cylindrical"),
            ProjectionMode::Spherical => write!(f, "spherical"),
        }
    }
}

/// Source of point correspondences between two neighbouring projected frames.
///
/// `current` is image A (the frame being placed), `previous` is image B (its
/// already placed left neighbour).
pub trait CorrespondenceProvider {
    fn correspond(&self, current: &RgbImage, previous: &RgbImage) -> StitchResult<Correspondences>;
}

impl<T: CorrespondenceProvider + ?Sized> CorrespondenceProvider for &T {
    fn correspond(&self, current: &RgbImage, previous: &RgbImage) -> StitchResult<Correspondences> {
        (**self).correspond(current, previous)
    }
}

impl<T: CorrespondenceProvider + ?Sized> CorrespondenceProvider for Box<T> {
    fn correspond(&self, current: &RgbImage, previous: &RgbImage) -> StitchResult<Correspondences> {
        (**self).correspond(current, previous)
    }
}

/// Default worker count for the per-pixel kernels
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> StitchResult<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translations_compose_additively() {
        let t0 = GlobalTransform::from_translation(Translation::new(0.0, 12.0));
        let t3 = t0
            .then(Translation::new(10.0, 0.0))
            .then(Translation::new(8.0, 0.0))
            .then(Translation::new(12.0, 0.0));
        assert_eq!(t3.translation(), Translation::new(30.0, 12.0));
    }

    #[test]
    fn matrix_only_populates_translation_column() {
        let t = GlobalTransform::from_translation(Translation::new(3.5, -2.0));
        let m = t.matrix();
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(1, 1)], 1.0);
        assert_eq!(m[(2, 2)], 1.0);
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(0, 2)], 3.5);
        assert_eq!(m[(1, 2)], -2.0);
        assert_eq!(m[(2, 0)], 0.0);
    }

    #[test]
    fn pixel_offset_rounds_to_nearest() {
        let t = GlobalTransform::from_translation(Translation::new(4.6, -1.4));
        assert_eq!(t.pixel_offset(), (5, -1));
    }

    #[test]
    fn translation_between_keypoints_is_b_minus_a() {
        let a = Keypoint::new(10.0, 20.0);
        let b = Keypoint::new(15.0, 17.0);
        assert_eq!(Translation::between(&a, &b), Translation::new(5.0, -3.0));
    }

    #[test]
    fn insufficient_correspondences_reports_frame() {
        let err = StitchError::InsufficientCorrespondences { frame: None, found: 0 }.at_frame(3);
        assert!(err.is_insufficient_overlap());
        let msg = err.to_string();
        assert!(msg.contains("frame 3"), "{}", msg);
        assert!(!StitchError::TooFewImages { found: 1 }.is_insufficient_overlap());
    }
}
