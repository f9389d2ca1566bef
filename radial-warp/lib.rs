//! Per-pixel kernels of the radial stitcher: surface projection, feathering
//! masks, canvas placement and compositing.
//!
//! Every kernel is a row-parallel map over read-only inputs, so the rows are
//! distributed over the global rayon pool without further synchronisation.

use image::RgbImage;
use radial_core::{AlphaMask, StitchResult};

pub mod blend_mask;
pub mod compositor;
pub mod placement;
pub mod projection;

pub use blend_mask::{blend_mask_for, build_blend_mask};
pub use compositor::blend;
pub use placement::place;
pub use projection::SurfaceProjector;

/// A frame and its feathering mask after projection onto the radial surface
#[derive(Debug, Clone)]
pub struct ProjectedFrame {
    pub image: RgbImage,
    pub mask: AlphaMask,
}

impl ProjectedFrame {
    /// Builds the frame's blend mask on the camera plane, then projects both.
    pub fn prepare(projector: &SurfaceProjector, frame: &RgbImage) -> StitchResult<Self> {
        let mask = blend_mask_for(frame);
        let (image, mask) = projector.project_pair(frame, &mask)?;
        Ok(Self { image, mask })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use radial_core::ProjectionMode;

    #[test]
    fn test_prepare_projects_image_and_mask_together() {
        let frame = RgbImage::from_pixel(40, 30, Rgb([90, 90, 90]));
        let projector = SurfaceProjector::new(30.0, ProjectionMode::Cylindrical).unwrap();
        let projected = ProjectedFrame::prepare(&projector, &frame).unwrap();

        assert_eq!(projected.dimensions(), (40, 30));
        assert_eq!(projected.mask.dimensions(), (40, 30));
        // Centre survives projection unchanged
        assert_eq!(projected.image.get_pixel(20, 15).0, [90, 90, 90]);
        assert_eq!(projected.mask.get_pixel(20, 15).0[0], 14.0 / 15.0);
    }
}
