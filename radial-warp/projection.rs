use image::{ImageBuffer, Pixel, RgbImage};
use log::debug;
use radial_core::{AlphaMask, ProjectionMode, StitchError, StitchResult};
use rayon::prelude::*;

/// Samples whose viewing direction has no meaningful forward component are
/// skipped instead of divided through.
const MIN_DEPTH: f64 = 1e-9;

/// Inverse-mapping projector from the camera plane onto a radial surface.
///
/// For every destination pixel the direction on the cylinder or sphere is
/// computed and re-projected onto the original image plane; the nearest source
/// pixel is copied. No interpolation is performed.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceProjector {
    focal_length: f64,
    mode: ProjectionMode,
}

impl SurfaceProjector {
    /// Creates a projector, rejecting non-positive or non-finite focal lengths
    pub fn new(focal_length: f64, mode: ProjectionMode) -> StitchResult<Self> {
        if !focal_length.is_finite() || focal_length <= 0.0 {
            return Err(StitchError::InvalidFocalLength(focal_length));
        }
        Ok(Self { focal_length, mode })
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Viewing direction for a destination offset `(u, v)` from the centre.
    #[inline]
    fn direction(&self, u: f64, v: f64) -> (f64, f64, f64) {
        let theta = u / self.focal_length;
        let (sin_t, cos_t) = theta.sin_cos();
        match self.mode {
            ProjectionMode::Cylindrical => (sin_t, v / self.focal_length, cos_t),
            ProjectionMode::Spherical => {
                let (sin_p, cos_p) = (v / self.focal_length).sin_cos();
                (sin_t * cos_p, sin_p, cos_t * cos_p)
            }
        }
    }

    /// Source pixel sampled for destination pixel `(x, y)` of a `width`×`height`
    /// frame, or `None` when the sample is degenerate or out of bounds.
    pub fn source_coordinate(&self, x: u32, y: u32, width: u32, height: u32) -> Option<(u32, u32)> {
        let cx = (width / 2) as f64;
        let cy = (height / 2) as f64;
        let (dir_x, dir_y, dir_z) = self.direction(x as f64 - cx, y as f64 - cy);
        if dir_z <= MIN_DEPTH {
            return None;
        }

        let x_in = (self.focal_length * dir_x / dir_z + cx).round();
        let y_in = (self.focal_length * dir_y / dir_z + cy).round();
        if !x_in.is_finite() || !y_in.is_finite() {
            return None;
        }
        if x_in < 0.0 || y_in < 0.0 || x_in >= width as f64 || y_in >= height as f64 {
            return None;
        }
        Some((x_in as u32, y_in as u32))
    }

    /// Forward map: where a camera-plane pixel `(x_in, y_in)` lands on the
    /// projected surface.
    pub fn surface_coordinate(&self, x_in: f64, y_in: f64, width: u32, height: u32) -> (f64, f64) {
        let cx = (width / 2) as f64;
        let cy = (height / 2) as f64;
        let f = self.focal_length;
        let u = x_in - cx;
        let v = y_in - cy;
        let radius = u.hypot(f);

        let theta = u.atan2(f);
        let y = match self.mode {
            ProjectionMode::Cylindrical => f * v / radius,
            ProjectionMode::Spherical => f * v.atan2(radius),
        };
        (f * theta + cx, y + cy)
    }

    /// Re-samples any pixel type through the inverse map. Output has the
    /// input's dimensions; unmapped pixels stay zero.
    pub fn warp<P>(&self, src: &ImageBuffer<P, Vec<P::Subpixel>>) -> ImageBuffer<P, Vec<P::Subpixel>>
    where
        P: Pixel,
        P::Subpixel: Send + Sync,
    {
        let (w, h) = src.dimensions();
        let mut dst: ImageBuffer<P, Vec<P::Subpixel>> = ImageBuffer::new(w, h);
        if w == 0 || h == 0 {
            return dst;
        }

        let ch = P::CHANNEL_COUNT as usize;
        let stride = w as usize * ch;
        let raw = src.as_raw();

        dst.par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..w {
                    if let Some((sx, sy)) = self.source_coordinate(x, y as u32, w, h) {
                        let s = sy as usize * stride + sx as usize * ch;
                        let d = x as usize * ch;
                        row[d..d + ch].copy_from_slice(&raw[s..s + ch]);
                    }
                }
            });
        dst
    }

    /// Projects a colour frame.
    pub fn project(&self, image: &RgbImage) -> RgbImage {
        debug!(
            "projecting {}x{} frame ({}, f={})",
            image.width(),
            image.height(),
            self.mode,
            self.focal_length
        );
        self.warp(image)
    }

    /// Projects a feathering mask with the identical coordinate mapping.
    pub fn project_mask(&self, mask: &AlphaMask) -> AlphaMask {
        self.warp(mask)
    }

    /// Projects a frame together with its mask; both must share dimensions.
    pub fn project_pair(&self, image: &RgbImage, mask: &AlphaMask) -> StitchResult<(RgbImage, AlphaMask)> {
        if image.dimensions() != mask.dimensions() {
            return Err(StitchError::DimensionMismatch {
                expected: image.dimensions(),
                actual: mask.dimensions(),
            });
        }
        Ok((self.project(image), self.project_mask(mask)))
    }
}
