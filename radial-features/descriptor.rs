use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use radial_core::{Descriptor, Keypoint};
use rayon::prelude::*;

const DESCRIPTOR_BITS: usize = 256;

/// Steered BRIEF descriptor generator.
///
/// The 256 sampling pairs are drawn once from a seeded generator inside the
/// patch, so two generators built with the same seed and patch size produce
/// comparable descriptors.
#[derive(Debug, Clone)]
pub struct BriefGenerator {
    pairs: Vec<(i32, i32, i32, i32)>,
}

impl BriefGenerator {
    pub fn new(patch_size: usize, seed: u64) -> Self {
        let half = (patch_size / 2).max(1) as i32;
        let mut rng = StdRng::seed_from_u64(seed);
        let pairs = (0..DESCRIPTOR_BITS)
            .map(|_| {
                (
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                )
            })
            .collect();
        Self { pairs }
    }

    pub fn generate_descriptors(&self, img: &GrayImage, kps: &[Keypoint]) -> Vec<Descriptor> {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return vec![[0u8; 32]; kps.len()];
        }
        let sample = |x: f32, y: f32| -> u8 {
            let xx = x.round().clamp(0.0, (w - 1) as f32) as u32;
            let yy = y.round().clamp(0.0, (h - 1) as f32) as u32;
            img.get_pixel(xx, yy).0[0]
        };

        kps.par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let mut d = [0u8; 32];
                for (i, &(dx1, dy1, dx2, dy2)) in self.pairs.iter().enumerate() {
                    let (dx1, dy1, dx2, dy2) = (dx1 as f32, dy1 as f32, dx2 as f32, dy2 as f32);
                    let a = sample(kp.x + c * dx1 - s * dy1, kp.y + s * dx1 + c * dy1);
                    let b = sample(kp.x + c * dx2 - s * dy2, kp.y + s * dx2 + c * dy2);
                    let bit = (a < b) as u8;
                    d[i >> 3] |= bit << (7 - (i & 7));
                }
                d
            })
            .collect()
    }
}
