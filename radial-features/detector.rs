use image::GrayImage;
use radial_core::Keypoint;
use rayon::prelude::*;

/// Bresenham circle of radius 3 around the candidate pixel
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Contiguous arc length required by the FAST-9 segment test
const ARC: u32 = 9;

/// Corner candidate with its FAST response
#[derive(Debug, Clone, Copy)]
pub struct ScoredKeypoint {
    pub keypoint: Keypoint,
    pub response: f32,
}

/// FAST-9 corner detector with 3×3 non-maximum suppression and
/// intensity-centroid orientation.
#[derive(Debug, Clone)]
pub struct CornerDetector {
    threshold: u8,
    patch_size: usize,
    border: u32,
}

impl CornerDetector {
    pub fn new(threshold: u8, patch_size: usize) -> Self {
        let border = (patch_size as u32 / 2 + 1).max(3);
        Self { threshold, patch_size, border }
    }

    /// Pixels closer than this to any edge are never reported.
    pub fn border(&self) -> u32 {
        self.border
    }

    /// Runs the segment test on every interior pixel.
    pub fn detect_with_response(&self, img: &GrayImage) -> Vec<ScoredKeypoint> {
        let (w, h) = img.dimensions();
        if w <= 2 * self.border || h <= 2 * self.border {
            return Vec::new();
        }

        let candidates: Vec<ScoredKeypoint> = (self.border..h - self.border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in self.border..w - self.border {
                    if let Some(response) = self.segment_test(img, x, y) {
                        row.push(ScoredKeypoint {
                            keypoint: Keypoint::new(x as f32, y as f32),
                            response,
                        });
                    }
                }
                row
            })
            .collect();

        suppress_non_maxima(&candidates, w, h)
    }

    /// Detects corners, keeps the `max_features` strongest and orients them.
    pub fn detect(&self, img: &GrayImage, max_features: usize) -> Vec<Keypoint> {
        let mut scored = self.detect_with_response(img);
        // Stable sort keeps raster order among equal responses
        scored.sort_by(|a, b| b.response.total_cmp(&a.response));
        scored.truncate(max_features);

        scored
            .into_iter()
            .map(|sk| {
                let mut kp = sk.keypoint;
                kp.angle = self.orientation(img, kp.x as i32, kp.y as i32);
                kp
            })
            .collect()
    }

    /// Returns the corner response when at least `ARC` contiguous circle
    /// pixels are all brighter or all darker than the centre by the threshold.
    fn segment_test(&self, img: &GrayImage, x: u32, y: u32) -> Option<f32> {
        let p = img.get_pixel(x, y).0[0] as i32;
        let t = self.threshold as i32;

        let mut bright: u16 = 0;
        let mut dark: u16 = 0;
        let mut score = 0i32;
        for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
            let q = img.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32).0[0] as i32;
            if q >= p + t {
                bright |= 1 << i;
                score += q - p - t;
            } else if q <= p - t {
                dark |= 1 << i;
                score += p - q - t;
            }
        }

        if has_arc(bright, ARC) || has_arc(dark, ARC) {
            Some(score as f32 + 1.0)
        } else {
            None
        }
    }

    /// Angle of the intensity centroid over the square patch around `(cx, cy)`.
    pub fn orientation(&self, img: &GrayImage, cx: i32, cy: i32) -> f32 {
        let (w, h) = (img.width() as i32, img.height() as i32);
        let half = (self.patch_size / 2) as i32;
        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let yy = (cy + dy).clamp(0, h - 1) as u32;
            for dx in -half..=half {
                let xx = (cx + dx).clamp(0, w - 1) as u32;
                let val = img.get_pixel(xx, yy).0[0] as i64;
                m10 += dx as i64 * val;
                m01 += dy as i64 * val;
            }
        }
        (m01 as f32).atan2(m10 as f32)
    }
}

/// True if the 16-bit circular mask contains a run of `len` set bits.
pub fn has_arc(mask: u16, len: u32) -> bool {
    if len == 0 || len > 16 {
        return false;
    }
    let mut run = mask;
    for i in 1..len {
        run &= mask.rotate_right(i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

/// Keeps candidates that are the strongest within their 3×3 neighbourhood;
/// ties go to the candidate that comes first in raster order.
fn suppress_non_maxima(candidates: &[ScoredKeypoint], w: u32, h: u32) -> Vec<ScoredKeypoint> {
    let mut response = vec![0f32; w as usize * h as usize];
    for sk in candidates {
        response[sk.keypoint.y as usize * w as usize + sk.keypoint.x as usize] = sk.response;
    }

    candidates
        .par_iter()
        .filter(|sk| {
            let (x, y) = (sk.keypoint.x as i64, sk.keypoint.y as i64);
            let own = y * w as i64 + x;
            for ny in (y - 1)..=(y + 1) {
                for nx in (x - 1)..=(x + 1) {
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let idx = ny * w as i64 + nx;
                    if idx == own {
                        continue;
                    }
                    let other = response[idx as usize];
                    if other > sk.response || (other == sk.response && idx < own) {
                        return false;
                    }
                }
            }
            true
        })
        .copied()
        .collect()
}
