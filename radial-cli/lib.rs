use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use log::info;
use radial_stitch::{OrbCorrespondence, Panorama, Registration, Stitcher};
use std::path::{Path, PathBuf};

pub use radial_stitch::{self, StitchConfig, StitchError, StitchResult, StitcherBuilder};

/// Decodes every input frame, failing on the first unreadable file.
pub fn load_frames<P: AsRef<Path>>(paths: &[P]) -> StitchResult<Vec<RgbImage>> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            image::open(path)
                .map(|img| img.to_rgb8())
                .map_err(|source| StitchError::Input { path: path.to_path_buf(), source })
        })
        .collect()
}

/// Writes an image, format picked from the extension.
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> StitchResult<()> {
    let path = path.as_ref();
    image
        .save(path)
        .map_err(|source| StitchError::Output { path: path.to_path_buf(), source })
}

/// Side-by-side view of one registered pair: the placed frame on the left,
/// its left neighbour on the right, good matches joined by lines.
pub fn draw_matches(current: &RgbImage, previous: &RgbImage, registration: &Registration) -> RgbImage {
    let (cw, ch) = current.dimensions();
    let (pw, ph) = previous.dimensions();
    let mut out = RgbImage::new(cw + pw, ch.max(ph));
    imageops::replace(&mut out, current, 0, 0);
    imageops::replace(&mut out, previous, cw as i64, 0);

    let kps = &registration.correspondences;
    let inlier = Rgb([0, 255, 0]);
    for m in &registration.good_matches {
        let (Some(a), Some(b)) = (kps.keypoints_a.get(m.query), kps.keypoints_b.get(m.train)) else {
            continue;
        };
        let start = (a.x, a.y);
        let end = (b.x + cw as f32, b.y);
        draw_line_segment_mut(&mut out, start, end, inlier);
        draw_hollow_circle_mut(&mut out, (start.0 as i32, start.1 as i32), 3, Rgb([255, 0, 0]));
        draw_hollow_circle_mut(&mut out, (end.0 as i32, end.1 as i32), 3, Rgb([255, 0, 0]));
    }
    out
}

/// High-level stitcher working on files
pub struct RadialStitcher {
    stitcher: Stitcher<OrbCorrespondence>,
}

impl RadialStitcher {
    pub fn new(config: StitchConfig) -> StitchResult<Self> {
        Ok(Self { stitcher: Stitcher::new(config)? })
    }

    pub fn config(&self) -> &StitchConfig {
        self.stitcher.config()
    }

    /// Loads `paths` (left to right) and stitches them
    pub fn stitch_files<P: AsRef<Path>>(&self, paths: &[P]) -> StitchResult<Panorama> {
        if paths.len() < 2 {
            return Err(StitchError::TooFewImages { found: paths.len() });
        }
        let frames = load_frames(paths)?;
        self.stitcher.stitch(&frames)
    }

    /// Writes one match visualisation per registered pair into `dir`,
    /// returning the written paths
    pub fn write_match_debug<P: AsRef<Path>>(&self, panorama: &Panorama, dir: P) -> StitchResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(panorama.registrations.len());
        for reg in &panorama.registrations {
            let current = &panorama.frames[reg.frame].image;
            let previous = &panorama.frames[reg.frame - 1].image;
            let path = dir.join(format!("matches_{:02}_{:02}.png", reg.frame, reg.frame - 1));
            save_image(&draw_matches(current, previous, reg), &path)?;
            written.push(path);
        }
        info!("wrote {} match visualisations to {}", written.len(), dir.display());
        Ok(written)
    }
}
