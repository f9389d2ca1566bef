use image::RgbImage;
use radial_core::AlphaMask;
use rayon::prelude::*;

/// Builds a feathering mask that is 0 on the outermost pixel ring and rises
/// linearly towards the centre.
///
/// Edge distances are counted 1-based (the edge pixel itself is at distance 1)
/// and shifted down by one, then normalised by `min(width, height) / 2` with
/// integer truncation. Degenerate frames whose shorter side is a single pixel
/// get an all-zero mask.
pub fn build_blend_mask(width: u32, height: u32) -> AlphaMask {
    let mut mask = AlphaMask::new(width, height);
    let max_dist = width.min(height) / 2;
    if max_dist == 0 {
        return mask;
    }
    let max_dist = max_dist as f64;

    mask.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y_dist = edge_distance(y as u32, height);
            for (x, alpha) in row.iter_mut().enumerate() {
                let x_dist = edge_distance(x as u32, width);
                *alpha = x_dist.min(y_dist) as f64 / max_dist;
            }
        });
    mask
}

/// Mask sized to `image`.
pub fn blend_mask_for(image: &RgbImage) -> AlphaMask {
    build_blend_mask(image.width(), image.height())
}

#[inline]
fn edge_distance(i: u32, len: u32) -> u32 {
    let leading = i + 1;
    let trailing = len - i;
    leading.min(trailing) - 1
}
