use image::RgbImage;
use radial_core::{AlphaMask, StitchError, StitchResult};
use rayon::prelude::*;

/// Alpha-blends `new_image` into `canvas` in place.
///
/// A canvas pixel counts as populated when its first channel is non-zero, so an
/// opaque pixel whose first channel is exactly 0 is indistinguishable from an
/// empty one and gets overwritten. Where both the canvas and the new pixel are
/// populated the result is the mask-weighted average of the two; where the
/// canvas is empty the new pixel is copied regardless of its weight.
pub fn blend(
    new_image: &RgbImage,
    new_mask: &AlphaMask,
    canvas: &mut RgbImage,
    canvas_mask: &AlphaMask,
) -> StitchResult<()> {
    let expected = canvas.dimensions();
    for actual in [new_image.dimensions(), new_mask.dimensions(), canvas_mask.dimensions()] {
        if actual != expected {
            return Err(StitchError::DimensionMismatch { expected, actual });
        }
    }
    if expected.0 == 0 || expected.1 == 0 {
        return Ok(());
    }

    let w = expected.0 as usize;
    canvas
        .par_chunks_mut(w * 3)
        .zip(new_image.par_chunks(w * 3))
        .zip(new_mask.par_chunks(w))
        .zip(canvas_mask.par_chunks(w))
        .for_each(|(((canvas_row, new_row), new_alpha), canvas_alpha)| {
            for x in 0..w {
                let px = 3 * x..3 * x + 3;
                blend_pixel(&mut canvas_row[px.clone()], &new_row[px], new_alpha[x], canvas_alpha[x]);
            }
        });
    Ok(())
}

#[inline]
fn blend_pixel(canvas: &mut [u8], new: &[u8], a_new: f64, a_canvas: f64) {
    let occupied = canvas[0] != 0;
    if occupied && new[0] != 0 {
        let weight = a_new + a_canvas;
        if weight <= 0.0 {
            return;
        }
        for (c, &n) in canvas.iter_mut().zip(new) {
            *c = ((a_new * n as f64 + a_canvas * *c as f64) / weight) as u8;
        }
    } else if !occupied {
        canvas.copy_from_slice(new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn single(px: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(1, 1, Rgb(px))
    }

    fn alpha(a: f64) -> AlphaMask {
        AlphaMask::from_pixel(1, 1, Luma([a]))
    }

    #[test]
    fn test_opaque_pixel_onto_empty_canvas_is_copied() {
        let mut canvas = single([0, 0, 0]);
        blend(&single([12, 34, 56]), &alpha(1.0), &mut canvas, &alpha(0.0)).unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, [12, 34, 56]);
    }

    #[test]
    fn test_empty_canvas_ignores_weights() {
        let mut canvas = single([0, 90, 90]);
        blend(&single([7, 8, 9]), &alpha(0.0), &mut canvas, &alpha(1.0)).unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, [7, 8, 9]);
    }

    #[test]
    fn test_equal_weights_give_mean() {
        let mut canvas = single([100, 20, 250]);
        blend(&single([50, 60, 10]), &alpha(0.5), &mut canvas, &alpha(0.5)).unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, [75, 40, 130]);
    }

    #[test]
    fn test_weighted_average_truncates() {
        let mut canvas = single([30, 30, 30]);
        blend(&single([200, 200, 200]), &alpha(0.75), &mut canvas, &alpha(0.25)).unwrap();
        // 0.75 * 200 + 0.25 * 30 = 157.5
        assert_eq!(canvas.get_pixel(0, 0).0, [157, 157, 157]);
    }

    #[test]
    fn test_zero_total_weight_keeps_canvas() {
        let mut canvas = single([40, 50, 60]);
        blend(&single([200, 200, 200]), &alpha(0.0), &mut canvas, &alpha(0.0)).unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, [40, 50, 60]);
    }

    #[test]
    fn test_empty_new_pixel_keeps_canvas() {
        let mut canvas = single([40, 50, 60]);
        blend(&single([0, 255, 255]), &alpha(1.0), &mut canvas, &alpha(0.0)).unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, [40, 50, 60]);
    }

    #[test]
    fn test_black_first_channel_reads_as_empty() {
        // Known limitation of the channel-0 occupancy test
        let mut canvas = single([0, 200, 0]);
        blend(&single([10, 10, 10]), &alpha(0.1), &mut canvas, &alpha(0.9)).unwrap();
        assert_eq!(canvas.get_pixel(0, 0).0, [10, 10, 10]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut canvas = RgbImage::new(4, 4);
        let mask = AlphaMask::new(4, 4);
        let result = blend(&RgbImage::new(4, 3), &mask, &mut canvas, &mask);
        assert!(matches!(
            result,
            Err(StitchError::DimensionMismatch { expected: (4, 4), actual: (4, 3) })
        ));

        let result = blend(&RgbImage::new(4, 4), &AlphaMask::new(5, 4), &mut canvas, &mask);
        assert!(matches!(result, Err(StitchError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_rows_blend_independently() {
        let mut canvas = RgbImage::from_fn(8, 6, |x, _| if x < 4 { Rgb([100, 100, 100]) } else { Rgb([0, 0, 0]) });
        let new = RgbImage::from_pixel(8, 6, Rgb([200, 200, 200]));
        let ones = AlphaMask::from_pixel(8, 6, Luma([1.0]));
        blend(&new, &ones, &mut canvas, &ones).unwrap();
        for (x, _, px) in canvas.enumerate_pixels() {
            let expected = if x < 4 { 150 } else { 200 };
            assert_eq!(px.0, [expected; 3]);
        }
    }
}
