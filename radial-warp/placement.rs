use image::{ImageBuffer, Pixel};
use radial_core::GlobalTransform;
use rayon::prelude::*;

/// Resamples `src` onto a `width`×`height` canvas shifted by `transform`.
///
/// Placement is a pure translation snapped to whole pixels; canvas pixels not
/// covered by the source stay zero and source pixels falling outside the
/// canvas are dropped.
pub fn place<P>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    transform: &GlobalTransform,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
    P::Subpixel: Send + Sync,
{
    let mut dst: ImageBuffer<P, Vec<P::Subpixel>> = ImageBuffer::new(width, height);
    let (src_w, src_h) = (src.width() as i64, src.height() as i64);
    if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
        return dst;
    }

    let (ox, oy) = transform.pixel_offset();
    let x0 = ox.clamp(0, width as i64);
    let x1 = (ox + src_w).clamp(0, width as i64);
    if x0 >= x1 {
        return dst;
    }

    let ch = P::CHANNEL_COUNT as usize;
    let src_stride = src_w as usize * ch;
    let span = (x1 - x0) as usize * ch;
    let d = x0 as usize * ch;
    let src_x = (x0 - ox) as usize * ch;
    let raw = src.as_raw();

    dst.par_chunks_mut(width as usize * ch)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = y as i64 - oy;
            if sy < 0 || sy >= src_h {
                return;
            }
            let s = sy as usize * src_stride + src_x;
            row[d..d + span].copy_from_slice(&raw[s..s + span]);
        });
    dst
}
