use radial_core::{StitchError, StitchResult, Translation};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decides how large the panorama canvas is and where the first frame lands.
///
/// The canvas is allocated once, before any registration, so the layout can
/// only use the frame dimensions and the frame count.
pub trait CanvasLayout {
    /// Canvas `(width, height)` for `frames` projected frames of `frame_width`×`frame_height`.
    fn canvas_size(&self, frame_width: u32, frame_height: u32, frames: usize) -> (u32, u32);

    /// Offset of frame 0 on a canvas of the given size.
    fn origin(&self, canvas: (u32, u32), frame: (u32, u32)) -> Translation;
}

impl<T: CanvasLayout + ?Sized> CanvasLayout for Box<T> {
    fn canvas_size(&self, frame_width: u32, frame_height: u32, frames: usize) -> (u32, u32) {
        (**self).canvas_size(frame_width, frame_height, frames)
    }

    fn origin(&self, canvas: (u32, u32), frame: (u32, u32)) -> Translation {
        (**self).origin(canvas, frame)
    }
}

/// Left-to-right strip assuming every neighbouring pair overlaps by the same
/// fraction of the frame width.
///
/// Frame 0 sits on the left edge, vertically centred. The size is an upper
/// bound heuristic: frames that drift further than the slack allows are
/// clipped at the canvas border.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OverlapLayout {
    /// Expected horizontal overlap between neighbours, in [0, 1)
    pub overlap: f64,
    /// Canvas height as a multiple of the frame height
    pub height_scale: f64,
}

impl Default for OverlapLayout {
    fn default() -> Self {
        Self { overlap: 0.5, height_scale: 1.2 }
    }
}

impl OverlapLayout {
    pub fn validate(&self) -> StitchResult<()> {
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(StitchError::InvalidConfig(format!(
                "overlap {} must be in [0, 1)",
                self.overlap
            )));
        }
        if !self.height_scale.is_finite() || self.height_scale < 1.0 {
            return Err(StitchError::InvalidConfig(format!(
                "height scale {} must be >= 1",
                self.height_scale
            )));
        }
        Ok(())
    }
}

impl CanvasLayout for OverlapLayout {
    fn canvas_size(&self, frame_width: u32, frame_height: u32, frames: usize) -> (u32, u32) {
        let w = frame_width as f64;
        let extra = frames.saturating_sub(1) as f64 * (1.0 - self.overlap) * w;
        ((w + extra) as u32, (self.height_scale * frame_height as f64) as u32)
    }

    fn origin(&self, canvas: (u32, u32), frame: (u32, u32)) -> Translation {
        let dy = (canvas.1 / 2) as i64 - (frame.1 / 2) as i64;
        Translation::new(0.0, dy as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_canvas_size() {
        let layout = OverlapLayout::default();
        assert_eq!(layout.canvas_size(40, 20, 3), (80, 24));
        assert_eq!(layout.canvas_size(640, 480, 5), (1920, 576));
        assert_eq!(layout.canvas_size(40, 20, 1), (40, 24));
    }

    #[test]
    fn test_height_is_truncated() {
        // 1.2 * 33 = 39.6
        assert_eq!(OverlapLayout::default().canvas_size(10, 33, 2).1, 39);
    }

    #[test]
    fn test_origin_centres_vertically() {
        let layout = OverlapLayout::default();
        assert_eq!(layout.origin((80, 24), (40, 20)), Translation::new(0.0, 2.0));
        assert_eq!(layout.origin((10, 39), (10, 33)), Translation::new(0.0, 3.0));
    }

    #[test]
    fn test_custom_overlap() {
        let layout = OverlapLayout { overlap: 0.25, height_scale: 1.0 };
        assert_eq!(layout.canvas_size(100, 50, 3), (250, 50));
    }

    #[test]
    fn test_validation() {
        assert!(OverlapLayout::default().validate().is_ok());
        assert!(OverlapLayout { overlap: 1.0, ..Default::default() }.validate().is_err());
        assert!(OverlapLayout { overlap: -0.1, ..Default::default() }.validate().is_err());
        assert!(OverlapLayout { height_scale: 0.9, ..Default::default() }.validate().is_err());
        assert!(OverlapLayout { height_scale: f64::NAN, ..Default::default() }.validate().is_err());
    }
}
