use image::RgbImage;
use log::{debug, info};
use radial_core::{
    AlphaMask, CorrespondenceProvider, Correspondences, GlobalTransform, Match, StitchError, StitchResult,
};
use radial_warp::{blend, place, ProjectedFrame, SurfaceProjector};

use crate::config::StitchConfig;
use crate::estimator::{retain_good_matches, Estimate, TranslationEstimator};
use crate::layout::CanvasLayout;

/// Stage the assembler will execute next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// Canvas not yet allocated; frame 0 is placed next
    Init,
    /// Frame `i` is registered against frame `i - 1` and composited next
    Placing(usize),
    /// Canvas holds the final panorama
    Done,
}

/// Report of one pairwise registration
#[derive(Debug, Clone)]
pub struct Registration {
    /// Index of the frame that was placed (registered against `frame - 1`)
    pub frame: usize,
    pub correspondences: Correspondences,
    /// Matches that survived distance trimming
    pub good_matches: Vec<Match>,
    pub estimate: Estimate,
}

impl Registration {
    pub fn raw_matches(&self) -> usize {
        self.correspondences.matches.len()
    }
}

/// Finished panorama and the per-frame bookkeeping that produced it
#[derive(Debug, Clone)]
pub struct Panorama {
    pub canvas: RgbImage,
    /// Placement of every frame, `transforms[0]` being the layout origin
    pub transforms: Vec<GlobalTransform>,
    /// One entry per frame from 1 on
    pub registrations: Vec<Registration>,
    /// Projected frames and their masks, in input order
    pub frames: Vec<ProjectedFrame>,
}

/// Sequential panorama pipeline: frame `i` is always registered against
/// frame `i - 1`, so errors accumulate along the chain.
pub struct PanoramaAssembler<P> {
    frames: Vec<ProjectedFrame>,
    provider: P,
    estimator: TranslationEstimator,
    layout: Box<dyn CanvasLayout>,
    good_match_factor: f32,
    good_match_ceiling: f32,
    state: AssemblyState,
    canvas: RgbImage,
    transforms: Vec<GlobalTransform>,
    registrations: Vec<Registration>,
}

impl<P: CorrespondenceProvider> PanoramaAssembler<P> {
    /// Projects every frame and its blend mask onto the configured surface.
    pub fn new(frames: &[RgbImage], config: &StitchConfig, provider: P) -> StitchResult<Self> {
        if frames.len() < 2 {
            return Err(StitchError::TooFewImages { found: frames.len() });
        }
        config.validate()?;

        let expected = frames[0].dimensions();
        if let Some(frame) = frames.iter().find(|f| f.dimensions() != expected) {
            return Err(StitchError::DimensionMismatch { expected, actual: frame.dimensions() });
        }

        let projector = SurfaceProjector::new(config.focal_length, config.projection)?;
        let frames = frames
            .iter()
            .map(|f| ProjectedFrame::prepare(&projector, f))
            .collect::<StitchResult<Vec<_>>>()?;

        Ok(Self {
            frames,
            provider,
            estimator: TranslationEstimator::new(config.estimator),
            layout: Box::new(config.layout),
            good_match_factor: config.good_match_factor,
            good_match_ceiling: config.good_match_ceiling,
            state: AssemblyState::Init,
            canvas: RgbImage::new(0, 0),
            transforms: Vec::new(),
            registrations: Vec::new(),
        })
    }

    /// Replaces the canvas layout. Only possible before the canvas exists.
    pub fn with_layout(mut self, layout: Box<dyn CanvasLayout>) -> Self {
        if self.state == AssemblyState::Init {
            self.layout = layout;
        }
        self
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn frames(&self) -> &[ProjectedFrame] {
        &self.frames
    }

    pub fn transforms(&self) -> &[GlobalTransform] {
        &self.transforms
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// Executes one stage and returns the state reached. A failed stage
    /// leaves the state unchanged.
    pub fn advance(&mut self) -> StitchResult<AssemblyState> {
        let next = match self.state {
            AssemblyState::Init => {
                self.place_first();
                AssemblyState::Placing(1)
            }
            AssemblyState::Placing(i) => {
                self.place_frame(i)?;
                if i + 1 < self.frames.len() {
                    AssemblyState::Placing(i + 1)
                } else {
                    AssemblyState::Done
                }
            }
            AssemblyState::Done => AssemblyState::Done,
        };
        self.state = next;
        Ok(next)
    }

    /// Drives the pipeline to completion.
    pub fn run(mut self) -> StitchResult<Panorama> {
        info!("Stitching {} images...", self.frames.len());
        while self.advance()? != AssemblyState::Done {}
        Ok(Panorama {
            canvas: self.canvas,
            transforms: self.transforms,
            registrations: self.registrations,
            frames: self.frames,
        })
    }

    fn place_first(&mut self) {
        let (fw, fh) = self.frames[0].dimensions();
        let (cw, ch) = self.layout.canvas_size(fw, fh, self.frames.len());
        let origin = GlobalTransform::from_translation(self.layout.origin((cw, ch), (fw, fh)));
        debug!("canvas {}x{}, frame 0 at {:?}", cw, ch, origin.pixel_offset());

        self.canvas = place(&self.frames[0].image, &origin, cw, ch);
        self.transforms = vec![origin];
        self.registrations.clear();
    }

    fn place_frame(&mut self, i: usize) -> StitchResult<()> {
        let current = &self.frames[i];
        let previous = &self.frames[i - 1];

        let correspondences = self.provider.correspond(&current.image, &previous.image)?;
        let good = retain_good_matches(&correspondences.matches, self.good_match_factor, self.good_match_ceiling);
        info!("{} feature point matches", good.len());
        if good.is_empty() {
            return Err(StitchError::InsufficientCorrespondences { frame: Some(i), found: 0 });
        }

        let estimate = self
            .estimator
            .estimate(&good, &correspondences.keypoints_a, &correspondences.keypoints_b)
            .map_err(|e| e.at_frame(i))?;

        let transform = self.transforms[i - 1].then(estimate.translation);
        let (cw, ch) = self.canvas.dimensions();
        let image = place(&current.image, &transform, cw, ch);
        let mask: AlphaMask = place(&current.mask, &transform, cw, ch);
        let overlap: AlphaMask = place(&previous.mask, &self.transforms[i - 1], cw, ch);
        blend(&image, &mask, &mut self.canvas, &overlap)?;

        debug!(
            "frame {} placed at {:?} (pairwise {:.2}, {:.2})",
            i,
            transform.pixel_offset(),
            estimate.translation.dx,
            estimate.translation.dy
        );
        self.transforms.push(transform);
        self.registrations.push(Registration {
            frame: i,
            correspondences,
            good_matches: good,
            estimate,
        });
        Ok(())
    }
}
