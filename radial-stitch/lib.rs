//! Registration and assembly of radially captured frames.
//!
//! Frames are projected onto a cylinder or sphere so that camera rotation
//! becomes pure translation, each frame is registered against its left
//! neighbour with a consensus translation search, and the chain of
//! accumulated translations places every frame on one feathered canvas.
//!
//! ```no_run
//! use radial_stitch::StitcherBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frames = vec![image::open("a.jpg")?.to_rgb8(), image::open("b.jpg")?.to_rgb8()];
//! let stitcher = StitcherBuilder::new().focal_length(2800.0).seed(0).build()?;
//! let panorama = stitcher.stitch(&frames)?;
//! panorama.canvas.save("panorama.jpg")?;
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod builder;
pub mod config;
pub mod estimator;
pub mod layout;
pub mod stitcher;

pub use assembler::{AssemblyState, Panorama, PanoramaAssembler, Registration};
pub use builder::StitcherBuilder;
pub use config::{StitchConfig, DEFAULT_FOCAL_LENGTH};
pub use estimator::{retain_good_matches, Estimate, EstimatorConfig, FallbackPolicy, TranslationEstimator, TrialOrder};
pub use layout::{CanvasLayout, OverlapLayout};
pub use stitcher::Stitcher;

pub use radial_core::{
    init_thread_pool, CorrespondenceProvider, Correspondences, GlobalTransform, Keypoint, Match, ProjectionMode,
    StitchError, StitchResult, Translation,
};
pub use radial_features::{OrbCorrespondence, OrbFeatureConfig};
pub use radial_warp::ProjectedFrame;
