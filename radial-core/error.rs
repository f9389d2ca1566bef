use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the stitching pipeline.
///
/// Nothing in the pipeline retries; every variant is reported synchronously to
/// whoever drives the assembler.
#[derive(Debug, Error)]
pub enum StitchError {
    /// An input frame could not be decoded.
    #[error("could not read image {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The composited panorama could not be written.
    #[error("could not write panorama to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("buffer size mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// No usable match survived trimming, so the pair cannot be registered.
    #[error("images do not overlap enough{}: {found} usable matches", frame_suffix(*frame))]
    InsufficientCorrespondences { frame: Option<usize>, found: usize },

    #[error("match refers to keypoint {index} but only {available} exist")]
    InvalidMatch { index: usize, available: usize },

    #[error("at least 2 images are required, got {found}")]
    TooFewImages { found: usize },

    #[error("invalid focal length {0} (must be finite and > 0)")]
    InvalidFocalLength(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn frame_suffix(frame: Option<usize>) -> String {
    match frame {
        Some(i) => format!(" (frame {} against frame {})", i, i.saturating_sub(1)),
        None => String::new(),
    }
}

impl StitchError {
    /// Attaches the index of the frame being registered to an
    /// `InsufficientCorrespondences` error; other variants pass through.
    pub fn at_frame(self, index: usize) -> Self {
        match self {
            StitchError::InsufficientCorrespondences { found, .. } => {
                StitchError::InsufficientCorrespondences { frame: Some(index), found }
            }
            other => other,
        }
    }

    /// True when the failure means two neighbouring frames share too little
    /// content, as opposed to a generic processing failure.
    pub fn is_insufficient_overlap(&self) -> bool {
        matches!(self, StitchError::InsufficientCorrespondences { .. })
    }
}

pub type StitchResult<T> = Result<T, StitchError>;
