use thiserror::Error;

/// Errors raised by network construction, inference and the metrics pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("tensor of shape {shape:?} needs {expected} values, buffer holds {actual}")]
    BufferLength {
        shape: (usize, usize, usize),
        expected: usize,
        actual: usize,
    },

    #[error("padded {axis} {padded} is not divisible by {divisor} ({levels} pooling stages)")]
    IndivisibleDimension {
        axis: &'static str,
        padded: usize,
        divisor: usize,
        levels: usize,
    },

    #[error("invalid network spec: {0}")]
    InvalidSpec(String),

    #[error("volume {volume} has {slices} slices; at least {required} are needed to crop {margin} from each end")]
    VolumeTooShort {
        volume: usize,
        slices: usize,
        required: usize,
        margin: usize,
    },

    #[error("ragged metric set: {0}")]
    Ragged(String),

    #[error("paired samples differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("all paired differences are zero; the signed-rank test is undefined")]
    ZeroDifferences,

    #[error("statistics error: {0}")]
    Stats(String),

    #[error("empty input: {0}")]
    Empty(&'static str),

    #[error("failed to read npy file {path}: {message}")]
    Npy { path: String, message: String },

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
