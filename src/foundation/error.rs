use crate::layer_cost::LayerKind;

/// Result alias used throughout the crate.
pub type TerrapathResult<T> = Result<T, TerrapathError>;

/// Errors raised by the cost-surface pipeline and its raster shell.
#[derive(thiserror::Error, Debug)]
pub enum TerrapathError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}"
    )]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("missing weight for layer '{0}'")]
    MissingWeight(LayerKind),

    #[error("path trace stuck at ({x}, {y}): no unvisited neighbour left")]
    PathTraceStuck { x: usize, y: usize },

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TerrapathError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn dimension_mismatch(expected: (usize, usize), got: (usize, usize)) -> Self {
        Self::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: got.0,
            height: got.1,
        }
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
