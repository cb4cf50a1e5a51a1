//! Error types for blob extraction.
//!
//! Only [`ExtractError::InvalidInput`] escapes a frame call. Labeling and
//! post-labeling failures are caught by the pipeline and turned into a
//! skipped frame.

use thiserror::Error;

/// Stage of the per-frame pipeline an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalization,
    Labeling,
    Filtering,
    Rendering,
    DebugDump,
    Emission,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Normalization => write!(f, "normalization"),
            Stage::Labeling => write!(f, "labeling"),
            Stage::Filtering => write!(f, "filtering"),
            Stage::Rendering => write!(f, "rendering"),
            Stage::DebugDump => write!(f, "debug dump"),
            Stage::Emission => write!(f, "emission"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The input image cannot be normalized (unsupported channel layout).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The connected-component primitive did not produce a result.
    #[error("labeling failed")]
    Labeling(#[from] LabelingError),

    /// Anything that went wrong after a successful labeling pass.
    #[error("{stage} failed")]
    Unexpected {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ExtractError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn unexpected(
        stage: Stage,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unexpected {
            stage,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ExtractError::InvalidInput { .. } => Stage::Normalization,
            ExtractError::Labeling(_) => Stage::Labeling,
            ExtractError::Unexpected { stage, .. } => *stage,
        }
    }
}

#[derive(Error, Debug)]
pub enum LabelingError {
    #[error("labeler `{labeler}` panicked: {message}")]
    Panicked { labeler: String, message: String },

    #[error("labeler `{labeler}` failed: {message}")]
    Primitive { labeler: String, message: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("min_size {value} is outside [0, {max}]")]
    MinSizeOutOfRange { value: u32, max: u32 },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("blobs were labeled on a {blobs:?} frame but the canvas is {canvas:?}")]
    DimensionMismatch {
        blobs: (u32, u32),
        canvas: (u32, u32),
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown blob attribute `{0}`")]
pub struct UnknownAttribute(pub String);

/// A stage panicked; carries the panic message
#[derive(Error, Debug)]
#[error("panicked: {0}")]
pub struct StagePanic(pub String);

impl StagePanic {
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self(message)
    }
}

#[derive(Error, Debug)]
pub enum DebugDirError {
    #[error("debug directory is not empty: {}", .0.display())]
    NotEmpty(std::path::PathBuf),

    #[error("cannot prepare debug directory {}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
