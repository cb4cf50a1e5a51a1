pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod sink;

pub use config::{ExtractorConfig, MAX_MIN_SIZE};
pub use error::{DebugDirError, ExtractError, LabelingError, Stage};
pub use models::{Blob, BlobBuilder, BlobCollection, BoundingBox, PixelRun};
pub use pipeline::{
    BlobPipeline, DebugConfig, FrameOutcome, FrameOutput, FrameSink, FrameSkip, FrameStats,
};
pub use sink::{FileSink, MemorySink};
