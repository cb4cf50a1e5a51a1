#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from blobextract for tests
pub use blobextract::detection::{
    BlobAttribute, CompareOp, FilterMode, FilterSpec, ImageprocLabeler, RenderStyle, SortOrder,
};
pub use blobextract::{
    Blob, BlobCollection, BlobPipeline, ExtractError, ExtractorConfig, FrameOutcome, MemorySink,
    Stage,
};
