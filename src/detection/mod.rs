pub mod filter;
pub mod labeling;
pub mod preprocessing;
pub mod render;

pub use filter::{
    BlobAttribute, BlobMeasure, CompareOp, FilterMode, FilterSpec, MeasureFn, SortOrder, filter,
    filter_all,
};
pub use labeling::{ComponentLabeler, ImageprocLabeler};
pub use preprocessing::{NormalizedFrame, normalize};
pub use render::{HIGHLIGHT, RenderStyle, draw_blobs};
