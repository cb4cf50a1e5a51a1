use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::trace;

use crate::error::LabelingError;
use crate::models::{BlobBuilder, BlobCollection};

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Connected-component labeling primitive.
///
/// Implementations must be deterministic: the same image and background value
/// always yield the same blobs in the same order. An image without foreground
/// pixels yields an empty collection, not an error.
pub trait ComponentLabeler: Send + Sync {
    fn label(&self, gray: &GrayImage, background: u8) -> Result<BlobCollection, LabelingError>;

    /// Human-readable name for this labeler (used in logs and errors)
    fn name(&self) -> &str;
}

/// Labeler backed by `imageproc`'s two-pass connected components.
///
/// A pixel is foreground when its value differs from `background`. Adjacent
/// foreground pixels join the same blob whatever their intensities.
#[derive(Debug, Clone, Copy)]
pub struct ImageprocLabeler {
    connectivity: Connectivity,
}

impl ImageprocLabeler {
    /// 8-connected labeler
    pub fn new() -> Self {
        Self {
            connectivity: Connectivity::Eight,
        }
    }

    pub fn with_connectivity(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }
}

impl Default for ImageprocLabeler {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentLabeler for ImageprocLabeler {
    fn label(&self, gray: &GrayImage, background: u8) -> Result<BlobCollection, LabelingError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(BlobCollection::empty(width, height));
        }

        let mask = foreground_mask(gray, background);
        let labeled = connected_components(&mask, self.connectivity, Luma([BACKGROUND]));

        // Labels are not guaranteed to be dense, so index builders by label
        let mut builders: Vec<BlobBuilder> = Vec::new();
        for (x, y, label) in labeled.enumerate_pixels() {
            let label_val = label[0] as usize;
            if label_val == 0 {
                continue;
            }
            if builders.len() < label_val {
                builders.resize_with(label_val, BlobBuilder::new);
            }
            builders[label_val - 1].push(x, y, gray.get_pixel(x, y)[0]);
        }

        let mut builders: Vec<BlobBuilder> =
            builders.into_iter().filter(|b| !b.is_empty()).collect();
        builders.sort_by_key(|b| b.first_pixel().map(|(x, y)| (y, x)));

        let blobs: Vec<_> = builders
            .into_iter()
            .zip(1u32..)
            .filter_map(|(builder, id)| builder.build(id))
            .collect();

        trace!(
            labeler = self.name(),
            blobs = blobs.len(),
            "connected components labeled"
        );

        Ok(BlobCollection::new(width, height, blobs))
    }

    fn name(&self) -> &str {
        match self.connectivity {
            Connectivity::Four => "imageproc-4",
            Connectivity::Eight => "imageproc-8",
        }
    }
}

/// Binarize so that neighbouring foreground pixels of different gray levels
/// end up in one component.
fn foreground_mask(gray: &GrayImage, background: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] != background {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
