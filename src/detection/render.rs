use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::error::RenderError;
use crate::models::{Blob, BlobCollection};

/// Highlight color used for kept blobs
pub const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderStyle {
    /// Paint every member pixel
    #[default]
    Fill,
    /// Paint member pixels that touch a non-member 4-neighbour
    Outline,
    /// Hollow bounding rectangle
    BoundingBox,
}

/// Draw `blobs` onto `canvas` in place.
///
/// The canvas must have the size of the frame the blobs were labeled on;
/// otherwise it is left untouched.
pub fn draw_blobs(
    canvas: &mut RgbImage,
    blobs: &BlobCollection,
    color: Rgb<u8>,
    style: RenderStyle,
) -> Result<(), RenderError> {
    if blobs.dimensions() != canvas.dimensions() {
        return Err(RenderError::DimensionMismatch {
            blobs: blobs.dimensions(),
            canvas: canvas.dimensions(),
        });
    }

    for blob in blobs {
        match style {
            RenderStyle::Fill => fill(canvas, blob, color),
            RenderStyle::Outline => outline(canvas, blob, color),
            RenderStyle::BoundingBox => {
                let bbox = blob.bbox();
                let rect = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height);
                draw_hollow_rect_mut(canvas, rect, color);
            }
        }
    }

    Ok(())
}

fn fill(canvas: &mut RgbImage, blob: &Blob, color: Rgb<u8>) {
    for (x, y) in blob.pixels() {
        canvas.put_pixel(x, y, color);
    }
}

fn outline(canvas: &mut RgbImage, blob: &Blob, color: Rgb<u8>) {
    for (x, y) in blob.pixels() {
        let interior = x > 0
            && y > 0
            && blob.contains(x - 1, y)
            && blob.contains(x + 1, y)
            && blob.contains(x, y - 1)
            && blob.contains(x, y + 1);
        if !interior {
            canvas.put_pixel(x, y, color);
        }
    }
}
