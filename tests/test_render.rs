mod common;

use blobextract::detection::{ComponentLabeler, HIGHLIGHT, draw_blobs};
use blobextract::error::RenderError;
use image::{Rgb, RgbImage};

use common::*;

fn labeled_square() -> BlobCollection {
    let mut img = gray_canvas(20, 20, 0);
    paint_rect(&mut img, 4, 4, 5, 5, 255);
    ImageprocLabeler::new()
        .label(&img, 0)
        .expect("labeling succeeds")
}

fn count_color(canvas: &RgbImage, color: Rgb<u8>) -> usize {
    canvas.pixels().filter(|p| **p == color).count()
}

#[test]
fn test_empty_collection_leaves_canvas_untouched() -> anyhow::Result<()> {
    let original = RgbImage::from_fn(30, 20, |x, y| Rgb([x as u8, y as u8, 7]));
    let mut canvas = original.clone();

    draw_blobs(&mut canvas, &BlobCollection::empty(30, 20), HIGHLIGHT, RenderStyle::Fill)?;

    assert_eq!(canvas.as_raw(), original.as_raw());

    Ok(())
}

#[test]
fn test_fill_paints_every_member_pixel() -> anyhow::Result<()> {
    let blobs = labeled_square();
    let mut canvas = RgbImage::new(20, 20);

    draw_blobs(&mut canvas, &blobs, HIGHLIGHT, RenderStyle::Fill)?;

    assert_eq!(count_color(&canvas, HIGHLIGHT), 25);
    assert_eq!(*canvas.get_pixel(4, 4), HIGHLIGHT);
    assert_eq!(*canvas.get_pixel(8, 8), HIGHLIGHT);
    assert_eq!(*canvas.get_pixel(9, 8), Rgb([0, 0, 0]));

    Ok(())
}

#[test]
fn test_outline_skips_interior() -> anyhow::Result<()> {
    let blobs = labeled_square();
    let mut canvas = RgbImage::new(20, 20);
    let green = Rgb([0, 255, 0]);

    draw_blobs(&mut canvas, &blobs, green, RenderStyle::Outline)?;

    assert_eq!(count_color(&canvas, green), 16);
    assert_eq!(*canvas.get_pixel(6, 6), Rgb([0, 0, 0]));
    assert_eq!(*canvas.get_pixel(4, 6), green);

    Ok(())
}

#[test]
fn test_bounding_box_draws_rectangle() -> anyhow::Result<()> {
    let mut img = gray_canvas(20, 20, 0);
    // L-shape: bounding box is larger than the blob
    paint_rect(&mut img, 2, 2, 1, 6, 255);
    paint_rect(&mut img, 2, 7, 6, 1, 255);
    let blobs = ImageprocLabeler::new().label(&img, 0)?;
    let mut canvas = RgbImage::new(20, 20);

    draw_blobs(&mut canvas, &blobs, HIGHLIGHT, RenderStyle::BoundingBox)?;

    assert_eq!(*canvas.get_pixel(7, 2), HIGHLIGHT);
    assert_eq!(*canvas.get_pixel(7, 7), HIGHLIGHT);
    assert_eq!(*canvas.get_pixel(4, 4), Rgb([0, 0, 0]));
    assert_eq!(count_color(&canvas, HIGHLIGHT), 20);

    Ok(())
}

#[test]
fn test_dimension_mismatch_is_rejected() {
    let blobs = labeled_square();
    let mut canvas = RgbImage::new(10, 10);

    let err = draw_blobs(&mut canvas, &blobs, HIGHLIGHT, RenderStyle::Fill).unwrap_err();

    assert_eq!(
        err,
        RenderError::DimensionMismatch {
            blobs: (20, 20),
            canvas: (10, 10),
        }
    );
    assert_eq!(count_color(&canvas, HIGHLIGHT), 0);
}
