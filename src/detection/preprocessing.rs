use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::error::ExtractError;

/// The two buffers every frame is split into
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    /// Single-channel buffer handed to the labeler
    pub gray: GrayImage,
    /// Three-channel buffer the blobs are drawn on
    pub color: RgbImage,
}

/// Split an input image into an 8-bit gray buffer and an 8-bit RGB buffer of
/// the same size.
///
/// Single-channel input is cast into `gray` and replicated into `color`;
/// three-channel input is cast into `color` and reduced to luminance for
/// `gray`. Deeper samples saturate at 255 instead of being rescaled, so a
/// 16-bit frame holding values in `0..=255` keeps them unchanged. Layouts with
/// an alpha channel are rejected.
pub fn normalize(input: &DynamicImage) -> Result<NormalizedFrame, ExtractError> {
    match input {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => {
            let gray = to_grayscale(input)?;
            let color = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
            Ok(NormalizedFrame { gray, color })
        }
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
            let color = to_color(input)?;
            let gray = DynamicImage::ImageRgb8(color.clone()).to_luma8();
            Ok(NormalizedFrame { gray, color })
        }
        other => Err(unsupported(other)),
    }
}

/// Cast a single-channel image to 8 bits, saturating deeper samples
pub fn to_grayscale(img: &DynamicImage) -> Result<GrayImage, ExtractError> {
    match img {
        DynamicImage::ImageLuma8(gray) => Ok(gray.clone()),
        DynamicImage::ImageLuma16(gray) => Ok(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([saturate_u16(gray.get_pixel(x, y)[0])])
        })),
        other => Err(unsupported(other)),
    }
}

fn to_color(img: &DynamicImage) -> Result<RgbImage, ExtractError> {
    match img {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb.clone()),
        DynamicImage::ImageRgb16(rgb) => Ok(RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            Rgb(rgb.get_pixel(x, y).0.map(saturate_u16))
        })),
        DynamicImage::ImageRgb32F(rgb) => Ok(RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            Rgb(rgb.get_pixel(x, y).0.map(saturate_f32))
        })),
        other => Err(unsupported(other)),
    }
}

fn saturate_u16(v: u16) -> u8 {
    v.min(u8::MAX as u16) as u8
}

/// Round to nearest and clamp; NaN maps to 0
fn saturate_f32(v: f32) -> u8 {
    v.round().clamp(0.0, u8::MAX as f32) as u8
}

fn unsupported(img: &DynamicImage) -> ExtractError {
    ExtractError::invalid_input(format!(
        "expected 1 or 3 channels, got {} ({:?})",
        img.color().channel_count(),
        img.color()
    ))
}
