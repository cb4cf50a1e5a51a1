use std::io;
use std::sync::{Arc, Mutex};

use blobextract::{BlobCollection, LabelingError, MemorySink};
use blobextract::detection::ComponentLabeler;
use blobextract::pipeline::FrameSink;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Creates a gray image filled with `value`
pub fn gray_canvas(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Paints a `w`×`h` rectangle with its top-left corner at (`x`, `y`)
pub fn paint_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, value: u8) {
    for yy in y..y + h {
        for xx in x..x + w {
            img.put_pixel(xx, yy, Luma([value]));
        }
    }
}

/// 200×200 black frame with a 5×10 (area 50) and a 20×25 (area 500) square
pub fn two_squares_frame() -> DynamicImage {
    let mut img = gray_canvas(200, 200, 0);
    paint_rect(&mut img, 10, 10, 5, 10, 255);
    paint_rect(&mut img, 100, 100, 20, 25, 255);
    DynamicImage::ImageLuma8(img)
}

/// Labeler whose primitive always reports failure
pub struct FailingLabeler;

impl ComponentLabeler for FailingLabeler {
    fn label(&self, _gray: &GrayImage, _background: u8) -> Result<BlobCollection, LabelingError> {
        Err(LabelingError::Primitive {
            labeler: self.name().to_string(),
            message: "malformed buffer".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Labeler whose primitive panics
pub struct PanickingLabeler;

impl ComponentLabeler for PanickingLabeler {
    fn label(&self, _gray: &GrayImage, _background: u8) -> Result<BlobCollection, LabelingError> {
        panic!("label table overflow")
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Sink that rejects the annotated image after staging the blobs
#[derive(Default)]
pub struct BrokenImageSink {
    pub staged_blobs: Option<BlobCollection>,
    pub published: Vec<BlobCollection>,
    pub aborts: usize,
}

impl FrameSink for BrokenImageSink {
    fn write_blobs(&mut self, blobs: &BlobCollection) -> anyhow::Result<()> {
        self.staged_blobs = Some(blobs.clone());
        Ok(())
    }

    fn write_image(&mut self, _image: &RgbImage) -> anyhow::Result<()> {
        anyhow::bail!("output stream closed")
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        self.published.extend(self.staged_blobs.take());
        Ok(())
    }

    fn abort(&mut self) {
        self.staged_blobs = None;
        self.aborts += 1;
    }
}

/// Sink that panics while staging the image on its first frame only
#[derive(Default)]
pub struct PanickingSink {
    pub inner: MemorySink,
    pub aborts: usize,
    armed_once: bool,
}

impl FrameSink for PanickingSink {
    fn write_blobs(&mut self, blobs: &BlobCollection) -> anyhow::Result<()> {
        self.inner.write_blobs(blobs)
    }

    fn write_image(&mut self, image: &RgbImage) -> anyhow::Result<()> {
        if !self.armed_once {
            self.armed_once = true;
            panic!("encoder state corrupted");
        }
        self.inner.write_image(image)
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        self.inner.commit()
    }

    fn abort(&mut self) {
        self.aborts += 1;
        self.inner.abort();
    }
}

/// In-memory writer for capturing `tracing` output in tests
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer poisoned")).into_owned()
    }

    /// Runs `f` with a subscriber that records every event into this buffer
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
