use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use tracing::{debug, error, info, warn};

use crate::config::ExtractorConfig;
use crate::detection::{
    ComponentLabeler, FilterSpec, HIGHLIGHT, ImageprocLabeler, NormalizedFrame, RenderStyle,
    draw_blobs, normalize,
};
use crate::error::{DebugDirError, ExtractError, LabelingError, Stage, StagePanic};
use crate::models::BlobCollection;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Blob counts and timing of one emitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    /// Blobs produced by the labeler
    pub raw_blobs: usize,
    /// Blobs left after the area filter
    pub kept_blobs: usize,
    pub elapsed: Duration,
}

/// Both outputs of a successfully processed frame
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Color buffer with kept blobs drawn on it
    pub image: RgbImage,
    /// Blobs that passed the area filter, in labeling order
    pub blobs: BlobCollection,
    pub stats: FrameStats,
}

/// A frame that produced no outputs
#[derive(Debug)]
pub struct FrameSkip {
    pub frame: u64,
    pub error: ExtractError,
}

impl FrameSkip {
    pub fn stage(&self) -> Stage {
        self.error.stage()
    }
}

#[derive(Debug)]
pub enum FrameOutcome {
    Emitted(FrameOutput),
    Skipped(FrameSkip),
}

impl FrameOutcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, FrameOutcome::Emitted(_))
    }

    pub fn output(&self) -> Option<&FrameOutput> {
        match self {
            FrameOutcome::Emitted(output) => Some(output),
            FrameOutcome::Skipped(_) => None,
        }
    }
}

/// Receiver of the pipeline's per-frame outputs.
///
/// `write_blobs` and `write_image` only stage a frame's outputs. Nothing is
/// published until `commit`; after any failure the pipeline calls `abort`,
/// which must discard whatever was staged.
pub trait FrameSink {
    fn write_blobs(&mut self, blobs: &BlobCollection) -> Result<()>;

    fn write_image(&mut self, image: &RgbImage) -> Result<()>;

    /// Publish both staged outputs
    fn commit(&mut self) -> Result<()>;

    /// Drop staged outputs of a failed frame
    fn abort(&mut self);

    /// Processing time of an emitted frame
    fn record_elapsed(&mut self, _elapsed: Duration) {}
}

/// Blob extraction pipeline: normalize, label, filter by area, render.
///
/// One call processes one frame; no state besides a frame counter is kept
/// between calls, so a failed frame never affects the next one.
pub struct BlobPipeline {
    labeler: Arc<dyn ComponentLabeler>,
    highlight: Rgb<u8>,
    style: RenderStyle,
    debug: Option<DebugConfig>,
    frames: AtomicU64,
}

impl std::fmt::Debug for BlobPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobPipeline")
            .field("highlight", &self.highlight)
            .field("style", &self.style)
            .field("debug", &self.debug)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl BlobPipeline {
    /// Pipeline with the 8-connected imageproc labeler and red fill
    pub fn new() -> Self {
        Self {
            labeler: Arc::new(ImageprocLabeler::new()),
            highlight: HIGHLIGHT,
            style: RenderStyle::Fill,
            debug: None,
            frames: AtomicU64::new(0),
        }
    }

    pub fn with_labeler(mut self, labeler: Arc<dyn ComponentLabeler>) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn with_highlight(mut self, color: Rgb<u8>) -> Self {
        self.highlight = color;
        self
    }

    pub fn with_render_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Dump per-frame buffers under `output_dir`, which must be empty or absent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self, DebugDirError> {
        match std::fs::read_dir(&output_dir) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    return Err(DebugDirError::NotEmpty(output_dir));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Err(source) = std::fs::create_dir_all(&output_dir) {
                    return Err(DebugDirError::Io {
                        path: output_dir,
                        source,
                    });
                }
            }
            Err(source) => {
                return Err(DebugDirError::Io {
                    path: output_dir,
                    source,
                });
            }
        }

        self.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    pub fn labeler_name(&self) -> &str {
        self.labeler.name()
    }

    /// Process one frame.
    ///
    /// Returns `Err` only for input that cannot be normalized. Labeling and
    /// later failures are logged and reported as [`FrameOutcome::Skipped`].
    pub fn process_frame(
        &self,
        input: &DynamicImage,
        config: &ExtractorConfig,
    ) -> Result<FrameOutcome, ExtractError> {
        let started = Instant::now();
        let frame = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            frame,
            width = input.width(),
            height = input.height(),
            color = ?input.color(),
            min_size = config.min_size,
            background = config.background,
            "frame received"
        );

        let normalized = normalize(input)?;

        let raw = match self.label(&normalized.gray, config.background) {
            Ok(raw) => {
                debug!(frame, raw = raw.len(), "labeling succeeded");
                raw
            }
            Err(err) => {
                warn!(frame, labeler = self.labeler.name(), error = %err, "labeling failed, skipping frame");
                return Ok(FrameOutcome::Skipped(FrameSkip {
                    frame,
                    error: err.into(),
                }));
            }
        };

        let (blobs, image) = match self.filter_and_render(frame, &raw, config, normalized) {
            Ok(outputs) => outputs,
            Err(err) => {
                error!(frame, stage = %err.stage(), error = ?err, "frame processing failed");
                return Ok(FrameOutcome::Skipped(FrameSkip { frame, error: err }));
            }
        };

        let elapsed = started.elapsed();
        info!(
            frame,
            raw = raw.len(),
            kept = blobs.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "blob extraction finished"
        );

        Ok(FrameOutcome::Emitted(FrameOutput {
            image,
            stats: FrameStats {
                frame,
                raw_blobs: raw.len(),
                kept_blobs: blobs.len(),
                elapsed,
            },
            blobs,
        }))
    }

    /// Process one frame and publish its outputs to `sink`.
    ///
    /// Both outputs are staged and committed together; a sink error or panic
    /// aborts the staged outputs and skips the frame.
    pub fn run_frame(
        &self,
        input: &DynamicImage,
        config: &ExtractorConfig,
        sink: &mut dyn FrameSink,
    ) -> Result<FrameOutcome, ExtractError> {
        let output = match self.process_frame(input, config)? {
            FrameOutcome::Emitted(output) => output,
            skipped => return Ok(skipped),
        };

        let emitted = guarded(Stage::Emission, || {
            sink.write_blobs(&output.blobs)
                .and_then(|()| sink.write_image(&output.image))
                .and_then(|()| sink.commit())
                .map_err(|e| ExtractError::unexpected(Stage::Emission, e))
        });
        if let Err(err) = emitted {
            let frame = output.stats.frame;
            error!(frame, error = ?err, "failed to emit frame outputs");
            if let Err(abort_err) = guarded(Stage::Emission, || {
                sink.abort();
                Ok(())
            }) {
                error!(frame, error = ?abort_err, "sink abort failed");
            }
            return Ok(FrameOutcome::Skipped(FrameSkip { frame, error: err }));
        }
        sink.record_elapsed(output.stats.elapsed);

        Ok(FrameOutcome::Emitted(output))
    }

    /// Run the labeler, turning a panic into a labeling error
    fn label(&self, gray: &GrayImage, background: u8) -> Result<BlobCollection, LabelingError> {
        let labeler = self.labeler.as_ref();
        panic::catch_unwind(AssertUnwindSafe(|| labeler.label(gray, background))).unwrap_or_else(
            |payload| {
                Err(LabelingError::Panicked {
                    labeler: labeler.name().to_string(),
                    message: StagePanic::from_payload(payload).0,
                })
            },
        )
    }

    /// Area filter, drawing and debug dump; each stage maps a panic to
    /// [`ExtractError::Unexpected`]
    fn filter_and_render(
        &self,
        frame: u64,
        raw: &BlobCollection,
        config: &ExtractorConfig,
        normalized: NormalizedFrame,
    ) -> Result<(BlobCollection, RgbImage), ExtractError> {
        let spec = FilterSpec::min_area(config.min_size);
        let blobs = guarded(Stage::Filtering, || Ok(raw.filter(&spec)))?;
        debug!(frame, raw = raw.len(), kept = blobs.len(), "blobs filtered");

        let mut image = normalized.color;
        guarded(Stage::Rendering, || {
            draw_blobs(&mut image, &blobs, self.highlight, self.style)
                .map_err(|e| ExtractError::unexpected(Stage::Rendering, e))
        })?;
        guarded(Stage::DebugDump, || self.dump_debug(frame, &normalized.gray, &image))?;

        Ok((blobs, image))
    }

    /// Save intermediate buffers in debug mode
    fn dump_debug(&self, frame: u64, gray: &GrayImage, annotated: &RgbImage) -> Result<(), ExtractError> {
        let Some(debug_config) = self.debug.as_ref().filter(|d| d.enabled) else {
            return Ok(());
        };

        let frame_dir = debug_config.output_dir.join(format!("frame_{:04}", frame));
        save_debug_images(&frame_dir, gray, annotated)
            .map_err(|e| ExtractError::unexpected(Stage::DebugDump, e))?;
        debug!(frame, dir = %frame_dir.display(), "debug images saved");
        Ok(())
    }
}

/// Run one post-labeling stage, turning a panic into an error for `stage`
fn guarded<T>(
    stage: Stage,
    f: impl FnOnce() -> Result<T, ExtractError>,
) -> Result<T, ExtractError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(ExtractError::unexpected(stage, StagePanic::from_payload(payload)))
    })
}

impl Default for BlobPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn save_debug_images(frame_dir: &Path, gray: &GrayImage, annotated: &RgbImage) -> Result<()> {
    std::fs::create_dir_all(frame_dir)?;
    gray.save(frame_dir.join("00_gray.png"))
        .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    annotated
        .save(frame_dir.join("01_annotated.png"))
        .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    Ok(())
}
