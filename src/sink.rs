use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use tracing::warn;

use crate::models::BlobCollection;
use crate::pipeline::FrameSink;

/// Writes `<stem>_blobs.json` and `<stem>_blobs.png` into a directory.
///
/// Outputs are staged as hidden `.part` files and renamed into place on commit.
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
    stem: String,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            stem: stem.into(),
        }
    }

    /// Sink named after the input file's stem
    pub fn for_input(output_dir: impl Into<PathBuf>, input: &Path) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        Self::new(output_dir, stem)
    }

    pub fn blobs_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_blobs.json", self.stem))
    }

    pub fn image_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_blobs.png", self.stem))
    }

    /// Hidden sibling a staged output is written to before commit
    fn staging_path(final_path: &Path) -> PathBuf {
        let name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        final_path.with_file_name(format!(".{name}.part"))
    }
}

fn remove_if_present(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove staged output");
        }
    }
}

impl FrameSink for FileSink {
    fn write_blobs(&mut self, blobs: &BlobCollection) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = Self::staging_path(&self.blobs_path());
        let json = serde_json::to_string_pretty(blobs)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
    }

    fn write_image(&mut self, image: &RgbImage) -> Result<()> {
        let path = Self::staging_path(&self.image_path());
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| anyhow::anyhow!("Failed to save annotated image {}: {}", path.display(), e))
    }

    /// Image first, then blobs; a failed blobs rename takes the image back out
    fn commit(&mut self) -> Result<()> {
        let image = self.image_path();
        let blobs = self.blobs_path();
        std::fs::rename(Self::staging_path(&image), &image)
            .with_context(|| format!("publishing {}", image.display()))?;
        if let Err(e) = std::fs::rename(Self::staging_path(&blobs), &blobs) {
            remove_if_present(&image);
            return Err(e).with_context(|| format!("publishing {}", blobs.display()));
        }
        Ok(())
    }

    fn abort(&mut self) {
        remove_if_present(&Self::staging_path(&self.blobs_path()));
        remove_if_present(&Self::staging_path(&self.image_path()));
    }
}

/// Keeps every emitted frame in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub blobs: Vec<BlobCollection>,
    pub images: Vec<RgbImage>,
    pub elapsed: Vec<Duration>,
    pending_blobs: Option<BlobCollection>,
    pending_image: Option<RgbImage>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> usize {
        self.images.len()
    }
}

impl FrameSink for MemorySink {
    fn write_blobs(&mut self, blobs: &BlobCollection) -> Result<()> {
        self.pending_blobs = Some(blobs.clone());
        Ok(())
    }

    fn write_image(&mut self, image: &RgbImage) -> Result<()> {
        self.pending_image = Some(image.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        match (self.pending_blobs.take(), self.pending_image.take()) {
            (Some(blobs), Some(image)) => {
                self.blobs.push(blobs);
                self.images.push(image);
                Ok(())
            }
            _ => anyhow::bail!("commit without both staged outputs"),
        }
    }

    fn abort(&mut self) {
        self.pending_blobs = None;
        self.pending_image = None;
    }

    fn record_elapsed(&mut self, elapsed: Duration) {
        self.elapsed.push(elapsed);
    }
}
