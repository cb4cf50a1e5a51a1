use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use image::ImageReader;
use imageproc::region_labelling::Connectivity;
use tracing::{error, info};

use blobextract::detection::{ImageprocLabeler, RenderStyle};
use blobextract::{BlobPipeline, ExtractorConfig, FileSink, FrameOutcome, MAX_MIN_SIZE};

#[derive(Parser)]
#[command(name = "blobextract")]
#[command(about = "Extract connected blobs from images and filter them by area")]
struct Cli {
    /// Input image files, one frame each
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Directory for annotated images and blob lists
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Drop blobs with fewer pixels than this
    #[arg(long, default_value_t = 10_000,
          value_parser = clap::value_parser!(u32).range(0..=MAX_MIN_SIZE as i64))]
    min_size: u32,

    /// Gray value treated as background
    #[arg(long, default_value_t = 0)]
    background: u8,

    /// How kept blobs are drawn
    #[arg(long, value_enum, default_value_t = StyleArg::Fill)]
    style: StyleArg,

    /// Pixel neighbourhood used to join foreground pixels
    #[arg(long, value_enum, default_value_t = ConnectivityArg::Eight)]
    connectivity: ConnectivityArg,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    Fill,
    Outline,
    Bbox,
}

impl From<StyleArg> for RenderStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Fill => RenderStyle::Fill,
            StyleArg::Outline => RenderStyle::Outline,
            StyleArg::Bbox => RenderStyle::BoundingBox,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ConnectivityArg {
    Four,
    Eight,
}

impl From<ConnectivityArg> for Connectivity {
    fn from(connectivity: ConnectivityArg) -> Self {
        match connectivity {
            ConnectivityArg::Four => Connectivity::Four,
            ConnectivityArg::Eight => Connectivity::Eight,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    blobextract::logging::setup_logging(if args.verbose { "debug" } else { "info" })?;

    let config = ExtractorConfig::new(args.min_size, args.background)?;

    let mut pipeline = BlobPipeline::new()
        .with_labeler(Arc::new(ImageprocLabeler::with_connectivity(
            args.connectivity.into(),
        )))
        .with_render_style(args.style.into());

    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let mut emitted = 0usize;
    for path in &args.images {
        let img = match ImageReader::open(path)
            .map_err(anyhow::Error::from)
            .and_then(|reader| reader.decode().map_err(anyhow::Error::from))
        {
            Ok(img) => img,
            Err(err) => {
                error!(path = %path.display(), error = %err, "Failed to load image");
                continue;
            }
        };

        let mut sink = FileSink::for_input(&args.out_dir, path);
        match pipeline.run_frame(&img, &config, &mut sink) {
            Ok(FrameOutcome::Emitted(output)) => {
                emitted += 1;
                info!(
                    path = %path.display(),
                    blobs = output.blobs.len(),
                    image = %sink.image_path().display(),
                    "frame written"
                );
                for blob in &output.blobs {
                    let bbox = blob.bbox();
                    let (cx, cy) = blob.centroid();
                    println!(
                        "{}\t#{}\tarea={}\tbbox=({}, {}) {}x{}\tcenter=({:.1}, {:.1})",
                        path.display(),
                        blob.id(),
                        blob.area(),
                        bbox.x,
                        bbox.y,
                        bbox.width,
                        bbox.height,
                        cx,
                        cy
                    );
                }
            }
            Ok(FrameOutcome::Skipped(skip)) => {
                info!(path = %path.display(), stage = %skip.stage(), "frame skipped");
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "frame rejected");
            }
        }
    }

    if emitted == 0 {
        anyhow::bail!("no frame produced output");
    }

    Ok(())
}
