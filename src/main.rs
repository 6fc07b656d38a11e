use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use image::Rgba;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use live_detect::common::{BoundingBox, ExecutionBackend, Frame, PipelineConfig};
use live_detect::detection_runners::OrtSession;
use live_detect::error::DetectError;
use live_detect::overlay::{OverlaySurface, RgbaCanvas};
use live_detect::scheduler::{DirectorySource, FrameSource, IntervalDriver, Scheduler};

/// Runs object detection over a directory of frames and writes the overlays as PNG.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ONNX model file
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Directory of frames (png, jpg, jpeg, bmp), replayed in file name order
    #[arg(long, value_name = "DIR")]
    frames: PathBuf,

    /// Directory the composited frames are written to
    #[arg(long, value_name = "DIR", default_value = "output")]
    output: PathBuf,

    /// JSON pipeline configuration; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Execution backend to try, in order (cpu, cuda[:N], tensorrt[:N], coreml)
    #[arg(long = "backend", value_name = "BACKEND")]
    backends: Vec<ExecutionBackend>,

    /// Class labels file, one per line
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// TrueType font for label chips
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Scheduling interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Confidence threshold (0.0 - 1.0)
    #[arg(long, value_name = "THRESHOLD")]
    conf: Option<f32>,

    /// Suppression IoU threshold (0.45 - 0.5)
    #[arg(long, value_name = "THRESHOLD")]
    iou: Option<f32>,
}

impl Args {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => PipelineConfig::new(),
        };
        if let Some(x) = &self.model {
            config = config.with_model(x);
        }
        if !self.backends.is_empty() {
            config = config.with_backends(&self.backends);
        }
        if let Some(x) = &self.labels {
            config = config.with_labels(x);
        }
        if let Some(x) = &self.font {
            config = config.with_font(x);
        }
        if let Some(x) = self.interval_ms {
            config = config.with_interval_ms(x);
        }
        if let Some(x) = self.conf {
            config = config.with_conf(x);
        }
        if let Some(x) = self.iou {
            config = config.with_iou(x);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Remembers which file each grabbed frame came from, for the PNG sink.
struct TrackedSource {
    inner: DirectorySource,
    current: Arc<Mutex<Option<PathBuf>>>,
}

impl FrameSource for TrackedSource {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn grab(&mut self) -> Result<Frame, DetectError> {
        *self.current.lock() = self.inner.peek().map(Path::to_path_buf);
        self.inner.grab()
    }

    fn is_exhausted(&self) -> bool {
        self.inner.is_exhausted()
    }
}

/// Canvas that composites each presented overlay over its frame and saves it.
struct PngSink {
    canvas: RgbaCanvas,
    current: Arc<Mutex<Option<PathBuf>>>,
    output_dir: PathBuf,
    /// Frames actually saved to `output_dir`.
    written: usize,
}

impl OverlaySurface for PngSink {
    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.resize(width, height)
    }

    fn size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    fn clear(&mut self) {
        self.canvas.clear()
    }

    fn stroke_rect(&mut self, bbox: &BoundingBox, color: Rgba<u8>, thickness: u32) {
        self.canvas.stroke_rect(bbox, color, thickness)
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
        self.canvas.fill_rect(x, y, width, height, color)
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>) {
        self.canvas.fill_text(text, x, y, size, color)
    }

    fn text_width(&self, text: &str, size: f32) -> u32 {
        self.canvas.text_width(text, size)
    }

    fn present(&mut self) -> Result<(), DetectError> {
        let Some(path) = self.current.lock().clone() else {
            return Ok(());
        };
        // unreadable frames were never drawn on
        let Ok(frame) = image::open(&path) else {
            return Ok(());
        };
        let composited = self.canvas.composite_onto(&frame.to_rgb8())?;

        let stem = path
            .file_stem()
            .ok_or_else(|| DetectError::Frame(format!("{} has no file name", path.display())))?;
        let out = self.output_dir.join(format!("{}.png", stem.to_string_lossy()));
        composited.save(&out)?;
        self.written += 1;
        log::debug!("Wrote {}", out.display());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.pipeline_config()?;
    log::info!("{}", config);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let current = Arc::new(Mutex::new(None));
    let source = TrackedSource {
        inner: DirectorySource::open(&args.frames, config.interval())?,
        current: Arc::clone(&current),
    };

    let mut canvas = RgbaCanvas::default();
    if let Some(font) = &config.font_path {
        canvas = canvas
            .with_font_file(font)
            .with_context(|| format!("loading font {}", font.display()))?;
    }
    let surface = PngSink {
        canvas,
        current,
        output_dir: args.output.clone(),
        written: 0,
    };

    let driver = IntervalDriver::new(config.interval());
    let mut scheduler = Scheduler::new(config.clone(), source, surface, driver.signal())?;

    let cancel = scheduler.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received, stopping");
            cancel.cancel();
        }
    });

    scheduler
        .start(OrtSession::load(config))
        .await
        .context("model load failed")?;

    let summary = driver.run(&mut scheduler).await;
    if let Some(avg) = scheduler.timings().avg_i(2) {
        log::info!("Average inference time: {:.2?}", avg);
    }
    log::info!(
        "Wrote {} frames to {} ({} completed, {} failed)",
        scheduler.surface().written,
        args.output.display(),
        summary.completed,
        summary.failed
    );

    Ok(())
}
