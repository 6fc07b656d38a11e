#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use image::{Rgb, RgbImage, Rgba};
use parking_lot::Mutex;
use live_detect::common::{BoundingBox, ExecutionBackend, Frame, LabelSet, PipelineConfig};
use live_detect::data::{CancelToken, InputTensor, RawOutput};
use live_detect::detection_runners::InferenceSession;
use live_detect::error::DetectError;
use live_detect::overlay::OverlaySurface;
use live_detect::scheduler::{CycleRequester, FrameSource};

/// Session that replays queued outputs instead of running a model.
pub struct FakeSession {
    pub backend: ExecutionBackend,
    pub size: (u32, u32),
    pub labels: LabelSet,
    pub outputs: Mutex<VecDeque<Result<RawOutput, DetectError>>>,
    pub runs: Arc<AtomicUsize>,
    pub delay: Duration,
}

impl FakeSession {
    pub fn new(backend: ExecutionBackend, size: (u32, u32)) -> Self {
        Self {
            backend,
            size,
            labels: LabelSet::coco(),
            outputs: Mutex::new(VecDeque::new()),
            runs: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    pub fn with_output(self, output: Result<RawOutput, DetectError>) -> Self {
        self.outputs.lock().push_back(output);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl InferenceSession for FakeSession {
    fn input_size(&self) -> (u32, u32) {
        self.size
    }

    fn backend(&self) -> ExecutionBackend {
        self.backend
    }

    fn labels(&self) -> &LabelSet {
        &self.labels
    }

    async fn run(&self, x: InputTensor, cancel: &CancelToken) -> Result<RawOutput, DetectError> {
        if cancel.is_cancelled() {
            return Err(DetectError::Cancelled);
        }
        assert_eq!((x.width() as u32, x.height() as u32), self.size);
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outputs
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(DetectError::Inference("no output queued".into())))
    }
}

/// Solid colour frames behind a readiness switch.
pub struct FakeSource {
    pub ready: Arc<AtomicBool>,
    pub grabs: Arc<AtomicUsize>,
    pub remaining: Option<usize>,
    pub size: (u32, u32),
}

impl FakeSource {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
            grabs: Arc::new(AtomicUsize::new(0)),
            remaining: None,
            size,
        }
    }

    pub fn finite(mut self, frames: usize) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl FrameSource for FakeSource {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && self.remaining != Some(0)
    }

    fn grab(&mut self) -> Result<Frame, DetectError> {
        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
        }
        let index = self.grabs.fetch_add(1, Ordering::SeqCst);
        let image = RgbImage::from_pixel(self.size.0, self.size.1, Rgb([90, 120, 150]));
        Ok(Frame::new(image, Duration::from_millis(33) * index as u32))
    }

    fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Surface that records draw calls.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub size: (u32, u32),
    pub clears: usize,
    pub presents: usize,
    pub strokes: Vec<(BoundingBox, Rgba<u8>)>,
    pub texts: Vec<String>,
}

impl RecordingSurface {
    /// Boxes drawn since the last clear.
    pub fn visible(&self) -> &[(BoundingBox, Rgba<u8>)] {
        &self.strokes
    }
}

impl OverlaySurface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.strokes.clear();
        self.texts.clear();
    }

    fn stroke_rect(&mut self, bbox: &BoundingBox, color: Rgba<u8>, _thickness: u32) {
        self.strokes.push((*bbox, color));
    }

    fn fill_rect(&mut self, _x: i32, _y: i32, _width: u32, _height: u32, _color: Rgba<u8>) {}

    fn fill_text(&mut self, text: &str, _x: i32, _y: i32, _size: f32, _color: Rgba<u8>) {
        self.texts.push(text.to_string());
    }

    fn present(&mut self) -> Result<(), DetectError> {
        self.presents += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CountingRequester {
    pub requests: usize,
    pub cancels: usize,
}

impl CycleRequester for CountingRequester {
    fn request_next_cycle(&mut self) {
        self.requests += 1;
    }

    fn cancel_pending(&mut self) {
        self.cancels += 1;
    }
}

pub fn config() -> PipelineConfig {
    PipelineConfig::new().with_backends(&[ExecutionBackend::Cuda(0), ExecutionBackend::Cpu])
}

/// One pre-suppressed row `(x1, y1, x2, y2, score, class)`.
pub fn pre_suppressed(rows: &[[f32; 6]]) -> RawOutput {
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    RawOutput::from_shape_vec(&[1, rows.len(), 6], data).unwrap()
}
