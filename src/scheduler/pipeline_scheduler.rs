use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::common::{Detection, ExecutionBackend, PipelineConfig};
use crate::data::{CancelToken, TimeCalc};
use crate::detection_runners::{suppress, InferenceSession, OutputDecoder, Preprocessor};
use crate::error::DetectError;
use crate::overlay::{OverlayRenderer, OverlaySurface};
use crate::scheduler::{CycleRequester, FrameSource};
use crate::utils;

const STAGE_GRAB: usize = 0;
const STAGE_PREPROCESS: usize = 1;
const STAGE_INFERENCE: usize = 2;
const STAGE_POSTPROCESS: usize = 3;
const STAGE_RENDER: usize = 4;
const STAGE_NAMES: [&str; 5] = ["Frame grab", "Preprocess", "Inference", "Postprocess", "Render"];

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Loading,
    Running,
    Stopped,
    Failed,
}

/// What a single [`Scheduler::on_cycle`] call did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Not running; nothing happened and nothing was rescheduled.
    Inactive,
    /// The frame source was not ready; rescheduled without work.
    NotReady,
    /// Detections were decoded, suppressed and rendered.
    Completed { detections: Vec<Detection> },
    /// Some stage failed; the overlay was cleared and the next cycle requested.
    Failed,
    /// The inference result arrived after shutdown and was dropped unrendered.
    Discarded,
}

/// Session plus the per-session stages, built once the model is loaded.
struct ActivePipeline<S> {
    session: Arc<S>,
    preprocessor: Preprocessor,
    decoder: OutputDecoder,
}

/// Drives the frame → detections → overlay cycle.
///
/// One cycle runs at a time: the next one is requested from the
/// [`CycleRequester`] only after the current one completed or failed.
pub struct Scheduler<S, F, O, R> {
    state: SchedulerState,
    config: PipelineConfig,
    source: F,
    surface: O,
    requester: R,
    renderer: OverlayRenderer,
    pipeline: Option<ActivePipeline<S>>,
    cancel: CancelToken,
    frame_size: (u32, u32),
    first_decode_logged: bool,
    timings: TimeCalc,
}

impl<S, F, O, R> Scheduler<S, F, O, R>
where
    S: InferenceSession,
    F: FrameSource,
    O: OverlaySurface,
    R: CycleRequester,
{
    pub fn new(config: PipelineConfig, source: F, surface: O, requester: R) -> Result<Self, DetectError> {
        config.validate()?;
        Ok(Self {
            state: SchedulerState::Idle,
            config,
            source,
            surface,
            requester,
            renderer: OverlayRenderer::default(),
            pipeline: None,
            cancel: CancelToken::new(),
            frame_size: (0, 0),
            first_decode_logged: false,
            timings: TimeCalc::default(),
        })
    }

    pub fn with_renderer(mut self, renderer: OverlayRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Awaits `load` and enters `Running`, requesting the first cycle.
    ///
    /// A load error moves the scheduler to `Failed` and is returned; it is
    /// the only error that escapes the scheduler.
    pub async fn start<L>(&mut self, load: L) -> Result<(), DetectError>
    where
        L: Future<Output = Result<S, DetectError>>,
    {
        if self.state != SchedulerState::Idle {
            return Err(DetectError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        self.state = SchedulerState::Loading;
        log::info!("Loading model {}", self.config.model_path.display());
        let session = match load.await {
            Ok(session) => session,
            Err(err) => {
                log::error!("Model load failed: {}", err);
                self.state = SchedulerState::Failed;
                return Err(err);
            }
        };

        if self.cancel.is_cancelled() {
            log::info!("Shutdown requested while loading, dropping session");
            self.state = SchedulerState::Stopped;
            return Ok(());
        }

        let (width, height) = session.input_size();
        log::info!(
            "Model ready on {} | input {}x{} | {} classes",
            session.backend(),
            width,
            height,
            session.labels().len()
        );
        let decoder = OutputDecoder::new(self.config.conf_threshold, session.labels().clone());
        self.pipeline = Some(ActivePipeline {
            session: Arc::new(session),
            preprocessor: Preprocessor::new(width, height),
            decoder,
        });
        self.state = SchedulerState::Running;
        self.requester.request_next_cycle();
        Ok(())
    }

    /// Runs one scheduling opportunity.
    pub async fn on_cycle(&mut self) -> CycleOutcome {
        if self.state == SchedulerState::Running && self.cancel.is_cancelled() {
            self.stop();
        }
        if self.state != SchedulerState::Running {
            return CycleOutcome::Inactive;
        }
        if !self.source.is_ready() {
            self.requester.request_next_cycle();
            return CycleOutcome::NotReady;
        }

        let outcome = match self.run_cycle().await {
            Ok(detections) => CycleOutcome::Completed { detections },
            Err(DetectError::Cancelled) => {
                log::info!("Discarding inference result that arrived after shutdown");
                self.stop();
                return CycleOutcome::Discarded;
            }
            Err(err) => {
                log::error!("Detection cycle failed: {}", err);
                if let Err(err) = self.renderer.render(&mut self.surface, self.frame_size, &[]) {
                    log::error!("Failed to clear overlay: {}", err);
                }
                CycleOutcome::Failed
            }
        };

        self.requester.request_next_cycle();
        outcome
    }

    async fn run_cycle(&mut self) -> Result<Vec<Detection>, DetectError> {
        let pipeline = self.pipeline.as_mut().ok_or(DetectError::InvalidState {
            operation: "on_cycle",
            state: self.state,
        })?;

        let start = Instant::now();
        let mut elapsed = Duration::ZERO;

        let frame = self.source.grab()?;
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectError::Frame(format!(
                "frame has invalid size {}x{}",
                frame.width(),
                frame.height()
            )));
        }
        self.frame_size = frame.dimensions();
        elapsed = mark(&mut self.timings, STAGE_GRAB, start, elapsed);

        let x = pipeline.preprocessor.process(&frame)?;
        elapsed = mark(&mut self.timings, STAGE_PREPROCESS, start, elapsed);

        let y = pipeline.session.run(x, &self.cancel).await?;
        if self.cancel.is_cancelled() {
            return Err(DetectError::Cancelled);
        }
        elapsed = mark(&mut self.timings, STAGE_INFERENCE, start, elapsed);

        let decoded = pipeline
            .decoder
            .decode(&y, pipeline.preprocessor.target_size(), self.frame_size)?;
        if !self.first_decode_logged {
            log::info!(
                "First decode | layout: {} | shape: {:?} | head: {:?} | candidates: {}",
                decoded.layout.name(),
                y.shape(),
                y.head(6),
                decoded.detections.len()
            );
            self.first_decode_logged = true;
        }

        let policy = decoded.layout.suppression_policy(self.config.pre_suppressed_policy);
        let mut detections = decoded.detections;
        suppress(&mut detections, self.config.iou_threshold, policy);
        elapsed = mark(&mut self.timings, STAGE_POSTPROCESS, start, elapsed);

        self.renderer.render(&mut self.surface, self.frame_size, &detections)?;
        mark(&mut self.timings, STAGE_RENDER, start, elapsed);

        Ok(detections)
    }

    /// Cancels the pending cycle and releases the session. Idempotent.
    ///
    /// An inference already in flight keeps running; its result is discarded.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Stopped {
            return;
        }
        self.cancel.cancel();
        self.requester.cancel_pending();
        self.pipeline = None;
        log::info!("Scheduler stopped (was {:?})", self.state);
        self.state = SchedulerState::Stopped;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Handle that stops the scheduler at its next opportunity when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn backend(&self) -> Option<ExecutionBackend> {
        self.pipeline.as_ref().map(|p| p.session.backend())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Accumulated stage durations: grab, preprocess, inference, postprocess, render.
    pub fn timings(&self) -> &TimeCalc {
        &self.timings
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn surface(&self) -> &O {
        &self.surface
    }

    pub fn requester(&self) -> &R {
        &self.requester
    }
}

fn mark(timings: &mut TimeCalc, stage: usize, start: Instant, prev_elapsed: Duration) -> Duration {
    let elapsed = utils::trace("TIME", STAGE_NAMES[stage], start, prev_elapsed);
    timings.add_or_push(stage, elapsed - prev_elapsed);
    elapsed
}
