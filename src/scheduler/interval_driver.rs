use std::time::Duration;
use tokio::time::MissedTickBehavior;
use crate::detection_runners::InferenceSession;
use crate::overlay::OverlaySurface;
use crate::scheduler::{CycleOutcome, CycleSignal, FrameSource, Scheduler, SchedulerState};

/// Periodic driver: fires a cycle on each tick, but only when one was requested.
///
/// A slow cycle delays the following ticks instead of letting them pile up.
#[derive(Debug, Clone)]
pub struct IntervalDriver {
    period: Duration,
    signal: CycleSignal,
}

/// Counts of what the driver observed, returned when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub completed: u64,
    pub failed: u64,
    pub not_ready: u64,
    pub discarded: u64,
}

impl IntervalDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            signal: CycleSignal::new(),
        }
    }

    /// Requester to hand to the [`Scheduler`] this driver runs.
    pub fn signal(&self) -> CycleSignal {
        self.signal.clone()
    }

    /// Ticks until the scheduler stops, its cancel token fires, or the
    /// frame source is exhausted. Stops the scheduler on the way out.
    pub async fn run<S, F, O>(&self, scheduler: &mut Scheduler<S, F, O, CycleSignal>) -> DriveSummary
    where
        S: InferenceSession,
        F: FrameSource,
        O: OverlaySurface,
    {
        let mut summary = DriveSummary::default();
        let cancel = scheduler.cancel_token();
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if scheduler.state() != SchedulerState::Running {
                break;
            }
            if cancel.is_cancelled() {
                log::info!("Shutdown requested");
                break;
            }
            if scheduler.source().is_exhausted() {
                log::info!("Frame source exhausted");
                break;
            }
            if !self.signal.take() {
                continue;
            }

            match scheduler.on_cycle().await {
                CycleOutcome::Completed { .. } => summary.completed += 1,
                CycleOutcome::Failed => summary.failed += 1,
                CycleOutcome::NotReady => summary.not_ready += 1,
                CycleOutcome::Discarded => summary.discarded += 1,
                CycleOutcome::Inactive => break,
            }
        }

        scheduler.stop();
        log::info!(
            "Driver finished | completed: {} | failed: {} | not ready: {} | discarded: {}",
            summary.completed,
            summary.failed,
            summary.not_ready,
            summary.discarded
        );
        summary
    }
}
