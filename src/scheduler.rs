mod cycle_requester;
mod frame_source;
mod interval_driver;
mod pipeline_scheduler;

pub use cycle_requester::{CycleRequester, CycleSignal};
pub use frame_source::{DirectorySource, FrameSource};
pub use interval_driver::{DriveSummary, IntervalDriver};
pub use pipeline_scheduler::{CycleOutcome, Scheduler, SchedulerState};
