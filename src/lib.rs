//! Real-time object detection over a live frame feed.
//!
//! Frames are stretched to the model input, run through an ONNX Runtime
//! session on the first execution backend that initializes, decoded from
//! either a pre-suppressed `[1, N, 6]` or a raw per-anchor `[1, 4 + C, A]`
//! output, deduplicated and drawn onto an overlay surface. A [`Scheduler`]
//! owns the cycle and its lifecycle.

mod utils;
pub mod common;
pub mod data;
pub mod detection_runners;
pub mod error;
pub mod overlay;
pub mod scheduler;

pub use common::{BoundingBox, Detection, ExecutionBackend, Frame, LabelSet, PipelineConfig};
pub use detection_runners::{InferenceSession, OrtSession};
pub use error::DetectError;
pub use scheduler::{CycleOutcome, Scheduler, SchedulerState};

pub type Result<T, E = DetectError> = std::result::Result<T, E>;
