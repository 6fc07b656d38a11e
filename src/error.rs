use thiserror::Error;

use crate::common::ExecutionBackend;
use crate::scheduler::SchedulerState;

/// Errors produced by the detection pipeline.
///
/// Only [`DetectError::Load`] is fatal to a running pipeline. Every other
/// variant is raised inside a single cycle and absorbed by the scheduler.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("no execution backend could be initialized: {}", format_attempts(.attempts))]
    Load {
        attempts: Vec<(ExecutionBackend, String)>,
    },

    #[error("unrecognized output tensor shape {shape:?}")]
    UnrecognizedShape { shape: Vec<usize> },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("frame source failed: {0}")]
    Frame(String),

    #[error("inference result discarded after cancellation")]
    Cancelled,

    #[error("operation `{operation}` not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SchedulerState,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl From<ort::Error> for DetectError {
    fn from(err: ort::Error) -> Self {
        DetectError::Inference(err.to_string())
    }
}

fn format_attempts(attempts: &[(ExecutionBackend, String)]) -> String {
    if attempts.is_empty() {
        return "no backends configured".to_string();
    }
    attempts
        .iter()
        .map(|(backend, reason)| format!("{backend} ({reason})"))
        .collect::<Vec<_>>()
        .join(", ")
}
