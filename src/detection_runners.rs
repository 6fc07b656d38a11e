pub mod inference_session;
pub mod ort_detector;

pub use inference_session::{negotiate, InferenceSession};
pub use ort_detector::*;
