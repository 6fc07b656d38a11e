mod ort_engine;
pub mod image_ops;
pub mod nms;
pub mod output_decoder;

pub use ort_engine::*;
pub use image_ops::Preprocessor;
pub use nms::{suppress, Nms, SuppressionPolicy};
pub use output_decoder::{Decoded, OutputDecoder, OutputLayout};
