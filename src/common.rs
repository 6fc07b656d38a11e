mod bounding_box;
mod detection;
mod execution_backend;
mod frame;
mod labels;
mod pipeline_config;

pub use bounding_box::*;
pub use detection::*;
pub use execution_backend::*;
pub use frame::*;
pub use labels::*;
pub use pipeline_config::*;
