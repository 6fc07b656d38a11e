mod cancel_token;
mod input_tensor;
mod raw_output;
mod time_calc;

pub use cancel_token::CancelToken;
pub use input_tensor::InputTensor;
pub use raw_output::RawOutput;
pub use time_calc::TimeCalc;
