use ndarray::{Array, IxDyn};
use crate::error::DetectError;

/// First output tensor of a forward pass, converted to f32.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutput(pub Array<f32, IxDyn>);

impl From<Array<f32, IxDyn>> for RawOutput {
    fn from(x: Array<f32, IxDyn>) -> Self {
        Self(x)
    }
}

impl std::ops::Deref for RawOutput {
    type Target = Array<f32, IxDyn>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl RawOutput {
    pub fn from_shape_vec(shape: &[usize], xs: Vec<f32>) -> Result<Self, DetectError> {
        Array::from_shape_vec(IxDyn(shape), xs)
            .map(Self)
            .map_err(|e| DetectError::Inference(format!("output does not fit shape {shape:?}: {e}")))
    }

    pub fn ndim(&self) -> usize {
        self.0.ndim()
    }

    /// Up to `n` leading values in logical order, for diagnostics.
    pub fn head(&self, n: usize) -> Vec<f32> {
        self.0.iter().take(n).copied().collect()
    }
}
