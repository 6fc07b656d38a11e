use ndarray::{Array, IxDyn};
use crate::error::DetectError;

/// Model input in planar `[1, 3, H, W]` layout, values normalized to `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputTensor(pub Array<f32, IxDyn>);

impl std::ops::Deref for InputTensor {
    type Target = Array<f32, IxDyn>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl InputTensor {
    /// Wraps a planar buffer of `3 * width * height` values.
    pub fn from_planar(width: u32, height: u32, xs: Vec<f32>) -> Result<Self, DetectError> {
        let shape = [1, 3, height as usize, width as usize];
        Array::from_shape_vec(IxDyn(&shape), xs)
            .map(Self)
            .map_err(|e| DetectError::Preprocess(format!("cannot shape input tensor as {shape:?}: {e}")))
    }

    pub fn width(&self) -> usize {
        self.0.shape().get(3).copied().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.0.shape().get(2).copied().unwrap_or(0)
    }

    pub fn into_inner(self) -> Array<f32, IxDyn> {
        self.0
    }
}
