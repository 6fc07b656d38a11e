//! Frame to model-input conversion.

use fast_image_resize::{
    images::{Image as FirImage, ImageRef},
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
};
use crate::common::Frame;
use crate::data::InputTensor;
use crate::error::DetectError;

/// Stretches frames to the model input size and lays them out as planar RGB.
///
/// No letterboxing: the aspect ratio is not preserved, so decoded boxes are
/// rescaled with separate horizontal and vertical factors.
pub struct Preprocessor {
    width: u32,
    height: u32,
    resizer: Resizer,
    options: ResizeOptions,
}

impl std::fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preprocessor")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Preprocessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resizer: Resizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        }
    }

    /// `(width, height)` of the tensors this preprocessor produces.
    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn process(&mut self, frame: &Frame) -> Result<InputTensor, DetectError> {
        let (w, h) = frame.dimensions();
        if w == 0 || h == 0 {
            return Err(DetectError::Preprocess(format!("empty frame {w}x{h}")));
        }

        let planar = if (w, h) == (self.width, self.height) {
            nchw_normalize_flat(frame.pixels(), w, h)?
        } else {
            let src = ImageRef::new(w, h, frame.pixels(), PixelType::U8x3)
                .map_err(|e| DetectError::Preprocess(format!("invalid frame buffer: {e}")))?;
            let mut dst = FirImage::new(self.width, self.height, PixelType::U8x3);
            self.resizer
                .resize(&src, &mut dst, &self.options)
                .map_err(|e| DetectError::Preprocess(format!("resize failed: {e}")))?;
            nchw_normalize_flat(dst.buffer(), self.width, self.height)?
        };

        InputTensor::from_planar(self.width, self.height, planar)
    }
}

/// Interleaved RGB bytes to planar `[R.., G.., B..]` floats in `[0, 1]`, one pass.
fn nchw_normalize_flat(buf: &[u8], w: u32, h: u32) -> Result<Vec<f32>, DetectError> {
    let hw = w as usize * h as usize;
    if buf.len() != hw * 3 {
        return Err(DetectError::Preprocess(format!(
            "unexpected buffer size: got {}, expected {}",
            buf.len(),
            hw * 3
        )));
    }

    let mut out = vec![0.0f32; buf.len()];
    for (i, px) in buf.chunks_exact(3).enumerate() {
        out[i] = px[0] as f32 / 255.0;
        out[i + hw] = px[1] as f32 / 255.0;
        out[i + 2 * hw] = px[2] as f32 / 255.0;
    }

    Ok(out)
}
