use std::time::Duration;
use image::{DynamicImage, RgbImage};

/// A single RGB video frame handed over by a frame source.
///
/// Frames live for exactly one pipeline cycle.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub image: RgbImage,
    pub timestamp: Duration,
}

impl std::ops::Deref for Frame {
    type Target = RgbImage;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self {
            image,
            ..Default::default()
        }
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgb8(),
            ..Default::default()
        }
    }
}

impl Frame {
    pub fn new(image: RgbImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    /// Builds a frame from a packed RGB buffer. Fails if the buffer length is not `w * h * 3`.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>, timestamp: Duration) -> Option<Self> {
        RgbImage::from_raw(width, height, pixels).map(|image| Self { image, timestamp })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_rgb8(self) -> RgbImage {
        self.image
    }
}
