use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::common::Frame;
use crate::error::DetectError;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Producer of live frames, gated by a readiness signal.
pub trait FrameSource {
    /// Whether a frame with valid dimensions can be grabbed right now.
    fn is_ready(&self) -> bool;

    fn grab(&mut self) -> Result<Frame, DetectError>;

    /// A finite source returns `true` once it will never become ready again.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Replays the image files of a directory, in file name order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    files: Vec<PathBuf>,
    next: usize,
    frame_interval: Duration,
}

impl DirectorySource {
    /// Collects `png`, `jpg`, `jpeg` and `bmp` files. Each frame is stamped
    /// `index * frame_interval`.
    pub fn open<P: AsRef<Path>>(dir: P, frame_interval: Duration) -> Result<Self, DetectError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(DetectError::Frame(format!(
                "no image files in {}",
                dir.as_ref().display()
            )));
        }
        log::info!("Found {} frames in {}", files.len(), dir.as_ref().display());

        Ok(Self {
            files,
            next: 0,
            frame_interval,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of the frame the next `grab` returns.
    pub fn peek(&self) -> Option<&Path> {
        self.files.get(self.next).map(PathBuf::as_path)
    }
}

impl FrameSource for DirectorySource {
    fn is_ready(&self) -> bool {
        self.next < self.files.len()
    }

    fn grab(&mut self) -> Result<Frame, DetectError> {
        let index = self.next;
        let path = self
            .files
            .get(index)
            .ok_or_else(|| DetectError::Frame("no frames left".to_string()))?;
        // advance first so an unreadable file is skipped rather than retried forever
        self.next += 1;

        let image = image::open(path)?.to_rgb8();
        Ok(Frame::new(image, self.frame_interval * index as u32))
    }

    fn is_exhausted(&self) -> bool {
        !self.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn replays_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            RgbImage::from_pixel(4, 3, Rgb([shade; 3])).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = DirectorySource::open(dir.path(), Duration::from_millis(40)).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.peek().unwrap().file_name().unwrap(), "a.png");

        let mut shades = Vec::new();
        let mut stamps = Vec::new();
        while source.is_ready() {
            let frame = source.grab().unwrap();
            assert_eq!(frame.dimensions(), (4, 3));
            shades.push(frame.get_pixel(0, 0)[0]);
            stamps.push(frame.timestamp);
        }
        assert_eq!(shades, vec![10, 20, 30]);
        assert_eq!(stamps[2], Duration::from_millis(80));
        assert!(source.is_exhausted());
        assert!(source.grab().is_err());
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0.png"), b"not a png").unwrap();
        RgbImage::new(2, 2).save(dir.path().join("1.png")).unwrap();

        let mut source = DirectorySource::open(dir.path(), Duration::ZERO).unwrap();
        assert!(source.grab().is_err());
        assert!(source.grab().is_ok());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DirectorySource::open(dir.path(), Duration::ZERO),
            Err(DetectError::Frame(_))
        ));
    }
}
