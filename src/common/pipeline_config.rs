use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::common::ExecutionBackend;
use crate::detection_runners::ort_detector::nms::SuppressionPolicy;
use crate::error::DetectError;

pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const MIN_IOU_THRESHOLD: f32 = 0.45;
pub const MAX_IOU_THRESHOLD: f32 = 0.5;

/// Settings for one detection pipeline. Loaded from JSON or built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    /// Tried in order; the first backend that initializes is kept.
    pub backends: Vec<ExecutionBackend>,
    /// Used only when the model declares dynamic spatial dimensions.
    pub input_width: u32,
    pub input_height: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub pre_suppressed_policy: SuppressionPolicy,
    pub interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolo.onnx"),
            labels_path: None,
            font_path: None,
            backends: vec![ExecutionBackend::Cuda(0), ExecutionBackend::Cpu],
            input_width: DEFAULT_INPUT_SIZE,
            input_height: DEFAULT_INPUT_SIZE,
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            pre_suppressed_policy: SuppressionPolicy::Skip,
            interval_ms: 16,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, DetectError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| {
            DetectError::Config(format!("{}: {}", path.as_ref().display(), e))
        })
    }

    pub fn with_model<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_labels<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.labels_path = Some(path.into());
        self
    }

    pub fn with_font<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn with_backends(mut self, backends: &[ExecutionBackend]) -> Self {
        self.backends = backends.to_vec();
        self
    }

    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_width = width;
        self.input_height = height;
        self
    }

    pub fn with_conf(mut self, x: f32) -> Self {
        self.conf_threshold = x;
        self
    }

    pub fn with_iou(mut self, x: f32) -> Self {
        self.iou_threshold = x;
        self
    }

    pub fn with_pre_suppressed_policy(mut self, policy: SuppressionPolicy) -> Self {
        self.pre_suppressed_policy = policy;
        self
    }

    pub fn with_interval_ms(mut self, ms: u64) -> Self {
        self.interval_ms = ms;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if self.backends.is_empty() {
            return Err(DetectError::Config("backend list is empty".to_string()));
        }
        if self.input_width == 0 || self.input_height == 0 {
            return Err(DetectError::Config(format!(
                "model input size must be non-zero, got {}x{}",
                self.input_width, self.input_height
            )));
        }
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(DetectError::Config(format!(
                "confidence threshold {} is outside [0, 1]",
                self.conf_threshold
            )));
        }
        if !(MIN_IOU_THRESHOLD..=MAX_IOU_THRESHOLD).contains(&self.iou_threshold) {
            return Err(DetectError::Config(format!(
                "IoU threshold {} is outside [{MIN_IOU_THRESHOLD}, {MAX_IOU_THRESHOLD}]",
                self.iou_threshold
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backends = self
            .backends
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        write!(
            f,
            "Model Path: {}\n\
            Labels Path: {}\n\
            Backends: {}\n\
            Fallback Input Resolution: {}x{}\n\
            Confidence Threshold: {}\n\
            IoU Threshold: {}\n\
            Pre-suppressed Policy: {:?}",
            self.model_path.display(),
            self.labels_path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string()),
            backends,
            self.input_width,
            self.input_height,
            self.conf_threshold,
            self.iou_threshold,
            self.pre_suppressed_policy,
        )
    }
}
