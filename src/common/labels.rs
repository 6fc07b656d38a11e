use std::path::Path;
use regex::Regex;
use crate::error::DetectError;
use crate::utils;

/// The 80 COCO class names used by stock YOLO exports.
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake",
    "chair", "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop",
    "mouse", "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Class id to label lookup. Unknown ids resolve to a generated `class <id>` label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::coco()
    }
}

impl LabelSet {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_LABELS.iter().map(|x| x.to_string()).collect())
    }

    /// One label per line; blank lines are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DetectError> {
        let names: Vec<String> = utils::file_to_vec(path.as_ref())?
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        if names.is_empty() {
            return Err(DetectError::Config(format!(
                "labels file {} is empty",
                path.as_ref().display()
            )));
        }
        Ok(Self::new(names))
    }

    /// Parses the `names` entry Ultralytics writes into ONNX metadata.
    /// String format: `{0: 'person', 1: 'bicycle', 2: 'sports ball', ..., 27: "yellow_lady's_slipper"}`
    pub fn from_metadata(names: &str) -> Option<Self> {
        let re = Regex::new(r#"\d+\s*:\s*(['"])([-()\w '".]+?)(['"])\s*(?:,|\})"#).ok()?;
        let parsed: Vec<String> = re
            .captures_iter(names)
            .map(|c| c.extract::<3>().1[1].to_string())
            .collect();
        if parsed.is_empty() {
            None
        } else {
            Some(Self::new(parsed))
        }
    }

    /// Label file first, then model metadata, then the COCO list.
    pub fn resolve(labels_path: Option<&Path>, metadata_names: Option<&str>) -> Result<Self, DetectError> {
        if let Some(path) = labels_path {
            return Self::from_file(path);
        }
        if let Some(labels) = metadata_names.and_then(Self::from_metadata) {
            return Ok(labels);
        }
        Ok(Self::coco())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn label(&self, class_id: usize) -> String {
        match self.names.get(class_id) {
            Some(name) => name.clone(),
            None => format!("class {class_id}"),
        }
    }
}
