use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// ONNX Runtime execution provider a session may be built on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionBackend {
    TensorRT(usize),
    Cuda(usize),
    CoreML,
    #[default] Cpu,
}

// Hardcoded backend names. Storing the "proper" spelling and the lowercase version.
const CPU: [&str; 2] = ["CPU", "cpu"];
const CUDA: [&str; 2] = ["CUDA", "cuda"];
const TENSOR_RT: [&str; 2] = ["TensorRT", "tensorrt"];
const CORE_ML: [&str; 2] = ["CoreML", "coreml"];

impl ExecutionBackend {
    pub fn str(&self) -> &'static str {
        match self {
            ExecutionBackend::Cpu => CPU[0],
            ExecutionBackend::Cuda(_) => CUDA[0],
            ExecutionBackend::TensorRT(_) => TENSOR_RT[0],
            ExecutionBackend::CoreML => CORE_ML[0],
        }
    }

    pub fn str_lowercase(&self) -> &'static str {
        match self {
            ExecutionBackend::Cpu => CPU[1],
            ExecutionBackend::Cuda(_) => CUDA[1],
            ExecutionBackend::TensorRT(_) => TENSOR_RT[1],
            ExecutionBackend::CoreML => CORE_ML[1],
        }
    }

    /// Whether this backend runs on an accelerator rather than the portable CPU path.
    pub fn is_accelerated(&self) -> bool {
        !matches!(self, ExecutionBackend::Cpu)
    }

    pub fn all_backends() -> Vec<String> {
        vec![
            TENSOR_RT[1].to_string(),
            CUDA[1].to_string(),
            CORE_ML[1].to_string(),
            CPU[1].to_string(),
        ]
    }
}

impl fmt::Display for ExecutionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionBackend::Cuda(id) | ExecutionBackend::TensorRT(id) => {
                write!(f, "{}:{}", self.str(), id)
            }
            _ => f.write_str(self.str()),
        }
    }
}

impl FromStr for ExecutionBackend {
    type Err = String;

    /// Accepts `cpu`, `coreml`, `cuda`, `cuda:1`, `tensorrt`, `tensorrt:0` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (name, device_id) = match lower.split_once(':') {
            Some((name, id)) => {
                let id = id
                    .parse::<usize>()
                    .map_err(|_| format!("invalid device id in backend `{s}`"))?;
                (name.to_string(), id)
            }
            None => (lower, 0),
        };

        match name.as_str() {
            "cpu" => Ok(ExecutionBackend::Cpu),
            "cuda" => Ok(ExecutionBackend::Cuda(device_id)),
            "tensorrt" | "trt" => Ok(ExecutionBackend::TensorRT(device_id)),
            "coreml" => Ok(ExecutionBackend::CoreML),
            _ => Err(format!(
                "unknown backend `{s}`, expected one of: {}",
                Self::all_backends().join(", ")
            )),
        }
    }
}

impl TryFrom<String> for ExecutionBackend {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExecutionBackend> for String {
    fn from(value: ExecutionBackend) -> Self {
        match value {
            ExecutionBackend::Cuda(id) | ExecutionBackend::TensorRT(id) => {
                format!("{}:{}", value.str_lowercase(), id)
            }
            _ => value.str_lowercase().to_string(),
        }
    }
}
