//! ONNX Runtime backed [`InferenceSession`].

use std::path::Path;
use std::sync::Arc;
use half::f16;
use ndarray::{Array, IxDyn};
use parking_lot::Mutex;
use ort::{
    execution_providers::{ExecutionProvider,
                          CPUExecutionProvider,
                          CUDAExecutionProvider,
                          TensorRTExecutionProvider,
                          CoreMLExecutionProvider},
    session::builder::{GraphOptimizationLevel, SessionBuilder},
    session::Session,
    tensor::TensorElementType,
    value::{DynValue, Tensor},
};
use crate::common::{ExecutionBackend, LabelSet, PipelineConfig};
use crate::data::{CancelToken, InputTensor, RawOutput};
use crate::detection_runners::inference_session::{negotiate, InferenceSession};
use crate::error::DetectError;

pub(crate) const CROSS_MARK: &str = "❌";

/// Name and element type of one model input or output.
#[derive(Debug, Clone)]
struct TensorAttr {
    name: String,
    dtype: TensorElementType,
}

/// ONNX Runtime session plus the metadata the pipeline needs from it.
pub struct OrtSession {
    session: Arc<Mutex<Session>>,
    backend: ExecutionBackend,
    input: TensorAttr,
    output: TensorAttr,
    model_width: u32,
    model_height: u32,
    labels: LabelSet,
}

impl std::fmt::Debug for OrtSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtSession")
            .field("backend", &self.backend)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("model_width", &self.model_width)
            .field("model_height", &self.model_height)
            .field("classes", &self.labels.len())
            .finish()
    }
}

impl OrtSession {
    /// Builds a session on the first backend in `config.backends` that initializes.
    pub fn create(config: &PipelineConfig) -> Result<Self, DetectError> {
        config.validate()?;
        if !config.model_path.exists() {
            return Err(DetectError::Load {
                attempts: config
                    .backends
                    .iter()
                    .map(|b| (*b, format!("model file {} not found", config.model_path.display())))
                    .collect(),
            });
        }

        let (backend, session) = negotiate(&config.backends, |backend| {
            Self::build(&config.model_path, backend)
        })?;

        let input = Self::first_attr(&session, true)?;
        let output = Self::first_attr(&session, false)?;

        let (model_width, model_height) = Self::declared_input_size(&session)
            .unwrap_or((config.input_width, config.input_height));

        let metadata_names = session
            .metadata()
            .ok()
            .and_then(|m| m.custom("names").ok().flatten());
        let labels = LabelSet::resolve(config.labels_path.as_deref(), metadata_names.as_deref())?;

        log::info!(
            "Backend: ONNXRuntime | Device: {} | Input: {} {}x{} ({:?}) | Output: {} ({:?}) | Classes: {}",
            backend,
            input.name,
            model_width,
            model_height,
            input.dtype,
            output.name,
            output.dtype,
            labels.len(),
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            backend,
            input,
            output,
            model_width,
            model_height,
            labels,
        })
    }

    /// Loads the session on the blocking pool so the caller's runtime keeps running.
    pub async fn load(config: PipelineConfig) -> Result<Self, DetectError> {
        tokio::task::spawn_blocking(move || Self::create(&config))
            .await
            .map_err(|e| DetectError::Inference(format!("model load task failed: {e}")))?
    }

    fn build(model_path: &Path, backend: ExecutionBackend) -> Result<Session, DetectError> {
        let mut builder = Session::builder()?;
        match backend {
            ExecutionBackend::TensorRT(device_id) => Self::build_trt(&mut builder, device_id)?,
            ExecutionBackend::Cuda(device_id) => Self::build_cuda(&mut builder, device_id)?,
            ExecutionBackend::CoreML => Self::build_coreml(&mut builder)?,
            ExecutionBackend::Cpu => Self::build_cpu(&mut builder)?,
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        Ok(session)
    }

    fn build_trt(builder: &mut SessionBuilder, device_id: usize) -> Result<(), DetectError> {
        let trt = TensorRTExecutionProvider::default()
            .with_device_id(device_id as i32)
            .with_fp16(false)
            .with_engine_cache(true)
            .with_engine_cache_path("trt-cache");
        if trt.is_available()? {
            trt.register(builder).map_err(|err| {
                DetectError::Inference(format!("{CROSS_MARK} TensorRT initialization failed: {err}"))
            })?;
            log::info!("🐢 Initial model serialization with TensorRT may take some time...");
            Ok(())
        } else {
            Err(DetectError::Inference(format!("{CROSS_MARK} TensorRT execution provider not available")))
        }
    }

    fn build_cuda(builder: &mut SessionBuilder, device_id: usize) -> Result<(), DetectError> {
        let ep = CUDAExecutionProvider::default().with_device_id(device_id as i32);
        if ep.is_available()? {
            ep.register(builder).map_err(|err| {
                DetectError::Inference(format!("{CROSS_MARK} CUDA initialization failed: {err}"))
            })
        } else {
            Err(DetectError::Inference(format!("{CROSS_MARK} CUDA execution provider not available")))
        }
    }

    fn build_coreml(builder: &mut SessionBuilder) -> Result<(), DetectError> {
        let ep = CoreMLExecutionProvider::default();
        if ep.is_available()? {
            ep.register(builder).map_err(|err| {
                DetectError::Inference(format!("{CROSS_MARK} CoreML initialization failed: {err}"))
            })
        } else {
            Err(DetectError::Inference(format!("{CROSS_MARK} CoreML execution provider not available")))
        }
    }

    fn build_cpu(builder: &mut SessionBuilder) -> Result<(), DetectError> {
        let ep = CPUExecutionProvider::default();
        ep.register(builder).map_err(|err| {
            DetectError::Inference(format!("{CROSS_MARK} CPU initialization failed: {err}"))
        })
    }

    fn first_attr(session: &Session, input: bool) -> Result<TensorAttr, DetectError> {
        let (name, value_type) = if input {
            let x = session
                .inputs
                .first()
                .ok_or_else(|| DetectError::Inference("model declares no inputs".to_string()))?;
            (x.name.clone(), &x.input_type)
        } else {
            let x = session
                .outputs
                .first()
                .ok_or_else(|| DetectError::Inference("model declares no outputs".to_string()))?;
            (x.name.clone(), &x.output_type)
        };

        let dtype = value_type
            .tensor_type()
            .ok_or_else(|| DetectError::Inference(format!("`{name}` is not a tensor")))?;
        match dtype {
            TensorElementType::Float32 | TensorElementType::Float16 => Ok(TensorAttr { name, dtype }),
            other => Err(DetectError::Inference(format!(
                "unsupported element type {other:?} for `{name}`"
            ))),
        }
    }

    /// `(width, height)` from a static `[N, 3, H, W]` input; `None` when dynamic.
    fn declared_input_size(session: &Session) -> Option<(u32, u32)> {
        let dims: Vec<i64> = session
            .inputs
            .first()?
            .input_type
            .tensor_shape()?
            .iter()
            .copied()
            .collect();
        match dims.as_slice() {
            [_, _, h, w] if *h > 0 && *w > 0 => Some((*w as u32, *h as u32)),
            _ => {
                log::warn!("Model input dimensions {:?} are dynamic, using configured size", dims);
                None
            }
        }
    }

    fn tensor_preprocess(x: Array<f32, IxDyn>, dtype: TensorElementType) -> Result<DynValue, DetectError> {
        let x = match dtype {
            TensorElementType::Float16 => Tensor::from_array(x.mapv(f16::from_f32))?.into_dyn(),
            _ => Tensor::from_array(x)?.into_dyn(),
        };
        Ok(x)
    }

    fn tensor_postprocess(y: &DynValue, dtype: TensorElementType) -> Result<Array<f32, IxDyn>, DetectError> {
        let y = match dtype {
            TensorElementType::Float16 => y.try_extract_array::<f16>()?.mapv(f16::to_f32),
            _ => y.try_extract_array::<f32>()?.to_owned(),
        };
        Ok(y)
    }

    fn run_blocking(
        session: &Mutex<Session>,
        input: &TensorAttr,
        output: &TensorAttr,
        x: InputTensor,
    ) -> Result<RawOutput, DetectError> {
        let value = Self::tensor_preprocess(x.into_inner(), input.dtype)?;
        let mut session = session.lock();
        let outputs = session.run(ort::inputs![input.name.as_str() => value])?;
        let y = Self::tensor_postprocess(&outputs[output.name.as_str()], output.dtype)?;
        Ok(RawOutput::from(y))
    }
}

impl InferenceSession for OrtSession {
    fn input_size(&self) -> (u32, u32) {
        (self.model_width, self.model_height)
    }

    fn backend(&self) -> ExecutionBackend {
        self.backend
    }

    fn labels(&self) -> &LabelSet {
        &self.labels
    }

    async fn run(&self, x: InputTensor, cancel: &CancelToken) -> Result<RawOutput, DetectError> {
        if cancel.is_cancelled() {
            return Err(DetectError::Cancelled);
        }
        if (x.width(), x.height()) != (self.model_width as usize, self.model_height as usize) {
            return Err(DetectError::Inference(format!(
                "input tensor {:?} does not match model input {}x{}",
                x.shape(),
                self.model_width,
                self.model_height
            )));
        }

        let session = Arc::clone(&self.session);
        let input = self.input.clone();
        let output = self.output.clone();
        tokio::task::spawn_blocking(move || Self::run_blocking(&session, &input, &output, x))
            .await
            .map_err(|e| DetectError::Inference(format!("inference task failed: {e}")))?
    }
}
