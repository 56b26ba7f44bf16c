use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tracing::info;

use crate::engine::InferenceBackend;
use crate::error::{ClassifierError, Result};
use crate::preprocess::Tensor;

/// Builds ONNX Runtime sessions with a fixed execution provider setup.
pub struct OnnxModel {
    provider: [ExecutionProviderDispatch; 1],
    intra_threads: Option<usize>,
}

impl OnnxModel {
    pub fn new(cuda: bool) -> Self {
        Self {
            provider: [Self::select_provider(cuda)],
            intra_threads: None,
        }
    }

    pub fn with_intra_threads(mut self, threads: Option<usize>) -> Self {
        self.intra_threads = threads;
        self
    }

    #[cfg(feature = "cuda")]
    fn select_provider(cuda: bool) -> ExecutionProviderDispatch {
        use ort::execution_providers::CUDAExecutionProvider;
        if cuda {
            CUDAExecutionProvider::default().build().error_on_failure()
        } else {
            CPUExecutionProvider::default().build()
        }
    }

    #[cfg(not(feature = "cuda"))]
    fn select_provider(cuda: bool) -> ExecutionProviderDispatch {
        if cuda {
            tracing::warn!(
                "built without the `cuda` feature, falling back to the CPU execution provider"
            );
        }
        CPUExecutionProvider::default().build()
    }

    /// Create a session from serialized model bytes. `asset` only names the
    /// model in errors.
    pub fn load_model(&self, asset: &str, bytes: &[u8]) -> Result<OnnxBackend> {
        let mut builder = Session::builder()
            .map_err(init_error(asset))?
            .with_execution_providers(self.provider.clone())
            .map_err(init_error(asset))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(init_error(asset))?;
        if let Some(threads) = self.intra_threads {
            builder = builder.with_intra_threads(threads).map_err(init_error(asset))?;
        }
        let session = builder.commit_from_memory(bytes).map_err(init_error(asset))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ClassifierError::initialization(asset, "model declares no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ClassifierError::initialization(asset, "model declares no outputs"))?;
        info!(model = asset, input = %input_name, output = %output_name, "loaded ONNX model");

        Ok(OnnxBackend {
            session,
            input_name,
            output_name,
        })
    }
}

fn init_error<E: std::fmt::Display>(asset: &str) -> impl Fn(E) -> ClassifierError + '_ {
    move |e| ClassifierError::initialization(asset, e)
}

/// A loaded ONNX session with its first input and output resolved.
pub struct OnnxBackend {
    session: Session,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OnnxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxBackend")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish()
    }
}

impl InferenceBackend for OnnxBackend {
    fn run(&mut self, input: &Tensor) -> Result<Vec<f32>> {
        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| ClassifierError::Inference(format!("input conversion: {e}")))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ClassifierError::Inference(format!("forward pass: {e}")))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("output extraction: {e}")))?;
        // Expect [1, L]; anything with a batch other than one is malformed.
        if shape.len() != 2 || shape[0] != 1 {
            return Err(ClassifierError::Inference(format!(
                "expected output shape [1, L], got {shape:?}"
            )));
        }
        Ok(data.to_vec())
    }
}
