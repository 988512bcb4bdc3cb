//! OpenVINO inference backend

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use ndarray::Array4;
use openvino::{CompiledModel, Core, ElementType, Shape, Tensor};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::context::ModelType;
use super::inference::{InferenceEngine, OutputTensor};

/// Upper bound on outputs probed per request.
const MAX_OUTPUTS: usize = 16;

/// Wrapper for OpenVINO CompiledModel that implements Send
struct SafeCompiledModel(CompiledModel);
unsafe impl Send for SafeCompiledModel {}

/// One compiled network. Requests are created under a lock because the
/// bindings need `&mut` for that; inference itself runs unlocked.
pub struct OpenVinoEngine {
    model_type: ModelType,
    compiled: Mutex<SafeCompiledModel>,
}

impl OpenVinoEngine {
    pub fn load(model_type: ModelType, path: &Path, device: &str) -> anyhow::Result<Self> {
        let path_str = path
            .to_str()
            .with_context(|| format!("model path {:?} is not valid UTF-8", path))?;

        info!("Loading model: {} from {}", model_type.as_str(), path_str);
        let start = Instant::now();

        let mut core = Core::new()?;
        let model = core
            .read_model_from_file(path_str, "")
            .with_context(|| format!("Failed to read {} model", model_type.as_str()))?;
        let compiled = core.compile_model(&model, device.into())?;

        info!("Model {} loaded in {:?}", model_type.as_str(), start.elapsed());

        Ok(Self {
            model_type,
            compiled: Mutex::new(SafeCompiledModel(compiled)),
        })
    }

    fn read_tensor(tensor: &Tensor) -> anyhow::Result<OutputTensor> {
        let shape = tensor.get_shape()?;
        let dims: Vec<usize> = shape.get_dimensions().iter().map(|&d| d as usize).collect();
        let total: usize = dims.iter().product();

        let bytes = tensor.get_raw_data()?;
        anyhow::ensure!(
            bytes.len() >= total * std::mem::size_of::<f32>(),
            "output tensor holds {} bytes, expected {} f32 values",
            bytes.len(),
            total
        );
        let data = bytes
            .chunks_exact(4)
            .take(total)
            .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(OutputTensor::new(dims, data))
    }
}

impl InferenceEngine for OpenVinoEngine {
    fn infer(&self, input: &Array4<f32>) -> anyhow::Result<Vec<OutputTensor>> {
        let mut request = self.compiled.lock().0.create_infer_request()?;

        let dims: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let shape = Shape::new(&dims)?;
        let mut tensor = Tensor::new(ElementType::F32, &shape)?;

        let raw = tensor.get_raw_data_mut()?;
        for (dst, value) in raw.chunks_exact_mut(4).zip(input.iter()) {
            dst.copy_from_slice(&value.to_ne_bytes());
        }

        request.set_input_tensor(&tensor)?;
        request.infer()?;

        let mut outputs = Vec::new();
        for i in 0..MAX_OUTPUTS {
            match request.get_output_tensor_by_index(i) {
                Ok(tensor) => outputs.push(Self::read_tensor(&tensor)?),
                Err(_) => break,
            }
        }
        debug!("{} produced {} outputs", self.model_type.as_str(), outputs.len());

        Ok(outputs)
    }
}
