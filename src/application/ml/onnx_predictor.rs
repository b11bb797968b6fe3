use super::predictor::MLPredictor;
use crate::domain::errors::{InferenceError, LoadError};
use crate::domain::ml::feature_registry::FeatureVector;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// ONNX Runtime regressor.
///
/// `Session::run` needs exclusive access, so every inference goes through the
/// mutex: ONNX requests are serialized while smartcore ones run in parallel.
pub struct OnnxPredictor {
    session: Mutex<Session>,
    version: String,
}

impl OnnxPredictor {
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let failed = |reason: String| LoadError::DeserializationFailed {
            path: path.to_path_buf(),
            reason,
        };

        let builder = Session::builder()
            .map_err(|e| failed(format!("Failed to create ONNX session builder: {}", e)))?;
        let session = builder
            .commit_from_file(path)
            .map_err(|e| failed(e.to_string()))?;

        debug!("ONNX session ready for {:?}", path);
        Ok(Self {
            session: Mutex::new(session),
            version: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
        })
    }
}

impl MLPredictor for OnnxPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::new(format!("Session lock failed: {}", e)))?;

        // [batch, features]
        let shape = vec![1, features.len()];
        let input_value = ort::value::Value::from_array((shape.as_slice(), features.to_f32()))
            .map_err(|e| InferenceError::new(format!("Input value creation failed: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| InferenceError::new(e.to_string()))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| InferenceError::new("No output found"))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new(e.to_string()))?;

        data.1
            .iter()
            .next()
            .map(|v| *v as f64)
            .ok_or_else(|| InferenceError::new("Empty output"))
    }

    fn name(&self) -> &str {
        "ONNX Runtime Regressor"
    }

    fn version(&self) -> &str {
        &self.version
    }
}
