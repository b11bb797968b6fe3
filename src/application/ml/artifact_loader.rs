use super::predictor::{MLPredictor, ModelKind};
use super::smartcore_predictor::SmartCorePredictor;
use crate::domain::errors::LoadError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Resolves a model artifact from an ordered list of candidate paths.
///
/// Loading is a startup concern: callers keep the returned predictor (or the
/// error) for the life of the process and never reload per request.
pub struct ArtifactLoader;

impl ArtifactLoader {
    /// Returns the first candidate that deserializes.
    ///
    /// Missing paths are skipped. When no candidate exists the error is
    /// `NotFound`; when some existed but none loaded, it is the failure of
    /// the first existing one.
    pub fn load(
        kind: ModelKind,
        candidates: &[PathBuf],
    ) -> Result<Arc<dyn MLPredictor>, LoadError> {
        let mut first_failure: Option<LoadError> = None;

        for path in candidates {
            if !path.exists() {
                warn!("Model artifact not found at {:?}", path);
                continue;
            }

            match Self::load_one(kind, path) {
                Ok(predictor) => {
                    info!(
                        "Successfully loaded {} ({}) from {:?}",
                        predictor.name(),
                        predictor.version(),
                        path
                    );
                    return Ok(predictor);
                }
                Err(e) => {
                    error!("Failed to load model artifact: {}", e);
                    first_failure.get_or_insert(e);
                }
            }
        }

        Err(first_failure.unwrap_or_else(|| LoadError::NotFound {
            candidates: candidates.to_vec(),
        }))
    }

    fn load_one(kind: ModelKind, path: &Path) -> Result<Arc<dyn MLPredictor>, LoadError> {
        let is_onnx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));

        if is_onnx {
            return Self::load_onnx(kind, path);
        }

        let predictor = SmartCorePredictor::from_json_file(path, kind)?;
        Ok(Arc::new(predictor))
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(kind: ModelKind, path: &Path) -> Result<Arc<dyn MLPredictor>, LoadError> {
        if kind != ModelKind::Regressor {
            return Err(LoadError::DeserializationFailed {
                path: path.to_path_buf(),
                reason: "ONNX artifacts are only supported for regressors".to_string(),
            });
        }
        let predictor = super::onnx_predictor::OnnxPredictor::from_file(path)?;
        Ok(Arc::new(predictor))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(_kind: ModelKind, path: &Path) -> Result<Arc<dyn MLPredictor>, LoadError> {
        Err(LoadError::DeserializationFailed {
            path: path.to_path_buf(),
            reason: "built without ONNX support".to_string(),
        })
    }
}
