pub mod artifact_loader;
pub mod iris_service;
#[cfg(feature = "onnx")]
pub mod onnx_predictor;
pub mod prediction_service;
pub mod predictor;
pub mod smartcore_predictor;
pub mod training;

pub use artifact_loader::ArtifactLoader;
pub use iris_service::{IrisPrediction, IrisService};
pub use prediction_service::{ModelStatus, PredictionResult, PredictionService};
pub use predictor::{MLPredictor, ModelKind};
