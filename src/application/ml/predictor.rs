use crate::domain::errors::InferenceError;
use crate::domain::ml::feature_registry::FeatureVector;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// What a loaded artifact is expected to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Continuous score (liquidity ratio)
    Regressor,
    /// Class index
    Classifier,
}

/// Interface for Machine Learning models.
///
/// Implementations are loaded once and shared read-only across requests,
/// so `predict` takes `&self`; any interior locking is the implementation's
/// own resource policy.
pub trait MLPredictor: Send + Sync {
    /// Raw model output: a score for regressors, a class index for classifiers
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str;
}

/// Calls `predictor`, folding errors, panics and non-finite outputs into
/// `InferenceError`.
pub fn infer(predictor: &dyn MLPredictor, features: &FeatureVector) -> Result<f64, InferenceError> {
    let output = panic::catch_unwind(AssertUnwindSafe(|| predictor.predict(features)))
        .map_err(|payload| {
            InferenceError::new(format!(
                "{} panicked: {}",
                predictor.name(),
                panic_message(payload.as_ref())
            ))
        })??;

    if output.is_finite() {
        Ok(output)
    } else {
        Err(InferenceError::new(format!(
            "{} returned a non-finite output: {}",
            predictor.name(),
            output
        )))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_registry::IRIS_FEATURES;
    use crate::infrastructure::mock::{ConstantPredictor, FailingPredictor, PanickingPredictor};

    fn features() -> FeatureVector {
        FeatureVector::from_values(IRIS_FEATURES, vec![5.1, 3.5, 1.4, 0.2]).unwrap()
    }

    #[test]
    fn test_infer_passes_through_output() {
        let predictor = ConstantPredictor::new(0.05);
        assert_eq!(infer(&predictor, &features()), Ok(0.05));
    }

    #[test]
    fn test_infer_rewraps_errors() {
        let predictor = FailingPredictor::new("shape mismatch");
        let err = infer(&predictor, &features()).unwrap_err();
        assert!(err.cause.contains("shape mismatch"));
    }

    #[test]
    fn test_infer_catches_panics() {
        let err = infer(&PanickingPredictor, &features()).unwrap_err();
        assert!(err.cause.contains("panicked"));
    }

    #[test]
    fn test_infer_rejects_non_finite() {
        for value in [f64::NAN, f64::INFINITY] {
            let predictor = ConstantPredictor::new(value);
            assert!(infer(&predictor, &features()).is_err());
        }
    }
}
