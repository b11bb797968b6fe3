use super::predictor::{MLPredictor, ModelKind};
use crate::domain::errors::{InferenceError, LoadError};
use crate::domain::ml::feature_registry::FeatureVector;
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs;
use std::path::Path;

pub type LiquidityForest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
pub type IrisForest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

enum Forest {
    Regressor(LiquidityForest),
    Classifier(IrisForest),
}

/// Random forest loaded from the serde_json files `train_ml` writes.
///
/// smartcore forests predict through `&self` and hold no interior state,
/// so concurrent requests share one instance without locking.
pub struct SmartCorePredictor {
    forest: Forest,
    version: String,
}

impl SmartCorePredictor {
    pub fn from_regressor(model: LiquidityForest, version: impl Into<String>) -> Self {
        Self {
            forest: Forest::Regressor(model),
            version: version.into(),
        }
    }

    pub fn from_classifier(model: IrisForest, version: impl Into<String>) -> Self {
        Self {
            forest: Forest::Classifier(model),
            version: version.into(),
        }
    }

    pub fn from_json_file(path: &Path, kind: ModelKind) -> Result<Self, LoadError> {
        let failed = |reason: String| LoadError::DeserializationFailed {
            path: path.to_path_buf(),
            reason,
        };

        let buffer = fs::read(path).map_err(|e| failed(format!("read failed: {}", e)))?;
        let version = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match kind {
            ModelKind::Regressor => serde_json::from_slice::<LiquidityForest>(&buffer)
                .map(|model| Self::from_regressor(model, version))
                .map_err(|e| failed(e.to_string())),
            ModelKind::Classifier => serde_json::from_slice::<IrisForest>(&buffer)
                .map(|model| Self::from_classifier(model, version))
                .map_err(|e| failed(e.to_string())),
        }
    }

    fn input_matrix(features: &FeatureVector) -> Result<DenseMatrix<f64>, InferenceError> {
        DenseMatrix::from_2d_vec(&vec![features.as_slice().to_vec()])
            .map_err(|e| InferenceError::new(format!("Matrix creation failed: {}", e)))
    }
}

impl MLPredictor for SmartCorePredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let input = Self::input_matrix(features)?;

        match &self.forest {
            Forest::Regressor(model) => {
                let predictions = model
                    .predict(&input)
                    .map_err(|e| InferenceError::new(format!("Prediction failed: {}", e)))?;
                predictions
                    .first()
                    .copied()
                    .ok_or_else(|| InferenceError::new("No prediction returned"))
            }
            Forest::Classifier(model) => {
                let classes = model
                    .predict(&input)
                    .map_err(|e| InferenceError::new(format!("Prediction failed: {}", e)))?;
                classes
                    .first()
                    .map(|class| *class as f64)
                    .ok_or_else(|| InferenceError::new("No prediction returned"))
            }
        }
    }

    fn name(&self) -> &str {
        match self.forest {
            Forest::Regressor(_) => "SmartCore Random Forest Regressor",
            Forest::Classifier(_) => "SmartCore Random Forest Classifier",
        }
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::training::{ForestParams, fit_liquidity};
    use crate::domain::ml::feature_registry::LIQUIDITY_FEATURES;

    fn tiny_forest() -> LiquidityForest {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let i = i as f64;
                vec![100.0 + i, 1e6 * i, 1e8, 0.5, -0.5, i / 100.0, i % 7.0, 1.0]
            })
            .collect();
        let y: Vec<f64> = (0..20).map(|i| i as f64 / 100.0).collect();
        fit_liquidity(&x, &y, &ForestParams::small()).unwrap()
    }

    #[test]
    fn test_regressor_predicts_within_target_range() {
        let predictor = SmartCorePredictor::from_regressor(tiny_forest(), "test");
        let fv = FeatureVector::from_values(
            LIQUIDITY_FEATURES,
            vec![110.0, 1e7, 1e8, 0.5, -0.5, 0.1, 3.0, 1.0],
        )
        .unwrap();

        let output = predictor.predict(&fv).unwrap();
        assert!((0.0..=0.19).contains(&output));
        assert_eq!(predictor.name(), "SmartCore Random Forest Regressor");
        assert_eq!(predictor.version(), "test");
    }

    #[test]
    fn test_unreadable_file_is_deserialization_failure() {
        let dir = std::env::temp_dir();
        let err = SmartCorePredictor::from_json_file(&dir, ModelKind::Regressor).err();
        assert!(matches!(
            err,
            Some(LoadError::DeserializationFailed { .. })
        ));
    }
}
