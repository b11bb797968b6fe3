use super::artifact_loader::ArtifactLoader;
use super::prediction_service::{LoadedModel, ModelStatus};
use super::predictor::{ModelKind, infer};
use crate::domain::errors::{InferenceError, PredictionError};
use crate::domain::ml::feature_deriver::FeatureDeriver;
use crate::domain::validation::schema::Schema;
use crate::infrastructure::observability::{LatencyGuard, Metrics};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

pub const IRIS_CLASSES: [&str; 3] = ["setosa", "versicolor", "virginica"];

const MODEL_LABEL: &str = "iris";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrisPrediction {
    pub class_index: usize,
    pub label: &'static str,
}

/// Species classifier over the four flower measurements.
pub struct IrisService {
    model: LoadedModel,
    schema: Schema,
    deriver: FeatureDeriver,
    metrics: Option<Metrics>,
}

impl IrisService {
    pub fn new(model: LoadedModel) -> Self {
        let schema = Schema::iris();
        let deriver = FeatureDeriver::iris();
        debug_assert!(deriver.check_schema(&schema).is_ok());

        Self {
            model,
            schema,
            deriver,
            metrics: None,
        }
    }

    pub fn load(candidates: &[PathBuf]) -> Self {
        Self::new(ArtifactLoader::load(ModelKind::Classifier, candidates))
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.set_model_loaded(MODEL_LABEL, self.model.is_ok());
        self.metrics = Some(metrics);
        self
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus::of(&self.model)
    }

    pub fn predict(&self, raw: &Map<String, Value>) -> Result<IrisPrediction, PredictionError> {
        let outcome = self.run(raw);

        if let Some(metrics) = &self.metrics {
            match &outcome {
                Ok(prediction) => metrics.inc_predictions(MODEL_LABEL, prediction.label),
                Err(e) => metrics.inc_errors(MODEL_LABEL, e.kind()),
            }
        }
        outcome
    }

    fn run(&self, raw: &Map<String, Value>) -> Result<IrisPrediction, PredictionError> {
        let model = self.model.as_ref().map_err(|e| e.clone())?;
        let fields = self.schema.validate(raw)?;
        let features = self.deriver.derive(&fields)?;

        let timer = match &self.metrics {
            Some(metrics) => metrics.inference_timer(MODEL_LABEL),
            None => LatencyGuard::unrecorded(),
        };
        let output = infer(model.as_ref(), &features)?;
        let elapsed = timer.finish();
        debug!("{} inference took {:?}", model.name(), elapsed);

        let class_index = class_index(output)?;
        Ok(IrisPrediction {
            class_index,
            label: IRIS_CLASSES[class_index],
        })
    }
}

fn class_index(output: f64) -> Result<usize, InferenceError> {
    if output >= 0.0 && output.fract() == 0.0 && (output as usize) < IRIS_CLASSES.len() {
        Ok(output as usize)
    } else {
        Err(InferenceError::new(format!(
            "model returned unknown class {}",
            output
        )))
    }
}
