use super::artifact_loader::ArtifactLoader;
use super::predictor::{MLPredictor, ModelKind, infer};
use crate::domain::errors::{LoadError, PredictionError};
use crate::domain::ml::feature_deriver::FeatureDeriver;
use crate::domain::ml::feature_registry::FeatureVector;
use crate::domain::ml::tier_ladder::TierLadder;
use crate::domain::validation::schema::Schema;
use crate::infrastructure::observability::{LatencyGuard, Metrics};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a startup load, kept for the life of the process
pub type LoadedModel = Result<Arc<dyn MLPredictor>, LoadError>;

const MODEL_LABEL: &str = "liquidity";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Unrounded model output
    pub raw_prediction: f64,
    pub tier: String,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelStatus {
    pub fn of(model: &LoadedModel) -> Self {
        match model {
            Ok(predictor) => Self {
                loaded: true,
                name: Some(predictor.name().to_string()),
                version: Some(predictor.version().to_string()),
                error: None,
            },
            Err(e) => Self {
                loaded: false,
                name: None,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Validate -> derive -> infer -> classify, for the liquidity model.
///
/// The model is resolved once at construction. If that failed, every call
/// returns the same `LoadError` without touching the input.
pub struct PredictionService {
    model: LoadedModel,
    schema: Schema,
    deriver: FeatureDeriver,
    ladder: TierLadder,
    metrics: Option<Metrics>,
}

impl PredictionService {
    pub fn new(model: LoadedModel, ratio_epsilon: f64, ladder: TierLadder) -> Self {
        let schema = Schema::liquidity();
        let deriver = FeatureDeriver::liquidity(ratio_epsilon);
        debug_assert!(deriver.check_schema(&schema).is_ok());

        Self {
            model,
            schema,
            deriver,
            ladder,
            metrics: None,
        }
    }

    pub fn load(candidates: &[PathBuf], ratio_epsilon: f64, ladder: TierLadder) -> Self {
        Self::new(
            ArtifactLoader::load(ModelKind::Regressor, candidates),
            ratio_epsilon,
            ladder,
        )
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.set_model_loaded(MODEL_LABEL, self.model.is_ok());
        self.metrics = Some(metrics);
        self
    }

    pub fn is_available(&self) -> bool {
        self.model.is_ok()
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus::of(&self.model)
    }

    pub fn ladder(&self) -> &TierLadder {
        &self.ladder
    }

    pub fn predict(&self, raw: &Map<String, Value>) -> Result<PredictionResult, PredictionError> {
        let outcome = self.run(raw);

        if let Some(metrics) = &self.metrics {
            match &outcome {
                Ok(result) => metrics.inc_predictions(MODEL_LABEL, &result.tier),
                Err(e) => metrics.inc_errors(MODEL_LABEL, e.kind()),
            }
        }
        outcome
    }

    fn run(&self, raw: &Map<String, Value>) -> Result<PredictionResult, PredictionError> {
        let model = self.model.as_ref().map_err(|e| e.clone())?;
        let fields = self.schema.validate(raw)?;
        let features = self.deriver.derive(&fields)?;

        let timer = match &self.metrics {
            Some(metrics) => metrics.inference_timer(MODEL_LABEL),
            None => LatencyGuard::unrecorded(),
        };
        let raw_prediction = infer(model.as_ref(), &features)?;
        let elapsed = timer.finish();
        debug!("{} inference took {:?}", model.name(), elapsed);

        Ok(PredictionResult {
            raw_prediction,
            tier: self.ladder.classify(raw_prediction).to_string(),
            features,
        })
    }
}
