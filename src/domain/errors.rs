use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or deserializing a model artifact
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("No model artifact found (tried: {})", join_paths(.candidates))]
    NotFound { candidates: Vec<PathBuf> },

    #[error("Failed to deserialize model artifact {path:?}: {reason}")]
    DeserializationFailed { path: PathBuf, reason: String },
}

/// Category of a single field failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingField,
    TypeMismatch,
    OutOfRange,
}

/// One failed field check
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct FieldViolation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl FieldViolation {
    pub fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: ViolationKind::MissingField,
            message: "field required".to_string(),
        }
    }

    pub fn type_mismatch(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind: ViolationKind::TypeMismatch,
            message: message.into(),
        }
    }

    pub fn out_of_range(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind: ViolationKind::OutOfRange,
            message: message.into(),
        }
    }
}

/// Every violation found in a single request, in declared field order
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid input: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn single(violation: FieldViolation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// Kind reported for `field`, if that field failed
    pub fn kind_of(&self, field: &str) -> Option<ViolationKind> {
        self.violations
            .iter()
            .find(|v| v.field == field)
            .map(|v| v.kind)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

/// The model call itself failed or produced an unusable value
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Inference failed: {cause}")]
pub struct InferenceError {
    pub cause: String,
}

impl InferenceError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

/// Failure of one pass through the prediction pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("Predictions unavailable: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictionError {
    /// Stable machine-readable tag, used in HTTP bodies and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Load(_) => "load_error",
            PredictionError::Validation(_) => "validation_error",
            PredictionError::Inference(_) => "inference_error",
        }
    }
}

/// Rejected tier ladder configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LadderError {
    #[error("Tier label at position {index} is empty")]
    EmptyLabel { index: usize },

    #[error("Tier threshold at position {index} is not finite: {value}")]
    NonFiniteThreshold { index: usize, value: f64 },

    #[error("Tier thresholds must strictly descend: {current} follows {previous}")]
    NotDescending { previous: f64, current: f64 },

    #[error("Cannot parse tier ladder: {reason}")]
    Parse { reason: String },
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidates".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_candidates() {
        let err = LoadError::NotFound {
            candidates: vec![PathBuf::from("a/model.json"), PathBuf::from("b/model.json")],
        };

        let msg = err.to_string();
        assert!(msg.contains("a/model.json"));
        assert!(msg.contains("b/model.json"));
    }

    #[test]
    fn test_validation_error_reports_every_field() {
        let err = ValidationError {
            violations: vec![
                FieldViolation::missing("month"),
                FieldViolation::out_of_range("day_of_week", "must be between 0 and 6"),
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("month: field required"));
        assert!(msg.contains("day_of_week: must be between 0 and 6"));
        assert_eq!(err.kind_of("month"), Some(ViolationKind::MissingField));
        assert_eq!(err.fields(), vec!["month", "day_of_week"]);
    }

    #[test]
    fn test_prediction_error_kinds() {
        let load: PredictionError = LoadError::NotFound { candidates: vec![] }.into();
        let inference: PredictionError = InferenceError::new("boom").into();

        assert_eq!(load.kind(), "load_error");
        assert_eq!(inference.kind(), "inference_error");
        assert!(load.to_string().starts_with("Predictions unavailable"));
    }
}
