use crate::application::ml::predictor::MLPredictor;
use crate::domain::errors::InferenceError;
use crate::domain::ml::feature_registry::FeatureVector;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed output and remembers what it was called with.
pub struct ConstantPredictor {
    output: f64,
    calls: AtomicUsize,
    last_features: Mutex<Option<Vec<f64>>>,
}

impl ConstantPredictor {
    pub fn new(output: f64) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
            last_features: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_features(&self) -> Option<Vec<f64>> {
        self.last_features.lock().ok().and_then(|last| last.clone())
    }
}

impl MLPredictor for ConstantPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_features.lock() {
            *last = Some(features.as_slice().to_vec());
        }
        Ok(self.output)
    }

    fn name(&self) -> &str {
        "Constant Mock"
    }

    fn version(&self) -> &str {
        "mock"
    }
}

/// Always fails with the given cause.
pub struct FailingPredictor {
    cause: String,
}

impl FailingPredictor {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

impl MLPredictor for FailingPredictor {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
        Err(InferenceError::new(self.cause.clone()))
    }

    fn name(&self) -> &str {
        "Failing Mock"
    }

    fn version(&self) -> &str {
        "mock"
    }
}

/// Panics inside `predict`, like a native model fed a malformed input.
pub struct PanickingPredictor;

impl MLPredictor for PanickingPredictor {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
        panic!("index out of bounds in mock model")
    }

    fn name(&self) -> &str {
        "Panicking Mock"
    }

    fn version(&self) -> &str {
        "mock"
    }
}
