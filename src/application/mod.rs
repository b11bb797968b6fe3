// Model loading, inference and the prediction pipelines
pub mod ml;
