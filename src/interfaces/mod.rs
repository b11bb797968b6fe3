// Front ends over the prediction services
pub mod http;

pub use http::{ApiError, AppState, router};
