//! Error type shared by all seadrift crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("scenario `{scenario}` requires currents but no current data is available")]
    MissingCurrents { scenario: String },

    #[error("scenario `{scenario}` requires winds but no wind data is available")]
    MissingWinds { scenario: String },

    #[error("scenario `{scenario}` references unknown object type `{object_type}`")]
    UnknownObjectType { scenario: String, object_type: String },

    #[error("scenario `{scenario}` has no particles")]
    EmptyScenario { scenario: String },

    #[error("slice {slice} of scenario {scenario} failed: {message}")]
    SliceFailed {
        scenario: usize,
        slice: usize,
        message: String,
    },

    #[error("failed to spawn worker pool: {0}")]
    WorkerPool(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}
