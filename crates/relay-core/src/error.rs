use thiserror::Error;

use crate::app::builder::BuildError;
use crate::config::ConfigError;
use crate::ports::BackendError;

/// Run-level failure: anything that stops a drain before the queue is empty.
///
/// Per-message failures never show up here; they are counted in `RunStats`.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),
}
