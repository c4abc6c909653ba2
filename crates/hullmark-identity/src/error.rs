use hullmark_core::HullmarkError;
use thiserror::Error;

/// Errors from building rules out of configuration or from emitting output.
/// Dirty input never ends up here; it is reported per record through
/// [`crate::dedup::ResolutionIssue`].
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] HullmarkError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IdentityError>;
