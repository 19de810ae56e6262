use thiserror::Error;

/// Failures preparing the engine from its settings.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The engine cannot start with the supplied settings.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    /// A setting holds a value the engine does not accept.
    #[error("setting {setting} rejected: {reason}")]
    InvalidInput {
        setting: &'static str,
        reason: String,
    },
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
