/// Convenience result type used across scenecrop.
pub type ScenecropResult<T> = Result<T, ScenecropError>;

/// Top-level error taxonomy used by extraction and batch APIs.
#[derive(thiserror::Error, Debug)]
pub enum ScenecropError {
    /// Invalid caller-provided data (buffer shapes, parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// A semantic object key that matches none of the recognized shapes.
    #[error("reference error: {0}")]
    Reference(String),

    /// Invalid or unreadable pipeline / planning configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Errors when serializing or deserializing records.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScenecropError {
    /// Build a [`ScenecropError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ScenecropError::Reference`] value.
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }

    /// Build a [`ScenecropError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ScenecropError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
