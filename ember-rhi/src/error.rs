//! Error taxonomy shared by every backend object factory.

use thiserror::Error;

/// Failure kinds surfaced by the RHI. Constructors hand ownership to the
/// caller only on `Ok`; partially created backend state is torn down before
/// an error is returned.
#[derive(Debug, Error)]
pub enum RhiError {
    /// A requested feature level or mode the hardware/driver cannot satisfy.
    #[error("unsupported configuration: {0}")]
    Config(String),

    /// A backend allocation or object/view creation failed.
    #[error("resource creation failed: {0}")]
    Resource(String),

    /// Shader reflection input was malformed or inconsistent.
    #[error("shader reflection failed: {0}")]
    Reflect(String),

    /// An operation violated an object's state contract.
    #[error("invalid state: {0}")]
    State(String),
}

impl RhiError {
    pub fn config(msg: impl Into<String>) -> Self {
        RhiError::Config(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        RhiError::Resource(msg.into())
    }

    pub fn reflect(msg: impl Into<String>) -> Self {
        RhiError::Reflect(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        RhiError::State(msg.into())
    }
}
