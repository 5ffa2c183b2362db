use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RelayError {
    TagError(String),
    ReadinessError(String),
    ConfigurationError(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::TagError(msg) => write!(f, "Tag error: {msg}"),
            RelayError::ReadinessError(msg) => write!(f, "Readiness error: {msg}"),
            RelayError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<crate::tags::TagError> for RelayError {
    fn from(err: crate::tags::TagError) -> Self {
        RelayError::TagError(err.to_string())
    }
}

impl From<crate::readiness::CoordinatorError> for RelayError {
    fn from(err: crate::readiness::CoordinatorError) -> Self {
        RelayError::ReadinessError(err.to_string())
    }
}

impl From<crate::config::ConfigurationError> for RelayError {
    fn from(err: crate::config::ConfigurationError) -> Self {
        RelayError::ConfigurationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
