//! Error types for feature readiness coordination.

use thiserror::Error;

use crate::entity::EntityId;
use crate::tags::Tag;

/// Errors produced by the readiness coordinator.
///
/// Registration and advancement errors are caller contract violations; in
/// debug builds they additionally trip a `debug_assert!` at the call site.
/// A blocked guard is not an error: `try_advance` reports it as `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("feature '{feature}' is already registered on {entity}")]
    FeatureAlreadyRegistered { entity: EntityId, feature: String },

    #[error("feature '{feature}' is not registered on {entity}")]
    FeatureNotRegistered { entity: EntityId, feature: String },

    #[error("invalid state chain: {0}")]
    InvalidChain(String),

    #[error("state '{0}' is not part of the configured chain")]
    UnknownState(Tag),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
