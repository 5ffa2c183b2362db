//! # Feature Readiness
//!
//! Coordinates features attached to entities through an ordered state
//! chain. Each feature advances independently, gated by its own transition
//! guard and, for barrier states, by every sibling feature on the same
//! entity having already reached the target state.

pub mod chain;
pub mod coordinator;
pub mod errors;
pub mod hooks;

// Re-export main types for convenient access
pub use chain::{StateChain, StateSpec};
pub use coordinator::{
    ChangeFilter, ChangeSubscription, CoordinatorStats, ReadinessCoordinator, StateChangeNotice,
};
pub use errors::{CoordinatorError, CoordinatorResult};
pub use hooks::{FeatureHandlers, FeatureHooks, TransitionContext};
