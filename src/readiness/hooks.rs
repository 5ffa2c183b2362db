//! Per-feature transition guards and handlers.
//!
//! Each feature supplies its hooks at registration time; the coordinator
//! calls [`FeatureHooks::can_enter`] to evaluate the feature-local
//! precondition for a transition and [`FeatureHooks::on_enter`] after a
//! transition commits. Guards must be pure with respect to coordinator
//! state: they may call the coordinator's queries but must not register,
//! unregister, or advance features.

use crate::entity::EntityId;
use crate::tags::Tag;

/// Context for one attempted or committed transition
#[derive(Debug)]
pub struct TransitionContext<'a> {
    pub entity: EntityId,
    pub feature_name: &'a str,
    /// `None` when the feature has not entered the chain yet
    pub current_state: Option<&'a Tag>,
    pub desired_state: &'a Tag,
}

/// Guard/handler pair supplied per feature at registration
pub trait FeatureHooks: Send + Sync {
    /// Feature-local precondition for entering the desired state.
    /// The default accepts every transition.
    fn can_enter(&self, ctx: &TransitionContext<'_>) -> bool {
        let _ = ctx;
        true
    }

    /// Invoked after the desired state has been committed
    fn on_enter(&self, ctx: &TransitionContext<'_>) {
        let _ = ctx;
    }

    /// Get a description of these hooks for logging
    fn description(&self) -> &'static str {
        "feature hooks"
    }
}

type CanEnterFn = dyn Fn(&TransitionContext<'_>) -> bool + Send + Sync;
type OnEnterFn = dyn Fn(&TransitionContext<'_>) + Send + Sync;

/// Closure-backed hooks for features without a dedicated type
#[derive(Default)]
pub struct FeatureHandlers {
    can_enter: Option<Box<CanEnterFn>>,
    on_enter: Option<Box<OnEnterFn>>,
}

impl FeatureHandlers {
    /// Hooks that accept every transition and do nothing on entry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_can_enter<F>(mut self, guard: F) -> Self
    where
        F: Fn(&TransitionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.can_enter = Some(Box::new(guard));
        self
    }

    pub fn with_on_enter<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TransitionContext<'_>) + Send + Sync + 'static,
    {
        self.on_enter = Some(Box::new(handler));
        self
    }
}

impl FeatureHooks for FeatureHandlers {
    fn can_enter(&self, ctx: &TransitionContext<'_>) -> bool {
        self.can_enter.as_ref().is_none_or(|guard| guard(ctx))
    }

    fn on_enter(&self, ctx: &TransitionContext<'_>) {
        if let Some(handler) = &self.on_enter {
            handler(ctx);
        }
    }

    fn description(&self) -> &'static str {
        "closure feature handlers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_handlers_accept_everything() {
        let hooks = FeatureHandlers::new();
        let desired = Tag::try_new("Hooks.Test.State").unwrap();
        let ctx = TransitionContext {
            entity: EntityId::new(1),
            feature_name: "test",
            current_state: None,
            desired_state: &desired,
        };

        assert!(hooks.can_enter(&ctx));
        hooks.on_enter(&ctx);
    }

    #[test]
    fn test_closure_handlers_invoked() {
        let entries = Arc::new(AtomicU64::new(0));
        let counter = entries.clone();

        let hooks = FeatureHandlers::new()
            .with_can_enter(|ctx| ctx.feature_name == "allowed")
            .with_on_enter(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            });

        let desired = Tag::try_new("Hooks.Test.State").unwrap();
        let allowed = TransitionContext {
            entity: EntityId::new(1),
            feature_name: "allowed",
            current_state: None,
            desired_state: &desired,
        };
        let denied = TransitionContext {
            entity: EntityId::new(1),
            feature_name: "denied",
            current_state: None,
            desired_state: &desired,
        };

        assert!(hooks.can_enter(&allowed));
        assert!(!hooks.can_enter(&denied));

        hooks.on_enter(&allowed);
        assert_eq!(entries.load(Ordering::Relaxed), 1);
    }
}
