//! # Feature Readiness Coordinator
//!
//! Drives each feature attached to an entity through the configured state
//! chain. Advancement is guarded twice: by the feature's own
//! [`FeatureHooks::can_enter`] precondition, and for barrier states by
//! every sibling feature on the same entity having already reached at
//! least the barrier's predecessor state. The predecessor rule is what
//! makes barriers a rendezvous rather than a deadlock: the first feature
//! to arrive passes once everyone is one step behind it, and the rest
//! follow as notifications fan out.
//!
//! State is strictly monotonic per feature: indices never decrease and
//! never skip. A newly registered sibling unblocks already-advanced
//! features only through the change-notification -> `drive_chain` re-check
//! mechanism, never by rewinding their state.
//!
//! All operations execute synchronously on the caller's thread. No lock is
//! held while hooks or subscriber callbacks run, so callbacks may freely
//! call back into the coordinator.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::chain::StateChain;
use super::errors::{CoordinatorError, CoordinatorResult};
use super::hooks::{FeatureHooks, TransitionContext};
use crate::entity::EntityId;
use crate::logging::log_feature_operation;
use crate::tags::Tag;

/// Notification delivered when a feature's state changes on an entity
#[derive(Debug, Clone)]
pub struct StateChangeNotice {
    pub entity: EntityId,
    pub feature_name: String,
    pub state: Tag,
}

/// Optional constraints on which state changes a subscriber receives
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    /// Only changes of this feature, when set
    pub feature_name: Option<String>,
    /// Only changes reaching at least this state, when set
    pub min_state: Option<Tag>,
}

type ChangeCallback = Arc<dyn Fn(&StateChangeNotice) + Send + Sync>;

struct ChangeSubscriber {
    id: u64,
    feature_name: Option<String>,
    min_state_index: Option<usize>,
    callback: ChangeCallback,
}

impl ChangeSubscriber {
    fn matches(&self, feature_name: &str, state_index: usize) -> bool {
        if self
            .feature_name
            .as_ref()
            .is_some_and(|wanted| wanted != feature_name)
        {
            return false;
        }

        self.min_state_index
            .is_none_or(|minimum| state_index >= minimum)
    }
}

impl fmt::Debug for ChangeSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscriber")
            .field("id", &self.id)
            .field("feature_name", &self.feature_name)
            .field("min_state_index", &self.min_state_index)
            .finish()
    }
}

struct FeatureRecord {
    /// Index into the chain; `None` before the first transition
    state: Option<usize>,
    hooks: Arc<dyn FeatureHooks>,
}

#[derive(Default)]
struct EntityRecord {
    features: HashMap<String, FeatureRecord>,
    subscribers: Vec<ChangeSubscriber>,
    /// Monotonically increasing; subscription ids are never reused
    next_subscriber_id: u64,
}

pub(crate) struct CoordinatorState {
    chain: StateChain,
    entities: RwLock<HashMap<EntityId, EntityRecord>>,
}

impl CoordinatorState {
    pub(crate) fn remove_subscriber(&self, entity: EntityId, subscriber_id: u64) {
        let mut entities = self.entities.write();

        if let Some(record) = entities.get_mut(&entity) {
            record
                .subscribers
                .retain(|subscriber| subscriber.id != subscriber_id);

            if record.features.is_empty() && record.subscribers.is_empty() {
                entities.remove(&entity);
            }
        }
    }
}

/// Handle for removing a change subscription; unsubscription is idempotent
pub struct ChangeSubscription {
    coordinator: Weak<CoordinatorState>,
    entity: EntityId,
    subscriber_id: u64,
}

impl ChangeSubscription {
    pub fn is_valid(&self) -> bool {
        self.subscriber_id != 0
    }

    /// Stop receiving notifications. Idempotent; survives the coordinator
    /// being dropped first.
    pub fn unsubscribe(&mut self) {
        if !self.is_valid() {
            return;
        }

        if let Some(state) = self.coordinator.upgrade() {
            state.remove_subscriber(self.entity, self.subscriber_id);
        }

        self.coordinator = Weak::new();
        self.subscriber_id = 0;
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("entity", &self.entity)
            .field("subscriber_id", &self.subscriber_id)
            .finish()
    }
}

/// Statistics about a readiness coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorStats {
    pub entities: usize,
    pub features: usize,
    pub subscribers: usize,
}

/// Coordinator for feature readiness across entities
#[derive(Clone)]
pub struct ReadinessCoordinator {
    state: Arc<CoordinatorState>,
}

impl ReadinessCoordinator {
    /// Create a coordinator for the given state chain
    pub fn new(chain: StateChain) -> Self {
        Self {
            state: Arc::new(CoordinatorState {
                chain,
                entities: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The configured state chain shared by all entities and features
    pub fn chain(&self) -> &StateChain {
        &self.state.chain
    }

    /// Register a feature on an entity, supplying its transition hooks.
    ///
    /// Must be called before any transition attempt. Registering the same
    /// (entity, feature) pair twice is a caller contract violation:
    /// asserted in debug builds, a defined error otherwise.
    pub fn register_feature(
        &self,
        entity: EntityId,
        feature_name: impl Into<String>,
        hooks: Arc<dyn FeatureHooks>,
    ) -> CoordinatorResult<()> {
        let feature_name = feature_name.into();

        {
            let mut entities = self.state.entities.write();
            let record = entities.entry(entity).or_default();

            if record.features.contains_key(&feature_name) {
                drop(entities);
                debug_assert!(
                    false,
                    "feature '{feature_name}' registered twice on {entity}"
                );
                return Err(CoordinatorError::FeatureAlreadyRegistered {
                    entity,
                    feature: feature_name,
                });
            }

            record
                .features
                .insert(feature_name.clone(), FeatureRecord { state: None, hooks });
        }

        debug!(
            entity = %entity,
            feature = %feature_name,
            "Registered feature"
        );
        Ok(())
    }

    /// Remove a feature's registry entry.
    ///
    /// Siblings blocked on this feature are not notified; their barrier
    /// condition re-evaluates lazily on their next `drive_chain`. Removing
    /// a feature that was never registered is a no-op.
    pub fn unregister_feature(&self, entity: EntityId, feature_name: &str) {
        let mut entities = self.state.entities.write();

        if let Some(record) = entities.get_mut(&entity) {
            record.features.remove(feature_name);

            if record.features.is_empty() && record.subscribers.is_empty() {
                entities.remove(&entity);
            }
        }

        debug!(entity = %entity, feature = %feature_name, "Unregistered feature");
    }

    /// Remove every registry entry for an entity. Called by the host at
    /// entity teardown; the core performs no garbage collection of its own.
    pub fn remove_entity(&self, entity: EntityId) {
        self.state.entities.write().remove(&entity);
        debug!(entity = %entity, "Removed entity");
    }

    /// Attempt the single next transition in the chain for a feature.
    ///
    /// Returns `Ok(true)` if the feature advanced, `Ok(false)` if it is
    /// blocked (guard or barrier unsatisfied) or already terminal. Calling
    /// this on an unregistered feature is a caller contract violation:
    /// asserted in debug builds, a defined error otherwise.
    pub fn try_advance(&self, entity: EntityId, feature_name: &str) -> CoordinatorResult<bool> {
        // Evaluate chain position and the barrier condition under the lock
        let (current_index, target_index, hooks) = {
            let entities = self.state.entities.read();

            let Some(record) = entities.get(&entity) else {
                drop(entities);
                return Err(self.not_registered(entity, feature_name));
            };
            let Some(feature) = record.features.get(feature_name) else {
                drop(entities);
                return Err(self.not_registered(entity, feature_name));
            };

            let current_index = feature.state;
            let target_index = current_index.map_or(0, |index| index + 1);

            if target_index > self.state.chain.terminal_index() {
                return Ok(false);
            }

            // A barrier is enterable once every sibling has reached the
            // barrier's predecessor state. A barrier as the first chain
            // state has no predecessor and gates nothing.
            if self.state.chain.state_at(target_index).barrier {
                if let Some(required) = target_index.checked_sub(1) {
                    if !all_siblings_at(record, feature_name, required) {
                        return Ok(false);
                    }
                }
            }

            (current_index, target_index, feature.hooks.clone())
        };

        // Feature-local guard, evaluated with no lock held
        let desired_state = self.state.chain.state_at(target_index).tag.clone();
        let current_state = current_index.map(|index| self.state.chain.state_at(index).tag.clone());
        let ctx = TransitionContext {
            entity,
            feature_name,
            current_state: current_state.as_ref(),
            desired_state: &desired_state,
        };

        if !hooks.can_enter(&ctx) {
            debug!(
                entity = %entity,
                feature = %feature_name,
                desired_state = %desired_state,
                guard = hooks.description(),
                "Transition blocked by feature guard"
            );
            return Ok(false);
        }

        // Commit, snapshotting the subscribers to notify
        let callbacks: Vec<ChangeCallback> = {
            let mut entities = self.state.entities.write();

            let Some(record) = entities.get_mut(&entity) else {
                drop(entities);
                return Err(self.not_registered(entity, feature_name));
            };
            let Some(feature) = record.features.get_mut(feature_name) else {
                drop(entities);
                return Err(self.not_registered(entity, feature_name));
            };

            // The registry may have moved underneath a misbehaving guard;
            // treat that as blocked rather than corrupting the chain
            if feature.state != current_index {
                return Ok(false);
            }

            feature.state = Some(target_index);

            record
                .subscribers
                .iter()
                .filter(|subscriber| subscriber.matches(feature_name, target_index))
                .map(|subscriber| subscriber.callback.clone())
                .collect()
        };

        log_feature_operation(
            "advance",
            Some(entity.value()),
            Some(feature_name),
            Some(desired_state.name()),
            "committed",
            None,
        );

        hooks.on_enter(&ctx);

        let notice = StateChangeNotice {
            entity,
            feature_name: feature_name.to_string(),
            state: desired_state,
        };
        for callback in callbacks {
            callback(&notice);
        }

        Ok(true)
    }

    /// Repeatedly attempt transitions until blocked or terminal; returns
    /// the feature's resulting state.
    ///
    /// This is the typical re-check a feature runs whenever something may
    /// have unblocked it (a sibling advanced, data arrived, and so on).
    pub fn drive_chain(
        &self,
        entity: EntityId,
        feature_name: &str,
    ) -> CoordinatorResult<Option<Tag>> {
        while self.try_advance(entity, feature_name)? {}

        Ok(self.current_state(entity, feature_name))
    }

    /// Subscribe to state changes of features on an entity.
    ///
    /// The callback fires after each committed transition matching the
    /// filter. Returns an error if the filter names a state outside the
    /// configured chain.
    pub fn subscribe_to_entity_changes<F>(
        &self,
        entity: EntityId,
        filter: ChangeFilter,
        callback: F,
    ) -> CoordinatorResult<ChangeSubscription>
    where
        F: Fn(&StateChangeNotice) + Send + Sync + 'static,
    {
        let min_state_index = match &filter.min_state {
            Some(state) => Some(
                self.state
                    .chain
                    .index_of(state)
                    .ok_or_else(|| CoordinatorError::UnknownState(state.clone()))?,
            ),
            None => None,
        };

        let subscriber_id = {
            let mut entities = self.state.entities.write();
            let record = entities.entry(entity).or_default();

            record.next_subscriber_id += 1;
            let subscriber_id = record.next_subscriber_id;

            record.subscribers.push(ChangeSubscriber {
                id: subscriber_id,
                feature_name: filter.feature_name,
                min_state_index,
                callback: Arc::new(callback),
            });

            subscriber_id
        };

        debug!(entity = %entity, subscriber_id, "Subscribed to entity changes");

        Ok(ChangeSubscription {
            coordinator: Arc::downgrade(&self.state),
            entity,
            subscriber_id,
        })
    }

    /// Current state of a feature, `None` before its first transition or
    /// for unknown features
    pub fn current_state(&self, entity: EntityId, feature_name: &str) -> Option<Tag> {
        let entities = self.state.entities.read();
        let index = entities
            .get(&entity)?
            .features
            .get(feature_name)?
            .state?;

        Some(self.state.chain.state_at(index).tag.clone())
    }

    /// Whether a feature has reached at least `state`
    pub fn has_feature_reached_state(
        &self,
        entity: EntityId,
        feature_name: &str,
        state: &Tag,
    ) -> bool {
        let Some(wanted) = self.state.chain.index_of(state) else {
            warn!(state = %state, "State is not part of the configured chain");
            return false;
        };

        let entities = self.state.entities.read();
        entities
            .get(&entity)
            .and_then(|record| record.features.get(feature_name))
            .and_then(|feature| feature.state)
            .is_some_and(|current| current >= wanted)
    }

    /// Whether every feature on `entity` (optionally excluding one) has
    /// reached at least `state`. False for unknown entities.
    pub fn have_all_features_reached_state(
        &self,
        entity: EntityId,
        state: &Tag,
        excluding: Option<&str>,
    ) -> bool {
        let Some(wanted) = self.state.chain.index_of(state) else {
            warn!(state = %state, "State is not part of the configured chain");
            return false;
        };

        let entities = self.state.entities.read();
        let Some(record) = entities.get(&entity) else {
            return false;
        };

        record
            .features
            .iter()
            .filter(|(name, _)| excluding != Some(name.as_str()))
            .all(|(_, feature)| feature.state.is_some_and(|current| current >= wanted))
    }

    /// Get coordinator statistics
    pub fn stats(&self) -> CoordinatorStats {
        let entities = self.state.entities.read();

        CoordinatorStats {
            entities: entities.len(),
            features: entities.values().map(|record| record.features.len()).sum(),
            subscribers: entities
                .values()
                .map(|record| record.subscribers.len())
                .sum(),
        }
    }

    fn not_registered(&self, entity: EntityId, feature_name: &str) -> CoordinatorError {
        debug_assert!(
            false,
            "feature '{feature_name}' is not registered on {entity}"
        );
        CoordinatorError::FeatureNotRegistered {
            entity,
            feature: feature_name.to_string(),
        }
    }
}

impl Default for ReadinessCoordinator {
    fn default() -> Self {
        Self::new(StateChain::default_init_chain())
    }
}

impl fmt::Debug for ReadinessCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("ReadinessCoordinator")
            .field("chain_len", &self.state.chain.len())
            .field("entities", &stats.entities)
            .field("features", &stats.features)
            .finish()
    }
}

fn all_siblings_at(record: &EntityRecord, excluding: &str, required_index: usize) -> bool {
    record
        .features
        .iter()
        .filter(|(name, _)| name.as_str() != excluding)
        .all(|(_, feature)| {
            feature
                .state
                .is_some_and(|current| current >= required_index)
        })
}
