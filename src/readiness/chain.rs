//! Ordered readiness state chains.
//!
//! A [`StateChain`] is the globally configured, linearly ordered list of
//! states every feature advances through. It is set once per session and
//! shared by all entities; only per-transition guard behavior varies per
//! feature. States marked as barriers can only be entered once every
//! sibling feature on the same entity has reached the barrier's
//! predecessor state.

use super::errors::{CoordinatorError, CoordinatorResult};
use crate::config::StateSpecConfig;
use crate::constants::init_states;
use crate::tags::Tag;

/// One state in a chain, with its barrier flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpec {
    pub tag: Tag,
    /// Entering this state requires all sibling features at or past the
    /// preceding state
    pub barrier: bool,
}

impl StateSpec {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            barrier: false,
        }
    }

    pub fn barrier(tag: Tag) -> Self {
        Self { tag, barrier: true }
    }
}

/// The configured ordered list of readiness states
#[derive(Debug, Clone)]
pub struct StateChain {
    states: Vec<StateSpec>,
}

impl StateChain {
    /// Build a chain, validating it is non-empty with unique state tags
    pub fn new(states: Vec<StateSpec>) -> CoordinatorResult<Self> {
        if states.is_empty() {
            return Err(CoordinatorError::InvalidChain(
                "state chain must contain at least one state".to_string(),
            ));
        }

        for (index, spec) in states.iter().enumerate() {
            if states[..index].iter().any(|other| other.tag == spec.tag) {
                return Err(CoordinatorError::InvalidChain(format!(
                    "state '{}' appears more than once",
                    spec.tag
                )));
            }
        }

        Ok(Self { states })
    }

    /// Build a chain from configuration entries
    pub fn from_config(specs: &[StateSpecConfig]) -> CoordinatorResult<Self> {
        let states = specs
            .iter()
            .map(|spec| {
                let tag = Tag::try_new(&spec.tag)
                    .map_err(|err| CoordinatorError::InvalidChain(err.to_string()))?;
                Ok(StateSpec {
                    tag,
                    barrier: spec.barrier,
                })
            })
            .collect::<CoordinatorResult<Vec<_>>>()?;

        Self::new(states)
    }

    /// The reference chain: Spawned -> DataAvailable -> DataInitialized ->
    /// GameplayReady, with barriers on the last two states
    pub fn default_init_chain() -> Self {
        let tag = |name| Tag::try_new(name).expect("default chain tags are well-formed");

        Self {
            states: vec![
                StateSpec::new(tag(init_states::SPAWNED)),
                StateSpec::new(tag(init_states::DATA_AVAILABLE)),
                StateSpec::barrier(tag(init_states::DATA_INITIALIZED)),
                StateSpec::barrier(tag(init_states::GAMEPLAY_READY)),
            ],
        }
    }

    pub fn states(&self) -> &[StateSpec] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Chain index of `tag`, if it is one of the configured states
    pub fn index_of(&self, tag: &Tag) -> Option<usize> {
        self.states.iter().position(|spec| spec.tag == *tag)
    }

    pub fn state_at(&self, index: usize) -> &StateSpec {
        &self.states[index]
    }

    /// Index of the last state; no transitions lead out of it
    pub fn terminal_index(&self) -> usize {
        self.states.len() - 1
    }
}
