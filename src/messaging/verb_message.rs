//! Generic verb message payload.
//!
//! Represents a message of the form "Instigator Verb Target (in Context,
//! with Magnitude)". Useful as a ready-made payload type for gameplay-style
//! domain events so hosts do not need a bespoke struct per event.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::tags::Tag;

fn default_magnitude() -> f64 {
    1.0
}

/// A generic instigator/verb/target message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbMessage {
    pub verb: Tag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instigator: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instigator_tags: Vec<Tag>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_tags: Vec<Tag>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_tags: Vec<Tag>,

    #[serde(default = "default_magnitude")]
    pub magnitude: f64,
}

impl VerbMessage {
    /// Create a message for `verb` with no participants and magnitude 1.0
    pub fn new(verb: Tag) -> Self {
        Self {
            verb,
            instigator: None,
            target: None,
            instigator_tags: Vec::new(),
            target_tags: Vec::new(),
            context_tags: Vec::new(),
            magnitude: 1.0,
        }
    }

    pub fn with_instigator(mut self, instigator: EntityId) -> Self {
        self.instigator = Some(instigator);
        self
    }

    pub fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = magnitude;
        self
    }
}

impl fmt::Display for VerbMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instigator = self
            .instigator
            .map_or_else(|| "<none>".to_string(), |id| id.to_string());
        let target = self
            .target
            .map_or_else(|| "<none>".to_string(), |id| id.to_string());

        write!(
            f,
            "{} {} {} (x{})",
            instigator, self.verb, target, self.magnitude
        )
    }
}
