//! Opaque host-owned entity identity.
//!
//! The core never creates or destroys entities; the host assigns each one a
//! stable id and is responsible for tearing its registry entries down.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned identity of an entity aggregating one or more features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}
