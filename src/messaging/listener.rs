//! Listener entries, match modes, and unregistration handles.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tags::Tag;

/// Whether a listener receives only exact-channel broadcasts or also
/// broadcasts sent to descendant channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Receive only broadcasts sent exactly on the registered channel
    Exact,
    /// Also receive broadcasts sent on any descendant of the registered channel
    Partial,
}

/// Type-erased callback invoked with the broadcast channel and payload
pub(crate) type ListenerCallback = Arc<dyn Fn(&Tag, &dyn Any) + Send + Sync>;

/// Entry information for a single registered listener
#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) callback: ListenerCallback,
    /// Expected payload type; `None` accepts any payload (internal use)
    pub(crate) expected_type: Option<TypeId>,
    pub(crate) expected_type_name: Option<&'static str>,
    /// Liveness guard for the owning host object, if one was captured
    pub(crate) liveness: Option<Weak<dyn Any + Send + Sync>>,
    pub(crate) match_mode: MatchMode,
    pub(crate) handle_id: u64,
}

impl ListenerEntry {
    /// Whether the owning host object has been dropped
    pub(crate) fn is_stale(&self) -> bool {
        self.liveness
            .as_ref()
            .is_some_and(|weak| weak.strong_count() == 0)
    }
}

impl fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("callback", &"<callback>")
            .field("expected_type_name", &self.expected_type_name)
            .field("has_liveness_guard", &self.liveness.is_some())
            .field("match_mode", &self.match_mode)
            .field("handle_id", &self.handle_id)
            .finish()
    }
}

/// An opaque handle that can be used to remove a previously registered
/// message listener.
///
/// The handle is the sole unregistration capability; dropping it without
/// calling [`ListenerHandle::unregister`] leaves the listener registered.
/// Unregistration is idempotent and survives the bus being dropped first.
pub struct ListenerHandle {
    pub(crate) bus: Weak<super::bus::BusState>,
    pub(crate) channel: Tag,
    pub(crate) handle_id: u64,
}

impl ListenerHandle {
    /// Whether this handle still refers to a registration it has not released
    pub fn is_valid(&self) -> bool {
        self.handle_id != 0
    }

    /// The channel this handle was registered on
    pub fn channel(&self) -> &Tag {
        &self.channel
    }

    /// Remove the listener this handle refers to.
    ///
    /// Idempotent: unregistering twice, or after the channel was pruned, is
    /// a no-op. Cancellation is for future broadcasts only; a broadcast that
    /// already snapshotted this tier still delivers.
    pub fn unregister(&mut self) {
        if !self.is_valid() {
            warn!(channel = %self.channel, "Trying to unregister an invalid handle");
            return;
        }

        if let Some(bus) = self.bus.upgrade() {
            bus.unregister(&self.channel, self.handle_id);
        }

        self.bus = Weak::new();
        self.handle_id = 0;
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("channel", &self.channel)
            .field("handle_id", &self.handle_id)
            .finish()
    }
}
