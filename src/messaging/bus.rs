//! # Tag Channel Message Bus
//!
//! Connectionless publish/subscribe keyed by hierarchical tag. Publishers
//! and listeners never reference each other directly; they only agree on a
//! channel tag and a payload type.
//!
//! Delivery walks the channel's ancestor chain outward: listeners on the
//! broadcast channel itself receive the message regardless of match mode
//! (the exact tier), then listeners registered with
//! [`MatchMode::Partial`] on each ancestor receive it in turn. Relative
//! order of listeners within a tier is unspecified and can change over time.
//!
//! All delivery is synchronous on the caller's thread. Each tier is
//! delivered from a snapshot of its listener list, so callbacks may freely
//! register and unregister listeners without corrupting the in-progress
//! broadcast.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

use super::listener::{ListenerCallback, ListenerEntry, ListenerHandle, MatchMode};
use crate::config::MessagingConfig;
use crate::logging::log_bus_operation;
use crate::tags::Tag;

/// List of all entries for a given channel
#[derive(Debug, Default)]
struct ChannelListenerList {
    listeners: Vec<ListenerEntry>,
    /// Monotonically increasing; ids are never reused within a channel
    next_handle_id: u64,
}

/// Shared bus internals; listener handles hold a weak reference to this
pub(crate) struct BusState {
    channels: RwLock<HashMap<Tag, ChannelListenerList>>,
    config: MessagingConfig,
    broadcasts_sent: AtomicU64,
    deliveries: AtomicU64,
    last_broadcast_at: Mutex<Option<DateTime<Utc>>>,
}

impl BusState {
    /// Remove a listener by channel and handle id, pruning empty channels.
    /// Silently accepts ids that were never registered or already removed.
    pub(crate) fn unregister(&self, channel: &Tag, handle_id: u64) {
        let mut channels = self.channels.write();

        if let Some(list) = channels.get_mut(channel) {
            list.listeners.retain(|entry| entry.handle_id != handle_id);

            if list.listeners.is_empty() {
                channels.remove(channel);
            }
        }
    }
}

/// Statistics about a message bus
#[derive(Debug, Clone)]
pub struct BusStats {
    pub active_channels: usize,
    pub total_listeners: usize,
    pub broadcasts_sent: u64,
    pub deliveries: u64,
    pub last_broadcast_at: Option<DateTime<Utc>>,
}

/// Tag-channel message router with ancestor-chain delivery
#[derive(Clone)]
pub struct MessageBus {
    state: Arc<BusState>,
}

impl MessageBus {
    /// Create a bus with default configuration
    pub fn new() -> Self {
        Self::with_config(MessagingConfig::default())
    }

    /// Create a bus with explicit configuration
    pub fn with_config(config: MessagingConfig) -> Self {
        Self {
            state: Arc::new(BusState {
                channels: RwLock::new(HashMap::new()),
                config,
                broadcasts_sent: AtomicU64::new(0),
                deliveries: AtomicU64::new(0),
                last_broadcast_at: Mutex::new(None),
            }),
        }
    }

    /// Register to receive messages of type `T` on the specified channel.
    ///
    /// The channel needs no prior registration; listening on a channel no
    /// one broadcasts to yet is fine. Never fails.
    pub fn register_listener<T, F>(
        &self,
        channel: &Tag,
        match_mode: MatchMode,
        callback: F,
    ) -> ListenerHandle
    where
        T: Any,
        F: Fn(&Tag, &T) + Send + Sync + 'static,
    {
        let thunk: ListenerCallback = Arc::new(move |actual_channel, payload| {
            if let Some(typed) = payload.downcast_ref::<T>() {
                callback(actual_channel, typed);
            }
        });

        self.register_listener_internal(
            channel,
            thunk,
            Some(TypeId::of::<T>()),
            Some(std::any::type_name::<T>()),
            None,
            match_mode,
        )
    }

    /// Register a listener whose callback is bound to a host-owned object.
    ///
    /// The callback captures only a weak reference to `owner`; once the
    /// owner is dropped the listener becomes stale: invoking it is a no-op
    /// and the bus removes it lazily during the next matching broadcast.
    pub fn register_listener_with_owner<T, O, F>(
        &self,
        channel: &Tag,
        owner: &Arc<O>,
        match_mode: MatchMode,
        callback: F,
    ) -> ListenerHandle
    where
        T: Any,
        O: Any + Send + Sync,
        F: Fn(&O, &Tag, &T) + Send + Sync + 'static,
    {
        let weak_owner = Arc::downgrade(owner);
        let thunk: ListenerCallback = Arc::new(move |actual_channel, payload| {
            let Some(strong_owner) = weak_owner.upgrade() else {
                return;
            };
            if let Some(typed) = payload.downcast_ref::<T>() {
                callback(&strong_owner, actual_channel, typed);
            }
        });

        let weak_liveness: Weak<O> = Arc::downgrade(owner);
        let liveness: Weak<dyn Any + Send + Sync> = weak_liveness;

        self.register_listener_internal(
            channel,
            thunk,
            Some(TypeId::of::<T>()),
            Some(std::any::type_name::<T>()),
            Some(liveness),
            match_mode,
        )
    }

    /// Register a type-ambiguous listener that accepts any payload.
    ///
    /// Intended for internal plumbing such as bridging or diagnostics; most
    /// listeners should use the typed [`MessageBus::register_listener`].
    pub fn register_listener_raw<F>(
        &self,
        channel: &Tag,
        match_mode: MatchMode,
        callback: F,
    ) -> ListenerHandle
    where
        F: Fn(&Tag, &dyn Any) + Send + Sync + 'static,
    {
        self.register_listener_internal(channel, Arc::new(callback), None, None, None, match_mode)
    }

    fn register_listener_internal(
        &self,
        channel: &Tag,
        callback: ListenerCallback,
        expected_type: Option<TypeId>,
        expected_type_name: Option<&'static str>,
        liveness: Option<Weak<dyn Any + Send + Sync>>,
        match_mode: MatchMode,
    ) -> ListenerHandle {
        let handle_id = {
            let mut channels = self.state.channels.write();
            let list = channels.entry(channel.clone()).or_default();

            list.next_handle_id += 1;
            let handle_id = list.next_handle_id;

            list.listeners.push(ListenerEntry {
                callback,
                expected_type,
                expected_type_name,
                liveness,
                match_mode,
                handle_id,
            });

            handle_id
        };

        log_bus_operation(
            "register_listener",
            Some(channel.name()),
            Some(handle_id),
            "registered",
            expected_type_name,
        );

        ListenerHandle {
            bus: Arc::downgrade(&self.state),
            channel: channel.clone(),
            handle_id,
        }
    }

    /// Remove a message listener previously registered by `register_listener`.
    ///
    /// Equivalent to [`ListenerHandle::unregister`]; idempotent.
    pub fn unregister_listener(&self, handle: &mut ListenerHandle) {
        let channel = handle.channel.clone();
        let handle_id = handle.handle_id;

        handle.unregister();

        log_bus_operation(
            "unregister_listener",
            Some(channel.name()),
            Some(handle_id),
            "unregistered",
            None,
        );
    }

    /// Broadcast a message on the specified channel.
    ///
    /// Delivers synchronously to the exact tier, then to `Partial` listeners
    /// on each ancestor channel, nearest first. Type mismatches are logged
    /// and skipped; they never abort the broadcast.
    pub fn broadcast_message<T: Any>(&self, channel: &Tag, message: &T) {
        self.broadcast_internal(
            channel,
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            message,
        );
    }

    fn broadcast_internal(
        &self,
        channel: &Tag,
        payload_type: TypeId,
        payload_type_name: &str,
        payload: &dyn Any,
    ) {
        self.state.broadcasts_sent.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0u64;
        let mut on_initial_tag = true;

        for tier in channel.self_and_ancestors() {
            // Snapshot in case listeners are added or removed while
            // callbacks run; structural changes never affect this tier.
            let snapshot: Vec<ListenerEntry> = {
                let channels = self.state.channels.read();
                channels
                    .get(&tier)
                    .map(|list| list.listeners.clone())
                    .unwrap_or_default()
            };

            let mut stale_handles: Vec<u64> = Vec::new();

            for entry in &snapshot {
                if !on_initial_tag && entry.match_mode != MatchMode::Partial {
                    continue;
                }

                if entry.is_stale() {
                    warn!(
                        channel = %channel,
                        tier = %tier,
                        handle_id = entry.handle_id,
                        "Listener owner has gone invalid on channel, removing listener from list"
                    );
                    stale_handles.push(entry.handle_id);
                    continue;
                }

                match entry.expected_type {
                    Some(expected) if expected != payload_type => {
                        error!(
                            channel = %channel,
                            tier = %tier,
                            broadcast_type = payload_type_name,
                            listener_type = entry.expected_type_name.unwrap_or("<unknown>"),
                            "Payload type mismatch on channel, skipping listener"
                        );
                    }
                    _ => {
                        (entry.callback)(channel, payload);
                        delivered += 1;
                    }
                }
            }

            // Lazy cleanup of listeners whose owner went away
            for handle_id in stale_handles {
                self.state.unregister(&tier, handle_id);
            }

            on_initial_tag = false;
        }

        self.state.deliveries.fetch_add(delivered, Ordering::Relaxed);
        *self.state.last_broadcast_at.lock() = Some(Utc::now());

        if delivered == 0 && self.state.config.log_unhandled_broadcasts {
            debug!(
                channel = %channel,
                payload_type = payload_type_name,
                "Broadcast matched no listeners"
            );
        }
    }

    /// Whether any listener is currently registered exactly on `channel`
    pub fn has_active_listeners(&self, channel: &Tag) -> bool {
        let channels = self.state.channels.read();
        channels
            .get(channel)
            .is_some_and(|list| !list.listeners.is_empty())
    }

    /// Get bus statistics
    pub fn stats(&self) -> BusStats {
        let channels = self.state.channels.read();

        BusStats {
            active_channels: channels.len(),
            total_listeners: channels.values().map(|list| list.listeners.len()).sum(),
            broadcasts_sent: self.state.broadcasts_sent.load(Ordering::Relaxed),
            deliveries: self.state.deliveries.load(Ordering::Relaxed),
            last_broadcast_at: *self.state.last_broadcast_at.lock(),
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("MessageBus")
            .field("active_channels", &stats.active_channels)
            .field("total_listeners", &stats.total_listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn tag(name: &str) -> Tag {
        Tag::try_new(name).unwrap()
    }

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn test_register_and_broadcast() {
        let bus = MessageBus::new();
        let received = Arc::new(AtomicU64::new(0));

        let counter = received.clone();
        let _handle = bus.register_listener::<Ping, _>(
            &tag("Bus.Test.Basic"),
            MatchMode::Exact,
            move |_, message| {
                counter.fetch_add(u64::from(message.0), Ordering::Relaxed);
            },
        );

        bus.broadcast_message(&tag("Bus.Test.Basic"), &Ping(7));
        assert_eq!(received.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_handle_ids_monotonic_per_channel() {
        let bus = MessageBus::new();
        let channel = tag("Bus.Test.HandleIds");

        let mut first = bus.register_listener::<Ping, _>(&channel, MatchMode::Exact, |_, _| {});
        let second = bus.register_listener::<Ping, _>(&channel, MatchMode::Exact, |_, _| {});
        assert!(second.handle_id > first.handle_id);

        // Ids are not reused after removal
        first.unregister();
        let third = bus.register_listener::<Ping, _>(&channel, MatchMode::Exact, |_, _| {});
        assert!(third.handle_id > second.handle_id);
    }

    #[test]
    fn test_empty_channel_pruned() {
        let bus = MessageBus::new();
        let channel = tag("Bus.Test.Prune");

        let mut handle = bus.register_listener::<Ping, _>(&channel, MatchMode::Exact, |_, _| {});
        assert!(bus.has_active_listeners(&channel));

        handle.unregister();
        assert!(!bus.has_active_listeners(&channel));
        assert_eq!(bus.stats().active_channels, 0);
    }

    #[test]
    fn test_raw_listener_accepts_any_payload() {
        let bus = MessageBus::new();
        let channel = tag("Bus.Test.Raw");
        let received = Arc::new(AtomicU64::new(0));

        let counter = received.clone();
        let _handle = bus.register_listener_raw(&channel, MatchMode::Exact, move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.broadcast_message(&channel, &Ping(1));
        bus.broadcast_message(&channel, &"something else entirely");
        assert_eq!(received.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_stats_track_broadcasts() {
        let bus = MessageBus::new();
        let channel = tag("Bus.Test.Stats");

        let _handle = bus.register_listener::<Ping, _>(&channel, MatchMode::Exact, |_, _| {});
        bus.broadcast_message(&channel, &Ping(1));
        bus.broadcast_message(&channel, &Ping(2));

        let stats = bus.stats();
        assert_eq!(stats.broadcasts_sent, 2);
        assert_eq!(stats.deliveries, 2);
        assert!(stats.last_broadcast_at.is_some());
    }
}
