//! Integration tests for the tag-channel message bus: ancestor-chain
//! delivery, match modes, handle lifecycle, and re-entrancy behavior.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use relay_core::messaging::{ListenerHandle, MatchMode, MessageBus, VerbMessage};
use relay_core::tags::Tag;

fn tag(name: &str) -> Tag {
    Tag::try_new(name).unwrap()
}

#[derive(Debug, PartialEq)]
struct DamageEvent {
    amount: u32,
}

#[test]
fn partial_listener_receives_descendant_broadcasts() {
    let bus = MessageBus::new();
    let partial_hits = Arc::new(AtomicU64::new(0));
    let exact_hits = Arc::new(AtomicU64::new(0));

    let counter = partial_hits.clone();
    let _partial = bus.register_listener::<DamageEvent, _>(
        &tag("Game"),
        MatchMode::Partial,
        move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        },
    );

    let counter = exact_hits.clone();
    let _exact =
        bus.register_listener::<DamageEvent, _>(&tag("Game"), MatchMode::Exact, move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

    bus.broadcast_message(&tag("Game.Combat.Damage"), &DamageEvent { amount: 10 });

    assert_eq!(partial_hits.load(Ordering::Relaxed), 1);
    assert_eq!(exact_hits.load(Ordering::Relaxed), 0);
}

#[test]
fn exact_tier_receives_regardless_of_match_mode() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicU64::new(0));

    // Both modes on the broadcast channel itself receive the message
    for mode in [MatchMode::Exact, MatchMode::Partial] {
        let counter = hits.clone();
        let _handle =
            bus.register_listener::<DamageEvent, _>(&tag("Game.Combat"), mode, move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
    }

    bus.broadcast_message(&tag("Game.Combat"), &DamageEvent { amount: 1 });
    assert_eq!(hits.load(Ordering::Relaxed), 2);
}

#[test]
fn exact_and_ancestor_listeners_each_invoked_once() {
    let bus = MessageBus::new();
    let exact_hits = Arc::new(AtomicU64::new(0));
    let ancestor_hits = Arc::new(AtomicU64::new(0));

    let counter = exact_hits.clone();
    let _exact = bus.register_listener::<DamageEvent, _>(
        &tag("Game.Combat"),
        MatchMode::Exact,
        move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        },
    );

    let counter = ancestor_hits.clone();
    let _ancestor =
        bus.register_listener::<DamageEvent, _>(&tag("Game"), MatchMode::Partial, move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

    bus.broadcast_message(&tag("Game.Combat"), &DamageEvent { amount: 3 });

    assert_eq!(exact_hits.load(Ordering::Relaxed), 1);
    assert_eq!(ancestor_hits.load(Ordering::Relaxed), 1);
}

#[test]
fn broadcast_channel_is_passed_to_ancestor_listeners() {
    let bus = MessageBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    let _handle = bus.register_listener::<DamageEvent, _>(
        &tag("Game"),
        MatchMode::Partial,
        move |channel, _| {
            sink.lock().push(channel.name().to_string());
        },
    );

    bus.broadcast_message(&tag("Game.Combat.Damage"), &DamageEvent { amount: 2 });

    // Listeners observe the channel the broadcast was sent on, not the
    // channel they registered on
    assert_eq!(seen.lock().as_slice(), ["Game.Combat.Damage"]);
}

#[test]
fn unregister_is_idempotent() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicU64::new(0));

    let counter = hits.clone();
    let mut handle = bus.register_listener::<DamageEvent, _>(
        &tag("Game.Combat"),
        MatchMode::Exact,
        move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        },
    );

    handle.unregister();
    handle.unregister();
    assert!(!handle.is_valid());

    bus.broadcast_message(&tag("Game.Combat"), &DamageEvent { amount: 1 });
    assert_eq!(hits.load(Ordering::Relaxed), 0);

    // Handle from an already-pruned channel is also a silent no-op
    let mut other = bus.register_listener::<DamageEvent, _>(
        &tag("Game.Other"),
        MatchMode::Exact,
        |_, _| {},
    );
    bus.unregister_listener(&mut other);
    bus.unregister_listener(&mut other);
}

#[test]
fn handle_survives_bus_drop() {
    let bus = MessageBus::new();
    let mut handle = bus.register_listener::<DamageEvent, _>(
        &tag("Game.Combat"),
        MatchMode::Exact,
        |_, _| {},
    );

    drop(bus);
    handle.unregister();
    assert!(!handle.is_valid());
}

#[test]
fn type_mismatch_skips_only_offending_listener() {
    let bus = MessageBus::new();
    let channel = tag("Game.Combat");
    let damage_hits = Arc::new(AtomicU64::new(0));
    let string_hits = Arc::new(AtomicU64::new(0));

    let counter = damage_hits.clone();
    let _damage =
        bus.register_listener::<DamageEvent, _>(&channel, MatchMode::Exact, move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

    let counter = string_hits.clone();
    let _string = bus.register_listener::<String, _>(&channel, MatchMode::Exact, move |_, _| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    bus.broadcast_message(&channel, &DamageEvent { amount: 5 });

    assert_eq!(damage_hits.load(Ordering::Relaxed), 1);
    assert_eq!(string_hits.load(Ordering::Relaxed), 0);

    // The mismatched listener stays registered and still works for its type
    bus.broadcast_message(&channel, &"healed".to_string());
    assert_eq!(string_hits.load(Ordering::Relaxed), 1);
}

#[test]
fn stale_owner_listener_skipped_and_removed() {
    let bus = MessageBus::new();
    let channel = tag("Game.Combat");
    let hits = Arc::new(AtomicU64::new(0));

    struct Feature;

    let owner = Arc::new(Feature);
    let counter = hits.clone();
    let _handle = bus.register_listener_with_owner::<DamageEvent, Feature, _>(
        &channel,
        &owner,
        MatchMode::Exact,
        move |_, _, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        },
    );

    bus.broadcast_message(&channel, &DamageEvent { amount: 1 });
    assert_eq!(hits.load(Ordering::Relaxed), 1);

    drop(owner);

    // The stale entry is skipped and lazily removed during this broadcast
    bus.broadcast_message(&channel, &DamageEvent { amount: 2 });
    assert_eq!(hits.load(Ordering::Relaxed), 1);
    assert!(!bus.has_active_listeners(&channel));
}

#[test]
fn snapshot_isolation_under_reentrant_unregister() {
    let bus = MessageBus::new();
    let channel = tag("Game.Combat");
    let hits = Arc::new(AtomicU64::new(0));

    // Each listener unregisters the other when invoked. The tier snapshot
    // was taken before either ran, so both fire during the first broadcast
    // regardless of which runs first.
    let slot_a: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));
    let slot_b: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));

    let counter = hits.clone();
    let other = slot_b.clone();
    let handle_a =
        bus.register_listener::<DamageEvent, _>(&channel, MatchMode::Exact, move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            if let Some(handle) = other.lock().as_mut() {
                handle.unregister();
            }
        });

    let counter = hits.clone();
    let other = slot_a.clone();
    let handle_b =
        bus.register_listener::<DamageEvent, _>(&channel, MatchMode::Exact, move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            if let Some(handle) = other.lock().as_mut() {
                handle.unregister();
            }
        });

    *slot_a.lock() = Some(handle_a);
    *slot_b.lock() = Some(handle_b);

    bus.broadcast_message(&channel, &DamageEvent { amount: 1 });
    assert_eq!(hits.load(Ordering::Relaxed), 2);

    // Each listener unregistered the other, so future broadcasts deliver
    // to neither
    bus.broadcast_message(&channel, &DamageEvent { amount: 2 });
    assert_eq!(hits.load(Ordering::Relaxed), 2);
    assert!(!bus.has_active_listeners(&channel));
}

#[test]
fn listener_registered_mid_broadcast_not_delivered_to() {
    let bus = MessageBus::new();
    let channel = tag("Game.Combat");
    let late_hits = Arc::new(AtomicU64::new(0));

    let inner_bus = bus.clone();
    let inner_channel = channel.clone();
    let counter = late_hits.clone();
    let _outer = bus.register_listener::<DamageEvent, _>(&channel, MatchMode::Exact, move |_, _| {
        let counter = counter.clone();
        let _late = inner_bus.register_listener::<DamageEvent, _>(
            &inner_channel,
            MatchMode::Exact,
            move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            },
        );
    });

    bus.broadcast_message(&channel, &DamageEvent { amount: 1 });
    assert_eq!(late_hits.load(Ordering::Relaxed), 0);
}

#[test]
fn verb_message_broadcasts_over_the_bus() {
    let bus = MessageBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    let _handle = bus.register_listener::<VerbMessage, _>(
        &tag("Game.Verb"),
        MatchMode::Partial,
        move |_, message| {
            sink.lock().push(message.magnitude);
        },
    );

    let message = VerbMessage::new(tag("Verb.Heal")).with_magnitude(25.0);
    bus.broadcast_message(&tag("Game.Verb.Heal"), &message);

    assert_eq!(seen.lock().as_slice(), [25.0]);
}
