//! # Message Bus
//!
//! Hierarchical tag-channel publish/subscribe with ancestor-chain delivery,
//! per-listener match modes, and opaque unregistration handles.

pub mod bus;
pub mod listener;
pub mod verb_message;

// Re-export main types for convenient access
pub use bus::{BusStats, MessageBus};
pub use listener::{ListenerHandle, MatchMode};
pub use verb_message::VerbMessage;
