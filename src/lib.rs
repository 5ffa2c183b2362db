#![allow(clippy::doc_markdown)] // Allow technical terms like TypeId, YAML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Relay Core Rust
//!
//! Event and readiness core for loosely-coupled features: a hierarchical
//! tag-channel message bus plus a feature readiness coordinator, consumed
//! in-process by a host that owns the entities.
//!
//! ## Overview
//!
//! Two independent but structurally similar components:
//!
//! - **Message bus** — connectionless publish/subscribe keyed by a
//!   dot-segmented [`tags::Tag`]. Publishers broadcast typed payloads on a
//!   channel; the bus delivers to listeners on that channel and, for
//!   [`messaging::MatchMode::Partial`] listeners, on its ancestor channels.
//!   Producers and consumers never reference each other directly.
//! - **Readiness coordinator** — drives each feature attached to an entity
//!   through an ordered state chain, gating each transition on the
//!   feature's own guard and on barrier synchronization with sibling
//!   features of the same entity.
//!
//! A [`session::RelaySession`] bundles one bus and one coordinator built
//! from a validated configuration. All operations are synchronous on the
//! caller's thread; internal locks only serialize registry access, and no
//! lock is ever held while host callbacks run.
//!
//! ## Module Organization
//!
//! - [`tags`] - Interned hierarchical tag model and counted tag stacks
//! - [`messaging`] - Tag-channel message bus and listener handles
//! - [`readiness`] - State chains, coordinator, and feature hooks
//! - [`session`] - Per-session bus + coordinator bundle
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust
//! use relay_core::messaging::MatchMode;
//! use relay_core::session::RelaySession;
//! use relay_core::tags::Tag;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = RelaySession::default();
//!
//! let channel = Tag::try_new("Game.Combat.Damage")?;
//! let _handle = session.bus().register_listener::<u32, _>(
//!     &channel,
//!     MatchMode::Exact,
//!     |_, amount| println!("took {amount} damage"),
//! );
//!
//! session.bus().broadcast_message(&channel, &12u32);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod readiness;
pub mod session;
pub mod tags;

pub use config::{ConfigManager, MessagingConfig, ReadinessConfig, RelayConfig, StateSpecConfig};
pub use entity::EntityId;
pub use error::{RelayError, Result};
pub use messaging::{BusStats, ListenerHandle, MatchMode, MessageBus, VerbMessage};
pub use readiness::{
    ChangeFilter, ChangeSubscription, FeatureHandlers, FeatureHooks, ReadinessCoordinator,
    StateChain, StateChangeNotice, StateSpec, TransitionContext,
};
pub use session::RelaySession;
pub use tags::{Tag, TagError, TagStack, TagStackContainer};
