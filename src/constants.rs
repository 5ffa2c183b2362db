//! # Well-Known Tag Names
//!
//! Canonical tag names shared between hosts and the core. These are plain
//! string constants; intern them with [`crate::tags::Tag::try_new`] at the
//! point of use.

/// States of the default readiness chain, in chain order
pub mod init_states {
    pub const SPAWNED: &str = "InitState.Spawned";
    pub const DATA_AVAILABLE: &str = "InitState.DataAvailable";
    pub const DATA_INITIALIZED: &str = "InitState.DataInitialized";
    pub const GAMEPLAY_READY: &str = "InitState.GameplayReady";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::Tag;

    #[test]
    fn test_init_state_names_are_valid_tags() {
        for name in [
            init_states::SPAWNED,
            init_states::DATA_AVAILABLE,
            init_states::DATA_INITIALIZED,
            init_states::GAMEPLAY_READY,
        ] {
            assert!(Tag::try_new(name).is_ok(), "{name} should be a valid tag");
        }
    }
}
