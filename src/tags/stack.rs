//! Counted tag stacks.
//!
//! A [`TagStackContainer`] keeps an integer count per tag. Counts accumulate
//! on add, shrink on remove, and the entry disappears entirely when its
//! count reaches zero. Non-positive counts are ignored on both operations.

use std::collections::HashMap;
use std::fmt;

use super::Tag;

/// A single tag with its current stack count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStack {
    pub tag: Tag,
    pub count: i32,
}

impl fmt::Display for TagStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.tag, self.count)
    }
}

/// Container of tags with per-tag stack counts
#[derive(Debug, Clone, Default)]
pub struct TagStackContainer {
    counts: HashMap<Tag, i32>,
}

impl TagStackContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` stacks of `tag`. Counts below one are ignored.
    pub fn add_stack(&mut self, tag: Tag, count: i32) {
        if count <= 0 {
            return;
        }

        *self.counts.entry(tag).or_insert(0) += count;
    }

    /// Remove `count` stacks of `tag`, dropping the entry at zero.
    /// Counts below one are ignored.
    pub fn remove_stack(&mut self, tag: &Tag, count: i32) {
        if count <= 0 {
            return;
        }

        if let Some(current) = self.counts.get_mut(tag) {
            if *current <= count {
                self.counts.remove(tag);
            } else {
                *current -= count;
            }
        }
    }

    /// Current stack count for `tag`, zero if absent
    pub fn stack_count(&self, tag: &Tag) -> i32 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    /// Whether `tag` has at least one stack
    pub fn contains_tag(&self, tag: &Tag) -> bool {
        self.counts.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over current stacks in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = TagStack> + '_ {
        self.counts.iter().map(|(tag, count)| TagStack {
            tag: tag.clone(),
            count: *count,
        })
    }
}
