//! Interned hierarchical tags.
//!
//! A [`Tag`] is an immutable dot-segmented path such as
//! `"InitState.DataAvailable"`. The ancestor chain of a tag is derived by
//! progressively dropping trailing segments (`A.B.C` -> `A.B` -> `A`).
//! Tags are interned for the lifetime of the process: constructing the same
//! name twice yields the same shared allocation, so clones are cheap and
//! hashing is by segment-sequence equality.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when constructing a tag from a raw string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("invalid tag '{name}': {reason}")]
    Invalid { name: String, reason: &'static str },
}

#[derive(Debug)]
struct TagInner {
    name: String,
    parent: Option<Tag>,
}

/// An immutable, interned, dot-segmented hierarchical identifier
#[derive(Clone)]
pub struct Tag(Arc<TagInner>);

fn interner() -> &'static DashMap<String, Tag> {
    static INTERNER: OnceLock<DashMap<String, Tag>> = OnceLock::new();
    INTERNER.get_or_init(DashMap::new)
}

fn validate(name: &str) -> Result<(), TagError> {
    if name.is_empty() {
        return Err(TagError::Invalid {
            name: name.to_string(),
            reason: "tag name is empty",
        });
    }

    for segment in name.split('.') {
        if segment.is_empty() {
            return Err(TagError::Invalid {
                name: name.to_string(),
                reason: "tag contains an empty segment",
            });
        }
        if segment.chars().any(char::is_whitespace) {
            return Err(TagError::Invalid {
                name: name.to_string(),
                reason: "tag segments must not contain whitespace",
            });
        }
    }

    Ok(())
}

impl Tag {
    /// Intern a tag from its dotted name, validating it first.
    ///
    /// Interning a tag also interns every ancestor, so the parent chain is
    /// available without further allocation.
    pub fn try_new(name: &str) -> Result<Self, TagError> {
        if let Some(existing) = interner().get(name) {
            return Ok(existing.clone());
        }

        validate(name)?;

        let mut parent: Option<Tag> = None;
        let mut prefix = String::with_capacity(name.len());

        for segment in name.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);

            let tag = interner()
                .entry(prefix.clone())
                .or_insert_with(|| {
                    Tag(Arc::new(TagInner {
                        name: prefix.clone(),
                        parent: parent.clone(),
                    }))
                })
                .clone();

            parent = Some(tag);
        }

        match parent {
            Some(tag) => Ok(tag),
            None => Err(TagError::Invalid {
                name: name.to_string(),
                reason: "tag name is empty",
            }),
        }
    }

    /// Full dotted name of this tag
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Direct parent, derived by dropping the trailing segment
    pub fn parent(&self) -> Option<Tag> {
        self.0.parent.clone()
    }

    /// Segments of the dotted path, root-most first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.name.split('.')
    }

    /// Strict ancestors, nearest first (`A.B.C` yields `A.B`, then `A`)
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            current: self.parent(),
        }
    }

    /// This tag followed by its ancestors, nearest first
    pub fn self_and_ancestors(&self) -> Ancestors {
        Ancestors {
            current: Some(self.clone()),
        }
    }

    /// Whether this tag is a strict ancestor of `other`
    pub fn is_ancestor_of(&self, other: &Tag) -> bool {
        other.ancestors().any(|ancestor| ancestor == *self)
    }
}

/// Iterator over a tag's ancestor chain, nearest first
pub struct Ancestors {
    current: Option<Tag>,
}

impl Iterator for Ancestors {
    type Item = Tag;

    fn next(&mut self) -> Option<Tag> {
        let next = self.current.take()?;
        self.current = next.parent();
        Some(next)
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        // Interning makes pointer equality the common fast path
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.0.name)
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.name)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Tag::try_new(&name).map_err(serde::de::Error::custom)
    }
}
