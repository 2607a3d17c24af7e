// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes for sessions, tasks, cycles, and events.
//!
//! Every id is a short type prefix followed by a nanoid, held inline so
//! the newtypes stay `Copy` and can key maps that are also queried by
//! `&str`.

/// Inline capacity per id. Generated ids use well under this; foreign
/// strings are clamped on a character boundary.
pub const ID_CAPACITY: usize = 24;

/// Random characters in a generated id.
pub const ID_RANDOM_LEN: usize = 16;

/// Copyable inline string backing the id newtypes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawId {
    len: u8,
    bytes: [u8; ID_CAPACITY],
}

impl RawId {
    pub const fn empty() -> Self {
        Self { len: 0, bytes: [0; ID_CAPACITY] }
    }

    /// Store a string inline, clamping anything over the capacity at the
    /// nearest character boundary.
    pub fn new(s: &str) -> Self {
        let mut len = s.len().min(ID_CAPACITY);
        while !s.is_char_boundary(len) {
            len -= 1;
        }
        if len < s.len() {
            tracing::warn!(id = s, clamped_len = len, "id exceeds capacity; clamped");
        }
        let mut bytes = [0u8; ID_CAPACITY];
        bytes[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { len: len as u8, bytes }
    }

    pub fn as_str(&self) -> &str {
        // Clamping happens on a character boundary, so the active bytes
        // are always valid UTF-8.
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// Hash the active bytes the way `str` does, so `Borrow<str>` map lookups
// find entries keyed by an id type.
impl std::hash::Hash for RawId {
    fn hash<H: std::hash::Hasher>(&self, hasher: &mut H) {
        self.as_str().hash(hasher);
    }
}

impl std::borrow::Borrow<str> for RawId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for RawId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for RawId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RawId::new(&s))
    }
}

/// Declare an id newtype over [`RawId`] with a fixed type prefix.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the type.
///     pub struct SessionId("ses-");
/// }
/// ```
///
/// `new()` mints `{prefix}{nanoid}` (e.g. `ses-V1StGXR8Z5jdHi6B`);
/// `from_string()` wraps ids received from events or tool calls. The
/// string-interop impls (`Display`, `Borrow<str>`, `PartialEq<&str>`)
/// are what the stores and tests rely on.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name($crate::id::RawId);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Mint a fresh random id.
            pub fn new() -> Self {
                Self($crate::id::RawId::new(&format!(
                    "{}{}",
                    Self::PREFIX,
                    nanoid::nanoid!(($crate::id::ID_RANDOM_LEN)),
                )))
            }

            /// Wrap an existing id string.
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self($crate::id::RawId::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0.as_str() == *other
            }
        }
    };
}

define_id! {
    /// Unique identifier for a chatting or workflow session.
    pub struct SessionId("ses-");
}

define_id! {
    /// Unique identifier for a background or monitoring task.
    ///
    /// Task IDs key both the in-memory pools and the persisted
    /// `background_workflows` records, so they survive restarts.
    pub struct TaskId("task-");
}

define_id! {
    /// Unique identifier for one input→processing→output cycle.
    pub struct CycleId("cyc-");
}

define_id! {
    /// Unique identifier assigned to every published event.
    pub struct EventId("evt-");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
