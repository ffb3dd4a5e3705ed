//! Story flags.
//!
//! Flags are named booleans owned by the host. The engine reads them to gate
//! choices and sets them when a choice with a `setFlag` is taken, but never
//! persists them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Boolean story-flag storage supplied by the host.
pub trait FlagStore {
    /// Read a flag. Absent flags are `false`.
    fn get_flag(&self, name: &str) -> bool;

    /// Write a flag.
    fn set_flag(&mut self, name: &str, value: bool);
}

impl<T: FlagStore + ?Sized> FlagStore for &mut T {
    fn get_flag(&self, name: &str) -> bool {
        (**self).get_flag(name)
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        (**self).set_flag(name, value);
    }
}

/// In-memory flag store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryFlags {
    flags: BTreeMap<String, bool>,
}

impl MemoryFlags {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given flags set to `true`.
    pub fn with_flags<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: names.into_iter().map(|n| (n.into(), true)).collect(),
        }
    }

    /// All stored flags in name order, including those set to `false`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of stored flags.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether no flags are stored.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl FlagStore for MemoryFlags {
    fn get_flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        self.flags.insert(name.to_string(), value);
    }
}
