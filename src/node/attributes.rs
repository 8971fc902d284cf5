//! Element Attributes
//!
//! Attribute names come out of the tokenizer in Clark notation. They are
//! stored fully qualified (`{}name` for attributes without a namespace) and
//! also made reachable by their bare local name:
//! - the attribute without namespace always owns its bare name
//! - a single namespaced variant resolves deterministically
//! - several namespaced variants resolve to one of them, with a warning

use crate::error::{Result, UsageError};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// How a lookup key maps to a stored attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    /// Qualified key, or bare key of the attribute without namespace
    Exact,
    /// Bare key shared by this many namespaced attributes
    Alternatives(usize),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    resolution: Resolution,
    index: usize,
}

/// Read-only attribute map of an element.
#[derive(Debug, Clone, Default)]
pub struct XmlElementAttributes {
    /// Qualified keys with their values, document order
    entries: Vec<(String, String)>,
    lookup: HashMap<String, Slot>,
    /// Raw attribute count, duplicates included
    len: usize,
}

/// Split a `{namespace}name` key. Returns `None` for malformed keys.
fn split_key(key: &str) -> Option<(&str, &str)> {
    let (namespace, name) = match key.strip_prefix('{') {
        Some(rest) => rest.split_once('}')?,
        None => ("", key),
    };
    if name.contains(['{', '}']) {
        return None;
    }
    Some((namespace, name))
}

impl XmlElementAttributes {
    /// Build the map from `(key, value)` pairs, keys in Clark notation.
    ///
    /// Fails with [`UsageError::InvalidKey`] on keys such as `{aaa` or
    /// `{aaa}{bbb`.
    pub fn new<I, K, V>(attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map = XmlElementAttributes::default();
        for (key, value) in attributes {
            let key = key.as_ref();
            let (namespace, name) =
                split_key(key).ok_or_else(|| UsageError::InvalidKey(key.to_string()))?;
            map.insert(namespace, name, value.into());
        }
        Ok(map)
    }

    fn insert(&mut self, namespace: &str, name: &str, value: String) {
        self.len += 1;
        let qualified = format!("{{{namespace}}}{name}");
        let index = match self.lookup.get(&qualified).copied() {
            Some(slot) => {
                self.entries[slot.index].1 = value;
                slot.index
            }
            None => {
                self.entries.push((qualified.clone(), value));
                self.entries.len() - 1
            }
        };
        self.lookup.insert(
            qualified,
            Slot {
                resolution: Resolution::Exact,
                index,
            },
        );

        if namespace.is_empty() {
            self.lookup.insert(
                name.to_string(),
                Slot {
                    resolution: Resolution::Exact,
                    index,
                },
            );
            return;
        }
        match self.lookup.get_mut(name) {
            Some(Slot {
                resolution: Resolution::Exact,
                ..
            }) => {}
            Some(Slot {
                resolution: Resolution::Alternatives(count),
                ..
            }) => *count += 1,
            None => {
                self.lookup.insert(
                    name.to_string(),
                    Slot {
                        resolution: Resolution::Alternatives(1),
                        index,
                    },
                );
            }
        }
    }

    /// Value of an attribute.
    ///
    /// `key` is either qualified (`{namespace}name`, `{}name` for no
    /// namespace) or a bare local name. A bare name shared by several
    /// namespaced attributes and no attribute without namespace returns one
    /// of them, which one is unspecified; a warning is logged.
    pub fn get(&self, key: &str) -> Option<&str> {
        let slot = self.lookup.get(key)?;
        if let Resolution::Alternatives(count) = slot.resolution {
            if count > 1 {
                warn!(
                    "Several alternatives for attribute name '{key}'. \
                     Specify namespace by using '{{namespace}}{key}' as the key."
                );
            }
        }
        Some(self.entries[slot.index].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup.contains_key(key)
    }

    /// Number of raw attributes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Attributes as the user sees them: `name` when there is no namespace,
    /// `{namespace}name` otherwise.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| {
            let key = key.strip_prefix("{}").unwrap_or(key);
            (key, value.as_str())
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(key, _)| key)
    }

    fn get_exact(&self, qualified: &str) -> Option<&str> {
        let slot = self.lookup.get(qualified)?;
        Some(self.entries[slot.index].1.as_str())
    }
}

impl PartialEq for XmlElementAttributes {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(key, value)| other.get_exact(key) == Some(value.as_str()))
    }
}

impl Eq for XmlElementAttributes {}

impl fmt::Display for XmlElementAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
