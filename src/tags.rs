//! Instance tag parsing and the forced server role tag.

use thiserror::Error;

/// Tag key identifying the server role.
pub const ROLE_TAG_KEY: &str = "Role";

/// Role value stamped on every bootstrapped server.
pub const SERVER_ROLE: &str = "chef_server";

/// Ordered tag collection with last-value-wins semantics per key.
///
/// Duplicate keys keep the position of their first occurrence while taking the
/// most recently supplied value, matching ordered-mapping behaviour.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagSet {
    entries: Vec<(String, String)>,
}

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses `Key=Value` entries in order.
    ///
    /// Each entry is split on the first `=`; the value may itself contain `=`
    /// characters.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Malformed`] when an entry has no `=` separator and
    /// [`TagError::EmptyKey`] when the key side is blank.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, TagError> {
        let mut tags = Self::new();
        for entry in raw {
            let entry_str = entry.as_ref();
            let (key, value) = entry_str
                .split_once('=')
                .ok_or_else(|| TagError::Malformed {
                    entry: entry_str.to_owned(),
                })?;
            if key.trim().is_empty() {
                return Err(TagError::EmptyKey {
                    entry: entry_str.to_owned(),
                });
            }
            tags.insert(key.trim(), value.trim());
        }
        Ok(tags)
    }

    /// Inserts a tag, replacing the value of an existing key in place.
    pub fn insert(&mut self, key: &str, value: &str) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing == key)
        {
            slot.1 = value.to_owned();
        } else {
            self.entries.push((key.to_owned(), value.to_owned()));
        }
    }

    /// Returns the value stored for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the number of tags held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no tags are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the tags back to `Key=Value` strings in insertion order.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }
}

/// Computes the tag list applied to a bootstrapped server.
///
/// User-supplied tags are parsed in order and the
/// [`ROLE_TAG_KEY`]`=`[`SERVER_ROLE`] tag is merged in afterwards, overriding
/// any user-supplied role.
///
/// # Errors
///
/// Returns [`TagError`] when a raw entry cannot be parsed.
pub fn bootstrap_tags<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>, TagError> {
    let mut tags = TagSet::parse(raw)?;
    tags.insert(ROLE_TAG_KEY, SERVER_ROLE);
    Ok(tags.render())
}

/// Errors raised while parsing raw tag entries.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TagError {
    /// Raised when an entry lacks a `=` separator.
    #[error("malformed tag '{entry}': expected Key=Value")]
    Malformed {
        /// Entry that failed to parse.
        entry: String,
    },
    /// Raised when an entry has an empty key.
    #[error("malformed tag '{entry}': key must not be empty")]
    EmptyKey {
        /// Entry that failed to parse.
        entry: String,
    },
}
