//! Path-addressed collection of validation failures.
//!
//! Entries keep insertion order. Exports: grouped by path, flat (dot-notation
//! keys), nested ([`ErrorTree`], one map level per path segment).

use crate::path::Path;
use crate::value::{Key, Map, Value};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::ops::Index;

/// Key under which a branch node's own messages are rendered when the same
/// path also has nested children. Prefixed with `_` while it names a child.
pub const BASE_KEY: &str = "base";

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub path: Path,
    pub message: String,
}

impl ErrorEntry {
    /// Attribute-name-prefixed message, e.g. `Address postal code is invalid`.
    pub fn full_message(&self) -> String {
        if self.path.is_empty() || self.path.segments() == [BASE_KEY] {
            return self.message.clone();
        }
        format!("{} {}", humanize(&self.path), self.message)
    }

    fn message_in(&self, full: bool) -> String {
        if full {
            self.full_message()
        } else {
            self.message.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    entries: Vec<ErrorEntry>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<Path>, message: impl Into<String>) {
        self.entries.push(ErrorEntry {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }

    /// Messages recorded at exactly `path`.
    pub fn messages_for(&self, path: impl Into<Path>) -> Vec<&str> {
        let path = path.into();
        self.entries
            .iter()
            .filter(|e| e.path == path)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Copy every entry of `nested` under `prefix`.
    pub fn import(&mut self, prefix: &Path, nested: &Errors) {
        for entry in &nested.entries {
            self.entries.push(ErrorEntry {
                path: prefix.join(&entry.path),
                message: entry.message.clone(),
            });
        }
    }

    pub fn grouped_by_path(&self) -> IndexMap<Path, Vec<String>> {
        self.grouped(false)
    }

    fn grouped(&self, full: bool) -> IndexMap<Path, Vec<String>> {
        let mut groups: IndexMap<Path, Vec<String>> = IndexMap::new();
        for entry in &self.entries {
            groups
                .entry(entry.path.clone())
                .or_default()
                .push(entry.message_in(full));
        }
        groups
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.entries.iter().map(ErrorEntry::full_message).collect()
    }

    /// Flat map keyed by dot-notation path.
    pub fn to_flat(&self, full: bool) -> IndexMap<String, Vec<String>> {
        self.messages_with(full, |dot| dot.to_string())
    }

    /// Flat map with each dot-notation key passed through `key_fn`.
    pub fn messages_with<F>(&self, full: bool, key_fn: F) -> IndexMap<String, Vec<String>>
    where
        F: Fn(&str) -> String,
    {
        self.grouped(full)
            .into_iter()
            .map(|(path, messages)| (key_fn(&path.to_dot()), messages))
            .collect()
    }

    /// Nested tree, one level per path segment.
    pub fn to_nested(&self, full: bool) -> ErrorTree {
        let mut tree = ErrorTree::default();
        for (path, messages) in self.grouped(full) {
            tree.insert(path.segments(), messages);
        }
        tree
    }

    /// Flat or nested rendering as a plain value.
    pub fn as_presentation(&self, structured: bool, full: bool) -> Value {
        if structured {
            return self.to_nested(full).to_value();
        }
        let map: Map = self
            .to_flat(full)
            .into_iter()
            .map(|(k, messages)| (Key::String(k), messages_value(messages)))
            .collect();
        Value::Map(map)
    }

    pub fn snapshot(&self) -> ErrorSnapshot {
        ErrorSnapshot {
            by_path: self.to_flat(false),
        }
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a ErrorEntry;
    type IntoIter = std::slice::Iter<'a, ErrorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Errors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_flat(false).serialize(serializer)
    }
}

/// Frozen view of a collection. Absent paths read as no messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSnapshot {
    by_path: IndexMap<String, Vec<String>>,
}

impl ErrorSnapshot {
    pub fn get(&self, dot: &str) -> &[String] {
        self.by_path.get(dot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.by_path.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

impl Index<&str> for ErrorSnapshot {
    type Output = [String];

    fn index(&self, dot: &str) -> &[String] {
        self.get(dot)
    }
}

/// Nested rendering of an error collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: IndexMap<String, ErrorTree>,
}

impl ErrorTree {
    /// Insert `messages` at the node reached by `segments`, creating
    /// intermediate nodes and merging into existing ones.
    pub fn insert(&mut self, segments: &[String], messages: Vec<String>) {
        let mut node = self;
        for seg in segments {
            node = node.children.entry(seg.clone()).or_default();
        }
        node.messages.extend(messages);
    }

    pub fn get(&self, segment: &str) -> Option<&ErrorTree> {
        self.children.get(segment)
    }

    /// Node at a dot-notation path.
    pub fn at(&self, dot: &str) -> Option<&ErrorTree> {
        Path::from_dot(dot)
            .segments()
            .iter()
            .try_fold(self, |node, seg| node.children.get(seg))
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ErrorTree)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.is_empty()
    }

    /// Depth-first `(path, messages)` pairs for every node holding messages.
    pub fn flatten(&self) -> Vec<(Path, Vec<String>)> {
        let mut out = Vec::new();
        self.flatten_into(&Path::new(), &mut out);
        out
    }

    fn flatten_into(&self, at: &Path, out: &mut Vec<(Path, Vec<String>)>) {
        if !self.messages.is_empty() {
            out.push((at.clone(), self.messages.clone()));
        }
        for (seg, child) in &self.children {
            child.flatten_into(&at.child(seg), out);
        }
    }

    /// Key for this node's own messages in the map rendering: [`BASE_KEY`],
    /// or `_base`, `__base`, ... when a child segment already uses it.
    pub fn base_key(&self) -> String {
        let mut key = BASE_KEY.to_string();
        while self.children.contains_key(&key) {
            key.insert(0, '_');
        }
        key
    }

    /// Leaves become message lists, branches (and an empty root) become maps.
    /// A branch that also carries its own messages renders them under
    /// [`base_key`](Self::base_key).
    pub fn to_value(&self) -> Value {
        if self.children.is_empty() && !self.messages.is_empty() {
            return messages_value(self.messages.clone());
        }
        let mut map = Map::new();
        if !self.messages.is_empty() {
            map.insert(Key::String(self.base_key()), messages_value(self.messages.clone()));
        }
        for (seg, child) in &self.children {
            map.insert(Key::String(seg.clone()), child.to_value());
        }
        Value::Map(map)
    }
}

impl Serialize for ErrorTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.children.is_empty() && !self.messages.is_empty() {
            return self.messages.serialize(serializer);
        }
        let extra = usize::from(!self.messages.is_empty());
        let mut map = serializer.serialize_map(Some(self.children.len() + extra))?;
        if !self.messages.is_empty() {
            map.serialize_entry(&self.base_key(), &self.messages)?;
        }
        for (seg, child) in &self.children {
            map.serialize_entry(seg, child)?;
        }
        map.end()
    }
}

fn messages_value(messages: Vec<String>) -> Value {
    Value::List(messages.into_iter().map(Value::String).collect())
}

/// `address.postal_code` becomes `Address postal code`.
pub fn humanize(path: &Path) -> String {
    let joined = path.segments().join("_").replace('_', " ").to_lowercase();
    let trimmed = joined.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
