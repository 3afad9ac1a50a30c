//! Attribute paths and their external encodings.
//!
//! A [`Path`] is an ordered list of segments (attribute names and decimal
//! sequence indices). It encodes losslessly as dot notation (`a.b.0.c`) and as
//! a JSON Pointer (`/a/b/0/c`). The nested-tree encoding lives on
//! [`crate::errors::ErrorTree`].

use serde::{Serialize, Serializer};
use std::fmt;

const DOT: char = '.';
const SLASH: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Path(Vec<String>);

impl Path {
    pub fn new() -> Self {
        Path(Vec::new())
    }

    /// Parse dot notation. The empty string is the empty path.
    pub fn from_dot(dot: &str) -> Self {
        if dot.is_empty() {
            return Path::new();
        }
        Path(dot.split(DOT).map(str::to_string).collect())
    }

    pub fn from_pointer(pointer: &str) -> Self {
        Path::from_dot(&from_pointer(pointer))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: impl ToString) {
        self.0.push(segment.to_string());
    }

    /// New path with one more segment.
    pub fn child(&self, segment: impl ToString) -> Path {
        let mut p = self.clone();
        p.push(segment);
        p
    }

    /// `self` followed by every segment of `rest`.
    pub fn join(&self, rest: &Path) -> Path {
        let mut segments = self.0.clone();
        segments.extend(rest.0.iter().cloned());
        Path(segments)
    }

    pub fn to_dot(&self) -> String {
        self.0.join(".")
    }

    pub fn to_pointer(&self) -> String {
        format!("{}{}", SLASH, self.0.join("/"))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dot())
    }
}

impl From<&str> for Path {
    fn from(dot: &str) -> Self {
        Path::from_dot(dot)
    }
}

impl From<String> for Path {
    fn from(dot: String) -> Self {
        Path::from_dot(&dot)
    }
}

impl From<&String> for Path {
    fn from(dot: &String) -> Self {
        Path::from_dot(dot)
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Path(segments)
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Path(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Path(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dot())
    }
}

/// Dot notation to JSON Pointer: `a.b.0` becomes `/a/b/0`.
pub fn to_pointer(dot: &str) -> String {
    let mut out = String::with_capacity(dot.len() + 1);
    out.push(SLASH);
    out.push_str(&dot.replace(DOT, "/"));
    out
}

/// JSON Pointer to dot notation: `/a/b/0` becomes `a.b.0`.
pub fn from_pointer(pointer: &str) -> String {
    pointer
        .strip_prefix(SLASH)
        .unwrap_or(pointer)
        .replace(SLASH, ".")
}

pub fn is_pointer(s: &str) -> bool {
    s.starts_with(SLASH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_conversions() {
        assert_eq!(to_pointer("name"), "/name");
        assert_eq!(to_pointer("address.postal_code"), "/address/postal_code");
        assert_eq!(to_pointer("hobbies.0.name"), "/hobbies/0/name");
        assert_eq!(from_pointer("/hobbies/0/name"), "hobbies.0.name");
        assert_eq!(from_pointer("hobbies/0"), "hobbies.0");
        assert!(is_pointer("/a"));
        assert!(!is_pointer("a.b"));
    }

    #[test]
    fn path_segments_and_join() {
        let prefix = Path::from("hobbies").child(1);
        let p = prefix.join(&Path::from("name"));
        assert_eq!(p.segments(), ["hobbies", "1", "name"]);
        assert_eq!(p.to_dot(), "hobbies.1.name");
        assert_eq!(p.to_pointer(), "/hobbies/1/name");
        assert_eq!(Path::from_pointer("/hobbies/1/name"), p);
    }

    #[test]
    fn empty_path() {
        assert!(Path::from_dot("").is_empty());
        assert_eq!(Path::new().to_pointer(), "/");
    }
}
