//! Dotted field paths.
//!
//! A path such as `contacts.$.contactId` addresses a location inside a JSON
//! document. `$` stands for every element of an array and is resolved with
//! [`FieldPath::expand`]; numeric segments address a single array element.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object member.
    Field(String),
    /// Array element.
    Index(usize),
    /// Every element of an array.
    Each,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Index(i) => write!(f, "{i}"),
            Segment::Each => f.write_str("$"),
        }
    }
}

/// A location inside a document, written `a.b.0.c` or `a.$.c`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<Segment>,
}

/// A concrete path produced by [`FieldPath::expand`], with the array indices
/// that were substituted for each `$` segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub path: FieldPath,
    pub indices: Vec<usize>,
}

impl FieldPath {
    /// Parses a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidPath(s.to_string()));
        }
        let segments = s
            .split('.')
            .map(|part| match part {
                "" => Err(Error::InvalidPath(s.to_string())),
                "$" => Ok(Segment::Each),
                digits if digits.bytes().all(|b| b.is_ascii_digit()) => digits
                    .parse()
                    .map(Segment::Index)
                    .map_err(|_| Error::InvalidPath(s.to_string())),
                name => Ok(Segment::Field(name.to_string())),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Builds a path from raw segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Single-member path.
    pub fn field(name: &str) -> Self {
        Self {
            segments: vec![Segment::Field(name.to_string())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the path contains no `$` wildcard.
    pub fn is_concrete(&self) -> bool {
        !self.segments.contains(&Segment::Each)
    }

    /// Returns this path extended by an object member.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Field(name.to_string()));
        Self { segments }
    }

    /// Returns this path extended by a `$` wildcard.
    #[must_use]
    pub fn each(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Each);
        Self { segments }
    }

    /// Returns this path followed by `other`.
    #[must_use]
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Replaces `$` segments, in order, with the given indices. Wildcards left
    /// over once `indices` is exhausted are kept.
    #[must_use]
    pub fn bind(&self, indices: &[usize]) -> Self {
        let mut remaining = indices.iter();
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Each => remaining
                    .next()
                    .map_or(Segment::Each, |i| Segment::Index(*i)),
                other => other.clone(),
            })
            .collect();
        Self { segments }
    }

    /// Reads the value at this path. Wildcard paths never resolve.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| step(current, segment))
    }

    /// Writes `value` at this path, creating intermediate objects as needed.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<()> {
        let Some((last, parents)) = self.segments.split_last() else {
            *root = value;
            return Ok(());
        };
        let mut current = root;
        for segment in parents {
            current = step_mut(current, segment)
                .ok_or_else(|| Error::NotAContainer(self.to_string()))?;
        }
        if current.is_null() && matches!(last, Segment::Field(_)) {
            *current = Value::Object(Map::new());
        }
        match (last, current) {
            (Segment::Field(name), Value::Object(map)) => {
                map.insert(name.clone(), value);
                Ok(())
            }
            (Segment::Index(i), Value::Array(items)) if *i <= items.len() => {
                if *i == items.len() {
                    items.push(value);
                } else {
                    items[*i] = value;
                }
                Ok(())
            }
            _ => Err(Error::NotAContainer(self.to_string())),
        }
    }

    /// Expands every `$` segment against `root`, producing one concrete path per
    /// array element reached. A concrete path expands to itself, whether or not
    /// it exists in `root`.
    pub fn expand(&self, root: &Value) -> Vec<Expansion> {
        let mut out = Vec::new();
        expand_from(
            &self.segments,
            Some(root),
            &mut Vec::new(),
            &mut Vec::new(),
            &mut out,
        );
        out
    }
}

fn step<'a>(current: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (segment, current) {
        (Segment::Field(name), Value::Object(map)) => map.get(name),
        (Segment::Index(i), Value::Array(items)) => items.get(*i),
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match segment {
        Segment::Field(name) => {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            match current {
                Value::Object(map) => Some(map.entry(name.clone()).or_insert(Value::Null)),
                _ => None,
            }
        }
        Segment::Index(i) => match current {
            Value::Array(items) => items.get_mut(*i),
            _ => None,
        },
        Segment::Each => None,
    }
}

fn expand_from(
    segments: &[Segment],
    current: Option<&Value>,
    prefix: &mut Vec<Segment>,
    indices: &mut Vec<usize>,
    out: &mut Vec<Expansion>,
) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(Expansion {
            path: FieldPath::from_segments(prefix.clone()),
            indices: indices.clone(),
        });
        return;
    };

    match head {
        Segment::Each => {
            let Some(Value::Array(items)) = current else {
                return;
            };
            for (i, item) in items.iter().enumerate() {
                prefix.push(Segment::Index(i));
                indices.push(i);
                expand_from(rest, Some(item), prefix, indices, out);
                indices.pop();
                prefix.pop();
            }
        }
        segment => {
            let next = current.and_then(|v| step(v, segment));
            prefix.push(segment.clone());
            expand_from(rest, next, prefix, indices, out);
            prefix.pop();
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}
