//! The Value type - the document tree.
//!
//! This is the parsed form of the backing document. Every component switches
//! on the variant explicitly rather than inspecting types at runtime.

use indexmap::IndexMap;

use crate::Path;

/// Ordered mapping used for `Value::Map`.
///
/// Insertion order is kept so that a document reloaded from disk lists its
/// keys in the order a human wrote them.
pub type Map = IndexMap<String, Value>;

/// A tree-shaped value projected onto the filesystem.
///
/// # Design Notes
///
/// - `Map` becomes a directory, everything else becomes a regular file
/// - `Sequence` is addressable by index but never listed as a directory
/// - Uses `i64` for integers and `f64` for floats, matching YAML 1.2 core schema
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Distinct from "path doesn't exist".
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string, possibly spanning several lines.
    String(String),
    /// Ordered sequence of values.
    Sequence(Vec<Value>),
    /// Key-value mapping with string keys.
    Map(Map),
}

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Value::Null
    }

    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    /// Create an empty sequence.
    pub fn sequence() -> Self {
        Value::Sequence(Vec::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Check if this value is a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    /// Check if this value is a leaf (neither map nor sequence).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Map(_) | Value::Sequence(_))
    }

    /// Borrow the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(s) if s.trim_end_matches('\n').contains('\n') => "multiline string",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
        }
    }

    /// Get a reference to a nested value by path.
    ///
    /// Returns `None` if the path doesn't exist or can't be navigated
    /// (e.g., trying to index into a string).
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for component in path.iter() {
            current = match current {
                Value::Map(map) => map.get(component)?,
                Value::Sequence(items) => {
                    let index: usize = component.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Turn literal `\n` escape sequences inside strings into real newlines.
    ///
    /// Documents that were once dumped in escaped single-line form carry
    /// backslash-n pairs instead of line breaks. Returns the number of strings
    /// that changed.
    pub fn repair_escaped_newlines(&mut self) -> usize {
        match self {
            Value::String(s) if s.contains("\\n") => {
                *s = s.replace("\\n", "\n");
                1
            }
            Value::Sequence(items) => items.iter_mut().map(Value::repair_escaped_newlines).sum(),
            Value::Map(map) => map.values_mut().map(Value::repair_escaped_newlines).sum(),
            _ => 0,
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(v)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
