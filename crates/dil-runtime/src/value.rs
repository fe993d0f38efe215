//! Runtime value types for DIL

use std::fmt;
use std::sync::Arc;

pub use dil_parser::TypeTag;

use crate::heap::{ArrayId, MapId, ObjectId};

/// The core runtime value type
///
/// Scalars carry their payload inline. Composites are handles into the
/// [`Heap`](crate::heap::Heap), so copying a `Value` that holds one shares the
/// underlying body.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// String (shared, immutable)
    Str(Arc<str>),

    /// Ordered sequence
    Array(ArrayId),

    /// Ordered string-keyed mapping with an open schema
    Map(MapId),

    /// Class instance with a closed schema
    Object(ObjectId),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// The type tag of this value (`typeOf`)
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::Str,
            Value::Array(_) => TypeTag::Array,
            Value::Map(_) => TypeTag::Map,
            Value::Object(_) => TypeTag::Object,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        self.type_tag().name()
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => f.write_str(&format_float(*n)),
            Value::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Array(id) => write!(f, "<array#{}>", id.index()),
            Value::Map(id) => write!(f, "<map#{}>", id.index()),
            Value::Object(id) => write!(f, "<object#{}>", id.index()),
        }
    }
}

/// Render a float so that integral values keep a trailing `.0`
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n.fract() == 0.0 {
        format!("{}.0", n)
    } else {
        format!("{}", n)
    }
}

pub(crate) fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c if c.is_control() => {
                result.push_str(&format!("\\u{{{:x}}}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

// Scalars compare by content, composites by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}
