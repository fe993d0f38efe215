//! Borrowed, fully resolved views of runtime values
//!
//! A [`ValueView`] pairs a value with the heap that owns its composite bodies,
//! so it can be printed with `Display` or handed to any serde serializer.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::heap::{Heap, HeapRef};
use crate::value::Value;

/// Marker rendered in place of a composite that encloses itself
pub const CYCLE_MARKER: &str = "<cycle>";

/// Marker rendered in place of a composite nested deeper than the limit
pub const DEPTH_MARKER: &str = "...";

#[derive(Debug, Clone)]
pub struct ValueView<'a> {
    heap: &'a Heap,
    value: Value,
    max_depth: usize,
    /// Composites currently being rendered, outermost first
    ancestors: Vec<HeapRef>,
}

enum Marker {
    Cycle,
    Depth,
}

impl<'a> ValueView<'a> {
    pub fn new(heap: &'a Heap, value: Value, max_depth: usize) -> Self {
        Self {
            heap,
            value,
            max_depth,
            ancestors: Vec::new(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn child(&self, value: &Value) -> ValueView<'a> {
        let mut ancestors = self.ancestors.clone();
        ancestors.extend(HeapRef::of(&self.value));
        ValueView {
            heap: self.heap,
            value: value.clone(),
            max_depth: self.max_depth,
            ancestors,
        }
    }

    fn marker(&self) -> Option<Marker> {
        let handle = HeapRef::of(&self.value)?;
        if self.ancestors.contains(&handle) {
            Some(Marker::Cycle)
        } else if self.ancestors.len() >= self.max_depth {
            Some(Marker::Depth)
        } else {
            None
        }
    }
}

impl Marker {
    fn text(&self) -> &'static str {
        match self {
            Marker::Cycle => CYCLE_MARKER,
            Marker::Depth => DEPTH_MARKER,
        }
    }
}

impl fmt::Display for ValueView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(marker) = self.marker() {
            return f.write_str(marker.text());
        }

        match &self.value {
            Value::Array(id) => {
                write!(f, "[")?;
                for (i, item) in self.heap.array(*id).iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.child(item))?;
                }
                write!(f, "]")
            }
            Value::Map(id) => {
                write!(f, "{{")?;
                for (i, (k, v)) in self.heap.map(*id).iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, self.child(v))?;
                }
                write!(f, "}}")
            }
            Value::Object(id) => {
                let instance = self.heap.object(*id);
                write!(f, "{} {{", instance.class_name())?;
                for (i, (name, slot)) in instance.fields().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, self.child(&slot.value))?;
                }
                write!(f, "}}")
            }
            scalar => write!(f, "{}", scalar),
        }
    }
}

impl Serialize for ValueView<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if let Some(marker) = self.marker() {
            return serializer.serialize_str(marker.text());
        }

        match &self.value {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Array(id) => {
                let items = self.heap.array(*id);
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            Value::Map(id) => {
                let entries = self.heap.map(*id);
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, &self.child(v))?;
                }
                map.end()
            }
            Value::Object(id) => {
                let fields = self.heap.object(*id).fields();
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, slot) in fields {
                    map.serialize_entry(name, &self.child(&slot.value))?;
                }
                map.end()
            }
        }
    }
}
