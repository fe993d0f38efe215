//! Navigation over `->name` / `[index]` chains
//!
//! Reads walk the chain and return the leaf. Writes walk every segment but the
//! last and return a [`Locator`] naming the slot to replace, so a nested
//! update happens in place without rebuilding any ancestor. Navigation never
//! creates anything; only [`write`] may add a key to a map.

use std::fmt;

use tracing::trace;

use crate::error::{EvalError, EvalResult};
use crate::heap::{ArrayId, Heap, MapId, ObjectId};
use crate::value::Value;

/// One evaluated path segment
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    /// `->name`
    Field(String),
    /// `[index]`
    Index(i64),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Field(name) => write!(f, "->{}", name),
            PathStep::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// An addressable slot inside a composite
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    Field { object: ObjectId, name: String },
    Key { map: MapId, key: String },
    Index { array: ArrayId, index: usize },
}

/// Short description of a value used as a path container in errors
fn container_name(heap: &Heap, value: &Value) -> String {
    match value {
        Value::Object(id) => format!("object {}", heap.object(*id).class_name()),
        other => other.type_name().to_string(),
    }
}

fn check_index(index: i64, length: usize) -> EvalResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < length)
        .ok_or(EvalError::IndexOutOfRange { index, length })
}

/// Apply a single segment to a value
pub fn step(heap: &Heap, current: &Value, segment: &PathStep) -> EvalResult<Value> {
    trace!(segment = %segment, container = current.type_name(), "path step");

    match (current, segment) {
        (Value::Object(id), PathStep::Field(name)) => heap
            .object(*id)
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::path_not_found(name, container_name(heap, current))),
        (Value::Map(id), PathStep::Field(name)) => heap
            .map(*id)
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::path_not_found(name, "map")),
        (Value::Array(id), PathStep::Index(index)) => {
            let items = heap.array(*id);
            let i = check_index(*index, items.len())?;
            Ok(items[i].clone())
        }
        (Value::Str(s), PathStep::Index(index)) => {
            let length = s.chars().count();
            let i = check_index(*index, length)?;
            let ch = s
                .chars()
                .nth(i)
                .ok_or(EvalError::IndexOutOfRange { index: *index, length })?;
            Ok(Value::string(ch.to_string()))
        }
        (_, segment) => Err(EvalError::path_not_found(
            segment.to_string(),
            container_name(heap, current),
        )),
    }
}

/// Read the value at the end of a chain
pub fn get(heap: &Heap, root: &Value, segments: &[PathStep]) -> EvalResult<Value> {
    segments
        .iter()
        .try_fold(root.clone(), |current, segment| step(heap, &current, segment))
}

/// Resolve a chain to the slot its last segment names.
///
/// Object fields must already exist and array indices must be in range. A map
/// key may be absent; [`write`] will create it.
pub fn locate(heap: &Heap, root: &Value, segments: &[PathStep]) -> EvalResult<Locator> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(EvalError::path_not_found("", container_name(heap, root)));
    };
    let container = get(heap, root, parents)?;
    trace!(segment = %last, container = container.type_name(), "path locate");

    match (&container, last) {
        (Value::Object(id), PathStep::Field(name)) => {
            if heap.object(*id).field(name).is_none() {
                return Err(EvalError::path_not_found(
                    name,
                    container_name(heap, &container),
                ));
            }
            Ok(Locator::Field {
                object: *id,
                name: name.clone(),
            })
        }
        (Value::Map(id), PathStep::Field(name)) => Ok(Locator::Key {
            map: *id,
            key: name.clone(),
        }),
        (Value::Array(id), PathStep::Index(index)) => {
            let index = check_index(*index, heap.array(*id).len())?;
            Ok(Locator::Index { array: *id, index })
        }
        (_, segment) => Err(EvalError::path_not_found(
            segment.to_string(),
            container_name(heap, &container),
        )),
    }
}

/// Current value of a located slot, if it holds one
pub fn read(heap: &Heap, locator: &Locator) -> Option<Value> {
    match locator {
        Locator::Field { object, name } => heap.object(*object).get(name).cloned(),
        Locator::Key { map, key } => heap.map(*map).get(key).cloned(),
        Locator::Index { array, index } => heap.array(*array).get(*index).cloned(),
    }
}

/// Replace the value in a located slot
pub fn write(heap: &mut Heap, locator: &Locator, value: Value) -> EvalResult<()> {
    match locator {
        Locator::Field { object, name } => heap.object_mut(*object).set(name, value),
        Locator::Key { map, key } => {
            heap.map_mut(*map).insert(key.clone(), value);
            Ok(())
        }
        Locator::Index { array, index } => {
            let items = heap.array_mut(*array);
            let length = items.len();
            match items.get_mut(*index) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(EvalError::IndexOutOfRange {
                    index: i64::try_from(*index).unwrap_or(i64::MAX),
                    length,
                }),
            }
        }
    }
}
