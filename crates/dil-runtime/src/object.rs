//! Class instances and their field slots

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{EvalError, EvalResult};
use crate::value::{TypeTag, Value};

/// Storage for one field of an instance
#[derive(Debug, Clone)]
pub struct FieldSlot {
    /// Type fixed by an `as T` annotation on the default, if any
    pub declared_type: Option<TypeTag>,

    /// Set by `$overwrite$`: the slot accepts any value
    pub overwritable: bool,

    pub value: Value,
}

impl FieldSlot {
    pub fn new(value: Value, declared_type: Option<TypeTag>, overwritable: bool) -> Self {
        Self {
            declared_type,
            overwritable,
            value,
        }
    }

    /// Store `value` in this slot, enforcing the overwrite policy.
    ///
    /// An overwritable slot takes anything and adopts the new value's type.
    /// A typed slot takes a value of its own type, or an `int` widened into a
    /// `float` slot. An untyped slot takes anything.
    pub fn assign(&mut self, field: &str, value: Value) -> EvalResult<()> {
        if self.overwritable {
            self.declared_type = Some(value.type_tag());
            self.value = value;
            return Ok(());
        }

        let value = match (self.declared_type, value) {
            (None, value) => value,
            (Some(TypeTag::Float), Value::Int(i)) => Value::Float(i as f64),
            (Some(expected), value) if value.type_tag() == expected => value,
            (Some(expected), value) => {
                return Err(EvalError::type_mismatch(field, expected, value.type_tag()))
            }
        };

        self.value = value;
        Ok(())
    }
}

/// An instantiated class: a fixed, ordered set of field slots
#[derive(Debug, Clone)]
pub struct Instance {
    class_name: Arc<str>,
    fields: IndexMap<String, FieldSlot>,
}

impl Instance {
    /// Build an instance from its complete field set. Instances never gain or
    /// lose fields afterwards.
    pub(crate) fn new(class_name: Arc<str>, fields: IndexMap<String, FieldSlot>) -> Self {
        Self { class_name, fields }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn fields(&self) -> &IndexMap<String, FieldSlot> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSlot> {
        self.fields.get(name)
    }

    /// Current value of a field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).map(|slot| &slot.value)
    }

    /// Assign to an existing field. Unknown fields are rejected because the
    /// schema is closed.
    pub fn set(&mut self, name: &str, value: Value) -> EvalResult<()> {
        match self.fields.get_mut(name) {
            Some(slot) => slot.assign(name, value),
            None => Err(EvalError::path_not_found(
                name,
                format!("object {}", self.class_name),
            )),
        }
    }
}
