//! Arena storage for composite values
//!
//! Arrays, maps and objects live in three typed arenas and are addressed by
//! `u32` handles. A `Value` holding a handle is an alias of the body, so every
//! holder observes mutations made through any other. Cells are never freed
//! during a run; the whole heap is dropped with its interpreter.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{EvalError, EvalResult};
use crate::object::Instance;
use crate::value::{TypeTag, Value};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            pub fn index(self) -> u32 {
                self.0
            }
        }
    };
}

arena_id!(
    /// Handle to an array body
    ArrayId
);
arena_id!(
    /// Handle to a map body
    MapId
);
arena_id!(
    /// Handle to an object instance
    ObjectId
);

/// Body of a map value
pub type MapBody = IndexMap<String, Value>;

/// A composite handle without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapRef {
    Array(ArrayId),
    Map(MapId),
    Object(ObjectId),
}

impl HeapRef {
    /// The handle carried by a value, if it is a composite
    pub fn of(value: &Value) -> Option<HeapRef> {
        match value {
            Value::Array(id) => Some(HeapRef::Array(*id)),
            Value::Map(id) => Some(HeapRef::Map(*id)),
            Value::Object(id) => Some(HeapRef::Object(*id)),
            _ => None,
        }
    }
}

/// Owner of every composite body created during a run
#[derive(Debug, Default)]
pub struct Heap {
    arrays: Vec<Vec<Value>>,
    maps: Vec<MapBody>,
    objects: Vec<Instance>,
}

/// Handle for the next cell of an arena holding `len` cells
fn next_index(len: usize, kind: TypeTag) -> EvalResult<u32> {
    u32::try_from(len).map_err(|_| EvalError::HeapExhausted(kind))
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_array(&mut self, items: Vec<Value>) -> EvalResult<ArrayId> {
        let id = ArrayId::new(next_index(self.arrays.len(), TypeTag::Array)?);
        self.arrays.push(items);
        Ok(id)
    }

    pub fn alloc_map(&mut self, entries: MapBody) -> EvalResult<MapId> {
        let id = MapId::new(next_index(self.maps.len(), TypeTag::Map)?);
        self.maps.push(entries);
        Ok(id)
    }

    pub fn alloc_object(&mut self, instance: Instance) -> EvalResult<ObjectId> {
        let id = ObjectId::new(next_index(self.objects.len(), TypeTag::Object)?);
        self.objects.push(instance);
        Ok(id)
    }

    pub fn array(&self, id: ArrayId) -> &Vec<Value> {
        &self.arrays[id.index() as usize]
    }

    pub fn array_mut(&mut self, id: ArrayId) -> &mut Vec<Value> {
        &mut self.arrays[id.index() as usize]
    }

    pub fn map(&self, id: MapId) -> &MapBody {
        &self.maps[id.index() as usize]
    }

    pub fn map_mut(&mut self, id: MapId) -> &mut MapBody {
        &mut self.maps[id.index() as usize]
    }

    pub fn object(&self, id: ObjectId) -> &Instance {
        &self.objects[id.index() as usize]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut Instance {
        &mut self.objects[id.index() as usize]
    }

    /// Number of live cells across all three arenas
    pub fn len(&self) -> usize {
        self.arrays.len() + self.maps.len() + self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural equality: composites are compared by content.
    ///
    /// A pair of handles already under comparison is treated as equal, so
    /// cyclic structures terminate.
    pub fn deep_eq(&self, a: &Value, b: &Value) -> bool {
        let mut visiting = HashSet::new();
        self.deep_eq_inner(a, b, &mut visiting)
    }

    fn deep_eq_inner(
        &self,
        a: &Value,
        b: &Value,
        visiting: &mut HashSet<(HeapRef, HeapRef)>,
    ) -> bool {
        let (ra, rb) = match (HeapRef::of(a), HeapRef::of(b)) {
            (Some(ra), Some(rb)) => (ra, rb),
            (None, None) => return a == b,
            _ => return false,
        };
        if ra == rb || !visiting.insert((ra, rb)) {
            return true;
        }

        let equal = match (ra, rb) {
            (HeapRef::Array(x), HeapRef::Array(y)) => {
                let (x, y) = (self.array(x), self.array(y));
                x.len() == y.len()
                    && x.iter()
                        .zip(y.iter())
                        .all(|(l, r)| self.deep_eq_inner(l, r, visiting))
            }
            (HeapRef::Map(x), HeapRef::Map(y)) => {
                let (x, y) = (self.map(x), self.map(y));
                x.len() == y.len()
                    && x.iter().zip(y.iter()).all(|((kl, vl), (kr, vr))| {
                        kl == kr && self.deep_eq_inner(vl, vr, visiting)
                    })
            }
            (HeapRef::Object(x), HeapRef::Object(y)) => {
                let (x, y) = (self.object(x), self.object(y));
                x.class_name() == y.class_name()
                    && x.fields().len() == y.fields().len()
                    && x.fields().iter().zip(y.fields().iter()).all(
                        |((nl, sl), (nr, sr))| {
                            nl == nr && self.deep_eq_inner(&sl.value, &sr.value, visiting)
                        },
                    )
            }
            _ => false,
        };

        visiting.remove(&(ra, rb));
        equal
    }
}
