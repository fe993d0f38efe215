//! DIL Runtime
//!
//! This crate provides the value model, class registry, path resolver and
//! statement executor for DIL programs.

pub mod coerce;
pub mod error;
pub mod heap;
pub mod interpreter;
pub mod object;
pub mod operators;
pub mod path;
pub mod registry;
pub mod scope;
pub mod value;
pub mod view;

pub use coerce::coerce;
pub use error::{EvalError, EvalResult, ExecError};
pub use heap::{ArrayId, Heap, HeapRef, MapBody, MapId, ObjectId};
pub use interpreter::{Interpreter, InterpreterOptions, OutputSink};
pub use object::{FieldSlot, Instance};
pub use path::{Locator, PathStep};
pub use registry::{ClassRegistry, ClassTemplate, FieldDef};
pub use scope::{Scope, ScopeKind};
pub use value::{TypeTag, Value};
pub use view::ValueView;
