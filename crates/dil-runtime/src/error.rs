//! Runtime error types

use dil_parser::{Span, TypeTag};
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Evaluation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Class '{0}' is already defined")]
    DuplicateClass(String),

    #[error("Field '{field}' is declared twice in class '{class}'")]
    DuplicateField { class: String, field: String },

    #[error("Undefined class: {0}")]
    UndefinedClass(String),

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Path not found: no '{segment}' in {container}")]
    PathNotFound { segment: String, container: String },

    #[error("Index out of range: {index} (length: {length})")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: TypeTag,
        actual: TypeTag,
    },

    #[error("Invalid cast: cannot convert {value_type} to {target}")]
    InvalidCast { value_type: String, target: TypeTag },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unsupported operation '{op}' for {operands}")]
    UnsupportedOperation { op: String, operands: String },

    #[error("Integer overflow in '{op}'")]
    IntegerOverflow { op: String },

    #[error("Circular instantiation of class '{0}'")]
    CircularInstantiation(String),

    #[error("Condition must evaluate to bool, got {0}")]
    NonBooleanCondition(TypeTag),

    #[error("Cannot iterate over {0}")]
    NotIterable(TypeTag),

    #[error("Heap exhausted: no handles left for {0} values")]
    HeapExhausted(TypeTag),

    #[error("Failed to write output: {0}")]
    Output(String),
}

impl EvalError {
    /// Create an undefined variable error
    pub fn undefined_var(name: impl Into<String>) -> Self {
        EvalError::UndefinedVariable(name.into())
    }

    /// Create a path-not-found error for a segment applied to a container kind
    pub fn path_not_found(segment: impl Into<String>, container: impl Into<String>) -> Self {
        EvalError::PathNotFound {
            segment: segment.into(),
            container: container.into(),
        }
    }

    /// Create an invalid cast error
    pub fn invalid_cast(value_type: impl Into<String>, target: TypeTag) -> Self {
        EvalError::InvalidCast {
            value_type: value_type.into(),
            target,
        }
    }

    /// Create a type mismatch error for a field write
    pub fn type_mismatch(field: impl Into<String>, expected: TypeTag, actual: TypeTag) -> Self {
        EvalError::TypeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// Create an unsupported operation error from the operand type names
    pub fn unsupported(op: impl Into<String>, operands: &[&str]) -> Self {
        EvalError::UnsupportedOperation {
            op: op.into(),
            operands: operands.join(", "),
        }
    }

    /// Attach a source location
    pub fn at(self, span: Span) -> ExecError {
        ExecError { error: self, span }
    }
}

/// An [`EvalError`] raised by a statement, with the location of that statement
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct ExecError {
    pub error: EvalError,
    pub span: Span,
}
