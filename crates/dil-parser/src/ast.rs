//! Abstract Syntax Tree definitions for DIL

use std::fmt;

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Byte range, for diagnostic renderers
    pub fn range(self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// A node with associated source span
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Simple identifier
pub type Identifier = Spanned<String>;

// =============================================================================
// Program
// =============================================================================

/// A complete DIL script
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `class Name: field* class:end;`
    Class(ClassDecl),

    /// `let name = expr;`
    Let { name: Identifier, value: Expr },

    /// `name = expr;` or `name->a[0]->b = expr;`
    Assign {
        target: Identifier,
        segments: Vec<Segment>,
        value: Expr,
    },

    /// `Get expr;`
    Get(Expr),

    /// `IF cond THEN ... [ELSE ...] ENDIF`
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },

    /// `FOREACH value[, key] IN expr DO ... ENDFOREACH`
    ForEach {
        value: Identifier,
        key: Option<Identifier>,
        iterable: Expr,
        body: Vec<Stmt>,
    },

    /// `FOR counter WHEN cond DO ... ENDFOR`
    For {
        counter: Identifier,
        condition: Expr,
        body: Vec<Stmt>,
    },
}

// =============================================================================
// Class Declaration
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Identifier,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// `Name: default [as type] [$overwrite$];`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Identifier,
    pub default: Expr,
    pub ty: Option<Spanned<TypeTag>>,
    pub overwrite: bool,
    pub span: Span,
}

// =============================================================================
// Types
// =============================================================================

/// The closed set of runtime type tags, one per value variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Array,
    Map,
    Object,
}

impl TypeTag {
    /// Resolve a surface type name (`int`, `string`, `map`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let tag = match name {
            "null" => TypeTag::Null,
            "bool" | "boolean" => TypeTag::Bool,
            "int" => TypeTag::Int,
            "float" | "double" => TypeTag::Float,
            "str" | "string" => TypeTag::Str,
            "array" => TypeTag::Array,
            "map" => TypeTag::Map,
            "object" => TypeTag::Object,
            _ => return None,
        };
        Some(tag)
    }

    /// Canonical surface name
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::Array => "array",
            TypeTag::Map => "map",
            TypeTag::Object => "object",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // Literals
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),

    // Composite literals
    Map(Vec<MapEntry>),
    Array(Vec<Expr>),

    /// `ClassName:new`
    New(Identifier),

    Identifier(String),

    /// `base->name[index]...`
    Path {
        base: Box<Expr>,
        segments: Vec<Segment>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// `expr as type`
    As {
        value: Box<Expr>,
        ty: Spanned<TypeTag>,
    },

    Parenthesized(Box<Expr>),
}

/// `key: value` inside a map literal
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Identifier,
    pub value: Expr,
}

/// One step of a path chain
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `->name`
    Field(Identifier),
    /// `[expr]`
    Index(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `&&`, short-circuiting
    And,
    /// `||`, short-circuiting
    Or,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
}

impl BinaryOp {
    /// Tightest binding level returned by [`BinaryOp::precedence`]
    pub const MAX_PRECEDENCE: u8 = 8;

    /// Returns the precedence (higher = binds tighter)
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::BitOr => 3,
            BinaryOp::BitAnd => 4,
            BinaryOp::Eq | BinaryOp::Ne => 5,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 6,
            BinaryOp::Add | BinaryOp::Sub => 7,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 8,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}
