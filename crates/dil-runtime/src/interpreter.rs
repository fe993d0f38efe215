//! Statement executor for DIL programs

use std::sync::Arc;

use dil_parser::{
    BinaryOp, ClassDecl, Expr, ExprKind, Identifier, Program, Segment, Span, Stmt, StmtKind,
};
use indexmap::IndexMap;
use tracing::{debug, debug_span, trace};

use crate::coerce::{coerce, to_index};
use crate::error::{EvalError, EvalResult, ExecError};
use crate::heap::{Heap, MapBody, ObjectId};
use crate::object::{FieldSlot, Instance};
use crate::operators::{eval_binary_op, eval_unary_op};
use crate::path::{self, PathStep};
use crate::registry::{ClassRegistry, ClassTemplate};
use crate::scope::{Scope, ScopeKind};
use crate::value::Value;
use crate::view::ValueView;

/// Runtime tunables
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    /// Composites nested deeper than this render as `...`
    pub max_render_depth: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_render_depth: 64,
        }
    }
}

/// Receiver for the results of `Get` statements
pub trait OutputSink {
    /// `span` is the location of the evaluated expression. A failure stops the
    /// run like any other statement error.
    fn emit(&mut self, value: ValueView<'_>, span: Span) -> EvalResult<()>;
}

impl OutputSink for Vec<String> {
    fn emit(&mut self, value: ValueView<'_>, _span: Span) -> EvalResult<()> {
        self.push(value.to_string());
        Ok(())
    }
}

/// DIL interpreter
///
/// Owns every piece of run state: the class registry, the heap of composite
/// bodies and the program bindings. Statements run strictly in order and the
/// first failure stops the run.
#[derive(Debug, Default)]
pub struct Interpreter {
    registry: ClassRegistry,
    heap: Heap,
    globals: Scope,
    options: InterpreterOptions,
    /// Classes whose defaults are being evaluated, innermost last
    instantiating: Vec<Arc<str>>,
}

impl Interpreter {
    /// Create a new interpreter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interpreter with custom options
    pub fn with_options(options: InterpreterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Current value of a program binding
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.globals.resolve(name)
    }

    /// Render-ready view of a value produced by this interpreter
    pub fn view(&self, value: &Value) -> ValueView<'_> {
        ValueView::new(&self.heap, value.clone(), self.options.max_render_depth)
    }

    /// Execute every statement of a program in order
    pub fn run(&mut self, program: &Program, sink: &mut dyn OutputSink) -> Result<(), ExecError> {
        let _span = debug_span!("run", statements = program.statements.len()).entered();
        self.exec_block(&program.statements, sink)
    }

    fn exec_block(&mut self, stmts: &[Stmt], sink: &mut dyn OutputSink) -> Result<(), ExecError> {
        for stmt in stmts {
            self.exec_stmt(stmt, sink)?;
        }
        Ok(())
    }

    /// Execute one statement, attaching its location to any failure.
    ///
    /// A failure inside an `IF` or loop body keeps the location of the
    /// innermost failing statement.
    pub fn exec_stmt(&mut self, stmt: &Stmt, sink: &mut dyn OutputSink) -> Result<(), ExecError> {
        let at = |error: EvalError| error.at(stmt.span);
        match &stmt.kind {
            StmtKind::Class(decl) => self.exec_class(decl).map_err(at),
            StmtKind::Let { name, value } => self.exec_let(name, value).map_err(at),
            StmtKind::Assign {
                target,
                segments,
                value,
            } => self.exec_assign(target, segments, value).map_err(at),
            StmtKind::Get(expr) => self.exec_get(expr, sink).map_err(at),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if self.eval_condition(condition)? {
                    then_branch
                } else {
                    else_branch
                };
                self.exec_block(branch, sink)
            }
            StmtKind::ForEach {
                value,
                key,
                iterable,
                body,
            } => self.exec_foreach(value, key.as_ref(), iterable, body, sink),
            StmtKind::For {
                counter,
                condition,
                body,
            } => self.exec_for(counter, condition, body, sink),
        }
    }

    fn exec_class(&mut self, decl: &ClassDecl) -> EvalResult<()> {
        let template = ClassTemplate::from_decl(decl)?;
        debug!(class = %template.name, fields = template.fields.len(), "define class");
        self.registry.define(template)?;
        Ok(())
    }

    fn exec_let(&mut self, name: &Identifier, value: &Expr) -> EvalResult<()> {
        let value = self.eval(value)?;
        debug!(name = %name.node, ty = value.type_name(), "let");
        self.globals.define(name.node.as_str(), value);
        Ok(())
    }

    fn exec_get(&mut self, expr: &Expr, sink: &mut dyn OutputSink) -> EvalResult<()> {
        let value = self.eval(expr)?;
        debug!(ty = value.type_name(), "get");
        sink.emit(self.view(&value), expr.span)
    }

    /// Evaluate an `IF` or `FOR` condition, which must produce a bool
    fn eval_condition(&mut self, condition: &Expr) -> Result<bool, ExecError> {
        let value = self.eval(condition).map_err(|e| e.at(condition.span))?;
        value
            .as_bool()
            .ok_or_else(|| EvalError::NonBooleanCondition(value.type_tag()).at(condition.span))
    }

    /// `FOREACH value[, key] IN iterable DO ... ENDFOREACH`
    ///
    /// The entries are captured before the first iteration, so the body may
    /// mutate the collection without changing what is visited. Array keys are
    /// indices, map keys are strings. Loop variables that did not exist before
    /// the loop are removed afterwards; existing ones keep their last value.
    fn exec_foreach(
        &mut self,
        value_var: &Identifier,
        key_var: Option<&Identifier>,
        iterable: &Expr,
        body: &[Stmt],
        sink: &mut dyn OutputSink,
    ) -> Result<(), ExecError> {
        let collection = self.eval(iterable).map_err(|e| e.at(iterable.span))?;
        let entries: Vec<(Value, Value)> = match &collection {
            Value::Array(id) => (0_i64..)
                .zip(self.heap.array(*id).iter().cloned())
                .map(|(i, item)| (Value::Int(i), item))
                .collect(),
            Value::Map(id) => self
                .heap
                .map(*id)
                .iter()
                .map(|(k, v)| (Value::string(k.as_str()), v.clone()))
                .collect(),
            other => {
                return Err(EvalError::NotIterable(other.type_tag()).at(iterable.span));
            }
        };
        debug!(value = %value_var.node, entries = entries.len(), "foreach");

        let mut created = vec![!self.globals.has(&value_var.node)];
        if let Some(key_var) = key_var {
            created.push(!self.globals.has(&key_var.node));
        }

        let result = entries.into_iter().try_for_each(|(key, item)| {
            self.globals.define(value_var.node.as_str(), item);
            if let Some(key_var) = key_var {
                self.globals.define(key_var.node.as_str(), key);
            }
            self.exec_block(body, sink)
        });

        let vars = std::iter::once(value_var).chain(key_var);
        for (var, created) in vars.zip(created) {
            if created {
                self.globals.remove(&var.node);
            }
        }
        result
    }

    /// `FOR counter WHEN condition DO ... ENDFOR`
    ///
    /// Runs the body while the condition holds, checking it before every
    /// iteration. An unbound counter starts at `0` and is removed when the
    /// loop ends.
    fn exec_for(
        &mut self,
        counter: &Identifier,
        condition: &Expr,
        body: &[Stmt],
        sink: &mut dyn OutputSink,
    ) -> Result<(), ExecError> {
        let created = !self.globals.has(&counter.node);
        if created {
            self.globals.define(counter.node.as_str(), Value::Int(0));
        }

        let result = self.repeat_while(condition, body, sink);
        if created {
            self.globals.remove(&counter.node);
        }

        let iterations = result?;
        trace!(counter = %counter.node, iterations, "for");
        Ok(())
    }

    fn repeat_while(
        &mut self,
        condition: &Expr,
        body: &[Stmt],
        sink: &mut dyn OutputSink,
    ) -> Result<usize, ExecError> {
        let mut iterations = 0;
        while self.eval_condition(condition)? {
            self.exec_block(body, sink)?;
            iterations += 1;
        }
        Ok(iterations)
    }

    /// `name = expr;` or `name->path = expr;`
    ///
    /// The target is resolved before the right-hand side is evaluated.
    fn exec_assign(
        &mut self,
        target: &Identifier,
        segments: &[Segment],
        value: &Expr,
    ) -> EvalResult<()> {
        let root = self
            .globals
            .resolve(&target.node)
            .cloned()
            .ok_or_else(|| EvalError::undefined_var(&target.node))?;

        if segments.is_empty() {
            let value = self.eval(value)?;
            debug!(name = %target.node, ty = value.type_name(), "rebind");
            return self.globals.rebind(&target.node, value);
        }

        let steps = self.eval_segments(segments, ScopeKind::Program)?;
        let locator = path::locate(&self.heap, &root, &steps)?;
        let value = self.eval(value)?;
        debug!(name = %target.node, ?locator, ty = value.type_name(), "assign");
        path::write(&mut self.heap, &locator, value)
    }

    /// Evaluate an expression with program bindings in scope
    pub fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.eval_expr(expr, ScopeKind::Program)
    }

    fn eval_expr(&mut self, expr: &Expr, scope: ScopeKind) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::String(s) => Ok(Value::string(s.as_str())),

            ExprKind::Map(entries) => {
                let mut body = MapBody::with_capacity(entries.len());
                for entry in entries {
                    let value = self.eval_expr(&entry.value, scope)?;
                    body.insert(entry.key.node.clone(), value);
                }
                Ok(Value::Map(self.heap.alloc_map(body)?))
            }

            ExprKind::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval_expr(item, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Array(self.heap.alloc_array(items)?))
            }

            ExprKind::New(class) => self.instantiate(&class.node).map(Value::Object),

            ExprKind::Identifier(name) => match scope {
                ScopeKind::Program => self
                    .globals
                    .resolve(name)
                    .cloned()
                    .ok_or_else(|| EvalError::undefined_var(name)),
                ScopeKind::ClassDefaults => Err(EvalError::undefined_var(name)),
            },

            ExprKind::Path { base, segments } => {
                let root = self.eval_expr(base, scope)?;
                let steps = self.eval_segments(segments, scope)?;
                path::get(&self.heap, &root, &steps)
            }

            ExprKind::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => {
                let l = self.eval_expr(left, scope)?;
                match (op, l.as_bool()) {
                    (BinaryOp::And, Some(false)) => Ok(Value::Bool(false)),
                    (BinaryOp::Or, Some(true)) => Ok(Value::Bool(true)),
                    _ => {
                        let r = self.eval_expr(right, scope)?;
                        eval_binary_op(*op, &l, &r)
                    }
                }
            }

            ExprKind::Binary { op, left, right } => {
                let l = self.eval_expr(left, scope)?;
                let r = self.eval_expr(right, scope)?;
                eval_binary_op(*op, &l, &r)
            }

            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand, scope)?;
                eval_unary_op(*op, &value)
            }

            ExprKind::As { value, ty } => {
                let value = self.eval_expr(value, scope)?;
                coerce(value, ty.node)
            }

            ExprKind::Parenthesized(inner) => self.eval_expr(inner, scope),
        }
    }

    fn eval_segments(
        &mut self,
        segments: &[Segment],
        scope: ScopeKind,
    ) -> EvalResult<Vec<PathStep>> {
        segments
            .iter()
            .map(|segment| match segment {
                Segment::Field(name) => Ok(PathStep::Field(name.node.clone())),
                Segment::Index(expr) => {
                    let index = self.eval_expr(expr, scope)?;
                    to_index(index).map(PathStep::Index)
                }
            })
            .collect()
    }

    /// Build a fresh instance of a registered class.
    ///
    /// Every default is evaluated anew, so instances never share composite
    /// storage. A class whose defaults instantiate itself, directly or through
    /// another class, fails with [`EvalError::CircularInstantiation`].
    pub fn instantiate(&mut self, class: &str) -> EvalResult<ObjectId> {
        let template = self.registry.lookup(class)?;
        if self.instantiating.contains(&template.name) {
            return Err(EvalError::CircularInstantiation(template.name.to_string()));
        }

        self.instantiating.push(Arc::clone(&template.name));
        let fields = self.build_fields(&template);
        self.instantiating.pop();

        let id = self
            .heap
            .alloc_object(Instance::new(Arc::clone(&template.name), fields?))?;
        trace!(class = %template.name, object = id.index(), "instantiate");
        Ok(id)
    }

    fn build_fields(
        &mut self,
        template: &ClassTemplate,
    ) -> EvalResult<IndexMap<String, FieldSlot>> {
        let mut fields = IndexMap::with_capacity(template.fields.len());
        for def in &template.fields {
            let mut value = self.eval_expr(&def.default, ScopeKind::ClassDefaults)?;
            if let Some(ty) = def.declared_type {
                value = coerce(value, ty)?;
            }
            fields.insert(
                def.name.clone(),
                FieldSlot::new(value, def.declared_type, def.overwritable),
            );
        }
        Ok(fields)
    }
}
