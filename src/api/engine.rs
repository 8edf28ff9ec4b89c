//! The compilation engine.

use std::sync::Arc;

use hashbrown::HashMap;

use super::EngineOptions;
use crate::compiler::{self, CompileError};
use crate::context::{Ctx, SelectorKey};
use crate::ops::{Operator, OperatorRegistry};
use crate::program::Expr;
use crate::value::Value;
use crate::DynError;

/// Holds the operator registry, the selector key table and the options;
/// compiles expressions against them.
///
/// The engine is the long-lived piece: build one per rule set, register
/// custom operators and selectors once, then compile as many expressions as
/// needed. Compiled expressions are independent of the engine and each
/// other.
///
/// # Example
///
/// ```
/// use verdict::{Ctx, Engine, MapSelector, Value};
///
/// let mut engine = Engine::new();
/// engine.register_operator_fn("clamp", |_ctx, params| match params {
///     [Value::Int(v), Value::Int(lo), Value::Int(hi)] => {
///         Ok(Value::Int(*v.max(lo).min(hi)))
///     }
///     _ => Err("'clamp' expects three ints".into()),
/// });
///
/// let expr = engine.compile("clamp(score, 0, 100)").unwrap();
/// let vars = MapSelector::from_iter([("score", 250i64)]);
/// assert_eq!(expr.eval(&Ctx::new(&vars)).unwrap(), Value::Int(100));
/// ```
#[derive(Debug)]
pub struct Engine {
    operators: OperatorRegistry,
    selector_keys: HashMap<String, SelectorKey>,
    options: EngineOptions,
}

impl Engine {
    /// An engine with the builtin operators and default options.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            operators: OperatorRegistry::with_builtins(),
            selector_keys: HashMap::new(),
            options,
        }
    }

    /// Register (or replace) an operator available to compiled expressions.
    pub fn register_operator(&mut self, name: impl Into<Arc<str>>, op: Operator) {
        self.operators.register(name, op);
    }

    /// Convenience for registering a plain function or closure.
    pub fn register_operator_fn<F>(&mut self, name: impl Into<Arc<str>>, f: F)
    where
        F: Fn(&Ctx<'_>, &[Value]) -> Result<Value, DynError> + Send + Sync + 'static,
    {
        self.operators.register_fn(name, f);
    }

    /// Declare a variable and return its stable key. Idempotent: declaring
    /// the same name twice returns the same key.
    ///
    /// Selectors that dispatch on [`SelectorKey`] should declare their full
    /// variable set up front (and usually compile with
    /// `allow_undeclared_selectors` off); name-keyed selectors can skip
    /// declaration entirely.
    pub fn register_selector(&mut self, name: impl Into<String>) -> SelectorKey {
        let next = SelectorKey(self.selector_keys.len() as u16);
        *self.selector_keys.entry(name.into()).or_insert(next)
    }

    /// The key a declared variable was assigned, if any.
    pub fn selector_key(&self, name: &str) -> Option<SelectorKey> {
        self.selector_keys.get(name).copied()
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compile one expression into an immutable, reusable program.
    pub fn compile(&self, source: &str) -> Result<Expr, CompileError> {
        compiler::compile(&self.operators, &self.selector_keys, &self.options, source)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
