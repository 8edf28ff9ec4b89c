//! Operator implementations and the registry nodes resolve them from.
//!
//! An [`Operator`] receives its parameters as a slice in child order and
//! must not retain the slice beyond the call; the machine reuses the
//! backing storage. Operators are trusted code: the engine applies no
//! sandboxing around them.

mod arith;
mod compare;
mod lists;
mod logic;

use std::sync::Arc;

use crate::context::Ctx;
use crate::value::Value;
use crate::DynError;

/// A callable operator implementation.
pub type Operator = Arc<dyn Fn(&Ctx<'_>, &[Value]) -> Result<Value, DynError> + Send + Sync>;

/// Maps operator names to implementations. The compiler resolves names to
/// [`Operator`] handles once; the machine only invokes the resolved callable.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    map: hashbrown::HashMap<Arc<str>, Operator>,
}

impl OperatorRegistry {
    /// An empty registry. Most callers want [`OperatorRegistry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the builtin operator set: `+ - * / %`,
    /// `< <= > >= == !=`, `and or not`, unary minus and `in`.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register_fn("+", arith::add);
        reg.register_fn("-", arith::sub);
        reg.register_fn("*", arith::mul);
        reg.register_fn("/", arith::div);
        reg.register_fn("%", arith::rem);
        reg.register_fn("neg", arith::neg);
        reg.register_fn("<", compare::lt);
        reg.register_fn("<=", compare::le);
        reg.register_fn(">", compare::gt);
        reg.register_fn(">=", compare::ge);
        reg.register_fn("==", compare::eq);
        reg.register_fn("!=", compare::ne);
        reg.register_fn("and", logic::and);
        reg.register_fn("or", logic::or);
        reg.register_fn("not", logic::not);
        reg.register_fn("in", lists::contains);
        reg
    }

    /// Register (or replace) an operator under `name`.
    pub fn register(&mut self, name: impl Into<Arc<str>>, op: Operator) {
        self.map.insert(name.into(), op);
    }

    /// Convenience for registering a plain function or closure.
    pub fn register_fn<F>(&mut self, name: impl Into<Arc<str>>, f: F)
    where
        F: Fn(&Ctx<'_>, &[Value]) -> Result<Value, DynError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&Operator> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.map.keys().map(|k| k.as_ref()).collect();
        names.sort_unstable();
        f.debug_struct("OperatorRegistry")
            .field("operators", &names)
            .finish()
    }
}

/// Render the parameter kinds for an operand-mismatch message.
pub(crate) fn operand_kinds(params: &[Value]) -> String {
    let names: Vec<&str> = params.iter().map(Value::type_name).collect();
    format!("({})", names.join(", "))
}
