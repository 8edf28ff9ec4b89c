//! Public API: the engine, its options, and the one-shot entry points.
//!
//! Two ways in:
//!
//! 1. **One-shot**: [`eval`] / [`eval_bool`] compile with a default engine
//!    and evaluate against a [`MapSelector`] in a single call. Convenient
//!    for tests and infrequent rules.
//! 2. **Compiled**: build an [`Engine`], [`Engine::compile`] once, then
//!    [`Expr::eval`](crate::Expr::eval) per context. This is the intended
//!    hot path; compilation is amortized away.

pub mod engine;
pub mod error;
pub mod options;

pub use engine::Engine;
pub use error::Error;
pub use options::EngineOptions;

use crate::context::{Ctx, MapSelector};
use crate::value::Value;

/// Compile and evaluate in one call.
///
/// ```
/// use verdict::{eval, MapSelector, Value};
///
/// let vars = MapSelector::from_iter([("x", 3i64), ("y", 4i64)]);
/// assert_eq!(eval("x + y", &vars).unwrap(), Value::Int(7));
/// ```
pub fn eval(source: &str, vars: &MapSelector) -> Result<Value, Error> {
    let engine = Engine::new();
    let expr = engine.compile(source)?;
    let ctx = Ctx::new(vars);
    Ok(expr.eval(&ctx)?)
}

/// Compile and evaluate in one call, requiring a boolean result.
///
/// ```
/// use verdict::{eval_bool, MapSelector};
///
/// let vars = MapSelector::from_iter([("age", 30i64)]);
/// assert!(eval_bool("age >= 21", &vars).unwrap());
/// ```
pub fn eval_bool(source: &str, vars: &MapSelector) -> Result<bool, Error> {
    let engine = Engine::new();
    let expr = engine.compile(source)?;
    let ctx = Ctx::new(vars);
    Ok(expr.eval_bool(&ctx)?)
}
