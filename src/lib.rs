//! Verdict is a compile-once, evaluate-many expression engine.
//!
//! An infix expression such as `age >= 21 and country in ["US", "CA"]` is
//! compiled into a compact, index-addressed node table. The table is then
//! executed by an iterative stack machine against a caller-supplied
//! [`Selector`] that resolves variable names to runtime [`Value`]s. The same
//! compiled [`Expr`] can be evaluated any number of times, concurrently,
//! against different contexts: compilation cost is paid once and evaluation is
//! the hot path.
//!
//! `and`/`or` short-circuit without evaluating elided operands, and
//! `if(p, a, b)` evaluates exactly one branch. Short-circuiting is
//! constant-time: the compiler precomputes stack-depth tables so the machine
//! can collapse a whole chain of boolean ancestors in one rewind instead of
//! re-executing them.
//!
//! # Example
//!
//! ```
//! use verdict::{eval, MapSelector, Value};
//!
//! let vars = MapSelector::from_iter([("age", 42i64)]);
//! let res = eval("age >= 21 and age < 65", &vars).unwrap();
//! assert_eq!(res, Value::Bool(true));
//! ```
//!
//! For repeated evaluation, compile through an [`Engine`]:
//!
//! ```
//! use verdict::{Ctx, Engine, MapSelector, Value};
//!
//! let engine = Engine::new();
//! let expr = engine.compile(r#"if(plan == "pro", limit * 10, limit)"#).unwrap();
//!
//! for (plan, limit, want) in [("pro", 5i64, 50i64), ("free", 5, 5)] {
//!     let vars = MapSelector::from_iter([
//!         ("plan", Value::from(plan)),
//!         ("limit", Value::from(limit)),
//!     ]);
//!     let res = expr.eval(&Ctx::new(&vars)).unwrap();
//!     assert_eq!(res, Value::Int(want));
//! }
//! ```

pub mod api;
pub mod compiler;
pub mod context;
pub mod evaluator;
pub mod ops;
pub mod parser;
pub mod program;
pub mod value;

/// Error type selectors and operators report failures with; the evaluator
/// wraps it with the failing node's identity.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub use api::{eval, eval_bool, Engine, EngineOptions, Error};
pub use compiler::CompileError;
pub use context::{CancelToken, Ctx, MapSelector, Selector, SelectorKey};
pub use evaluator::EvalError;
pub use ops::{Operator, OperatorRegistry};
pub use program::Expr;
pub use value::{unify, Value};
