//! Compilation: parse, fold, and lay out the node table.
//!
//! The parse tree lives in a bump arena scoped to one call; the compiled
//! [`Expr`](crate::Expr) owns all of its data and carries no lifetimes.

mod error;
mod folding;
mod layout;


pub use error::CompileError;

use bumpalo::Bump;
use hashbrown::HashMap;

use crate::api::EngineOptions;
use crate::context::SelectorKey;
use crate::ops::OperatorRegistry;
use crate::parser;
use crate::program::Expr;

/// Compile one source expression against the given registries.
pub(crate) fn compile(
    registry: &OperatorRegistry,
    keys: &HashMap<String, SelectorKey>,
    options: &EngineOptions,
    source: &str,
) -> Result<Expr, CompileError> {
    let arena = Bump::new();
    let mut ast = parser::parse(&arena, source)?;
    if options.constant_folding {
        ast = folding::fold(&arena, ast);
    }
    layout::build(registry, keys, options, ast)
}
