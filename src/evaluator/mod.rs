//! The evaluation machine.
//!
//! Evaluation is iterative: a frame stack of pending node indices and an
//! operand stack of computed values, driven by a monotone watermark that
//! tells first visits (push children) apart from second visits (consume the
//! children's results). Because every child's index is greater than its
//! parent's, the watermark passing a node implies the whole subtree below it
//! has been processed.
//!
//! Keeping the machine non-recursive is what makes short-circuiting cheap: a
//! boolean result that decides an ancestor truncates both stacks to depths
//! the compiler precomputed, instead of unwinding through live call frames.
//! Resist the temptation to rewrite this as a recursive tree walk.
//!
//! ## Design principles
//!
//! - **Never panic on user input**: malformed programs cannot be built
//!   through the compiler, and every runtime failure is a typed error.
//! - **Allocation-free hot path**: both stacks are sized once per
//!   evaluation; binary operators pass their operands through an inline
//!   buffer.
//! - **Cooperative cancellation**: the context's token is sampled before
//!   every node dispatch.

mod error;
mod vm;

#[cfg(test)]
mod vm_test;

pub use error::EvalError;
