//! The compact, index-addressed representation of a compiled expression.
//!
//! A program is an ordered array of [`Node`] records. Index 0 is the root;
//! children of a node occupy a contiguous run strictly after their parent.
//! Alongside the node table the program carries the auxiliary tables the
//! machine needs for constant-time short-circuiting: parent links, rewind
//! targets, and the expected stack depths at each node's first visit.
//!
//! A compiled [`Expr`] is immutable. It may be evaluated concurrently from
//! any number of threads; each evaluation owns its working stacks.

use std::fmt;
use std::sync::Arc;

use crate::context::SelectorKey;
use crate::ops::Operator;
use crate::value::Value;

/// Role of one node in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Literal value; the payload lives in [`Node::value`].
    Constant,
    /// Variable reference, resolved through the evaluation context.
    Selector,
    /// Operator with at least one non-leaf child, evaluated via the stacks.
    Operator,
    /// Operator whose children are all leaves; operands are gathered inline
    /// without touching the stacks.
    FastOperator,
    /// Three-way conditional. Owns four child slots: predicate, then-branch,
    /// else-branch, and the synthetic join node.
    Cond,
    /// Join point of a conditional; adopts the selected branch's result.
    End,
    /// Shadow node in a trace-enabled table; prints the machine state and
    /// then defers to its real counterpart.
    Debug,
}

/// Short-circuit trigger bits. Only ever set on nodes that produce booleans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScFlags {
    pub if_false: bool,
    pub if_true: bool,
}

impl ScFlags {
    pub(crate) fn is_empty(&self) -> bool {
        !self.if_false && !self.if_true
    }

    /// Whether a boolean result with this truth value triggers a rewind.
    pub(crate) fn triggers(&self, truth: bool) -> bool {
        (truth && self.if_true) || (!truth && self.if_false)
    }
}

/// One record of the node table.
#[derive(Clone)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub sc: ScFlags,
    pub child_cnt: u8,
    /// Index of the first child; children are contiguous.
    pub child_idx: u16,
    /// Variable handle for selector nodes.
    pub sel_key: Option<SelectorKey>,
    /// Constant payload, or the display name for every other kind.
    pub value: Value,
    pub op: Option<Operator>,
}

impl Node {
    /// Display name: the variable or operator spelling, `if`/`end` for
    /// conditional plumbing.
    pub(crate) fn label(&self) -> &str {
        match &self.value {
            Value::Str(s) => s,
            _ => "",
        }
    }

    pub(crate) fn label_arc(&self) -> Arc<str> {
        match &self.value {
            Value::Str(s) => s.clone(),
            other => Arc::from(other.to_string().as_str()),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("sc", &self.sc)
            .field("child_cnt", &self.child_cnt)
            .field("child_idx", &self.child_idx)
            .field("sel_key", &self.sel_key)
            .field("value", &self.value)
            .field("op", &self.op.as_ref().map(|_| "<operator>"))
            .finish()
    }
}

/// A compiled expression: the node table plus the tables driving evaluation
/// and short-circuit rewinds.
pub struct Expr {
    pub(crate) nodes: Vec<Node>,
    /// Parent index per node, `-1` for the root. A conditional's join node
    /// records the conditional's parent (the watermark reset target).
    pub(crate) parent_idx: Vec<i16>,
    /// Short-circuit rewind target per node; `0` means the expression's
    /// result is final.
    pub(crate) sc_target: Vec<u16>,
    /// Frame-stack depth (counting the node itself) at the node's first pop.
    pub(crate) sf_size: Vec<u16>,
    /// Operand-stack depth at the node's first pop.
    pub(crate) os_size: Vec<u16>,
    /// Upper bound on either stack's depth during one evaluation.
    pub(crate) max_stack_size: u16,
}

impl Expr {
    /// Number of nodes in the table (shadow nodes included when compiled
    /// with tracing).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Upper bound on the working stack depths for one evaluation.
    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size as usize
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Expr {{")?;
        writeln!(f, "  max_stack_size: {}", self.max_stack_size)?;
        writeln!(f, "  nodes: [")?;
        for (i, n) in self.nodes.iter().enumerate() {
            writeln!(
                f,
                "    {:3}  {:<12} {:<10} children[{}..{}) parent:{:3} sc:{}{} target:{:3} sf:{} os:{}",
                i,
                format!("{:?}", n.kind),
                n.label(),
                n.child_idx,
                n.child_idx as usize + n.child_cnt as usize,
                self.parent_idx[i],
                if n.sc.if_false { "F" } else { "-" },
                if n.sc.if_true { "T" } else { "-" },
                self.sc_target[i],
                self.sf_size[i],
                self.os_size[i],
            )?;
        }
        writeln!(f, "  ]")?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn compiled_expressions_are_shareable() {
        assert_send_sync::<Expr>();
    }

    #[test]
    fn sc_flags_trigger_on_matching_truth() {
        let sc = ScFlags {
            if_false: true,
            if_true: false,
        };
        assert!(sc.triggers(false));
        assert!(!sc.triggers(true));
        assert!(ScFlags::default().is_empty());
    }
}
