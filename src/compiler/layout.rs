//! Lowering the parsed tree into the compact node table.
//!
//! Layout is breadth-first, which yields the two properties evaluation
//! depends on: a node's children occupy one contiguous run, and every child
//! index is strictly greater than its parent's. A conditional contributes
//! four child slots (predicate, then, else, and its join node) with the
//! join's recorded parent being the conditional's parent, so the machine's
//! watermark resets past the whole conditional when the join is consumed.
//!
//! After indices are fixed, two more passes run over the flat table:
//! short-circuit flags and rewind targets for the children of `and`/`or`
//! nodes, and an abstract replay of the machine's push/pop discipline that
//! records the stack depths at every node's first visit.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::api::EngineOptions;
use crate::compiler::CompileError;
use crate::context::SelectorKey;
use crate::ops::{Operator, OperatorRegistry};
use crate::parser::{BinaryOp, Expr as Ast, Literal};
use crate::program::{Expr, Node, NodeKind, ScFlags};
use crate::value::Value;

/// Boolean connectives whose children may short-circuit their ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    And,
    Or,
}

struct TreeNode {
    kind: NodeKind,
    value: Value,
    sel_key: Option<SelectorKey>,
    op: Option<Operator>,
    gate: Option<Gate>,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(kind: NodeKind, value: Value, sel_key: Option<SelectorKey>) -> Self {
        Self {
            kind,
            value,
            sel_key,
            op: None,
            gate: None,
            children: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Constant | NodeKind::Selector)
    }
}

pub(crate) fn build(
    registry: &OperatorRegistry,
    keys: &HashMap<String, SelectorKey>,
    options: &EngineOptions,
    ast: &Ast<'_>,
) -> Result<Expr, CompileError> {
    let mut lowering = Lowering {
        registry,
        keys,
        allow_undeclared: options.allow_undeclared_selectors,
        auto_keys: HashMap::new(),
    };
    let root = lowering.lower(ast)?;
    let plain = assemble(&root)?;
    if options.debug_trace {
        Ok(shadow(plain))
    } else {
        Ok(plain)
    }
}

struct Lowering<'c> {
    registry: &'c OperatorRegistry,
    keys: &'c HashMap<String, SelectorKey>,
    allow_undeclared: bool,
    /// Keys assigned during this compilation for variables the engine never
    /// registered. Only meaningful to name-keyed selectors.
    auto_keys: HashMap<String, SelectorKey>,
}

impl Lowering<'_> {
    fn lower(&mut self, ast: &Ast<'_>) -> Result<TreeNode, CompileError> {
        match ast {
            Ast::Literal(lit) => Ok(TreeNode::leaf(
                NodeKind::Constant,
                literal_value(lit),
                None,
            )),

            Ast::Ident(name) => self.selector(name),

            Ast::List(elements) => list_constant(elements),

            Ast::Unary { op, operand } => {
                let children = vec![self.lower(operand)?];
                self.operator(op.symbol(), children, None)
            }

            Ast::Binary { op, left, right } => {
                let children = vec![self.lower(left)?, self.lower(right)?];
                let gate = match op {
                    BinaryOp::And => Some(Gate::And),
                    BinaryOp::Or => Some(Gate::Or),
                    _ => None,
                };
                self.operator(op.symbol(), children, gate)
            }

            Ast::Call { name, args } => {
                if *name == "if" {
                    if args.len() != 3 {
                        return Err(CompileError::BadArity {
                            operator: "if".to_owned(),
                            expected: 3,
                            got: args.len(),
                        });
                    }
                    let mut children = Vec::with_capacity(4);
                    for arg in args.iter() {
                        children.push(self.lower(arg)?);
                    }
                    children.push(TreeNode::leaf(
                        NodeKind::End,
                        Value::Str(Arc::from("end")),
                        None,
                    ));
                    return Ok(TreeNode {
                        kind: NodeKind::Cond,
                        value: Value::Str(Arc::from("if")),
                        sel_key: None,
                        op: None,
                        gate: None,
                        children,
                    });
                }

                let mut children = Vec::with_capacity(args.len());
                for arg in args.iter() {
                    children.push(self.lower(arg)?);
                }
                self.operator(name, children, None)
            }
        }
    }

    fn selector(&mut self, name: &str) -> Result<TreeNode, CompileError> {
        let key = if let Some(k) = self.keys.get(name) {
            *k
        } else if let Some(k) = self.auto_keys.get(name) {
            *k
        } else if self.allow_undeclared {
            let k = SelectorKey((self.keys.len() + self.auto_keys.len()) as u16);
            self.auto_keys.insert(name.to_owned(), k);
            k
        } else {
            return Err(CompileError::UnknownSelector {
                name: name.to_owned(),
            });
        };
        Ok(TreeNode::leaf(
            NodeKind::Selector,
            Value::Str(Arc::from(name)),
            Some(key),
        ))
    }

    fn operator(
        &self,
        name: &str,
        children: Vec<TreeNode>,
        gate: Option<Gate>,
    ) -> Result<TreeNode, CompileError> {
        let op = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownOperator {
                name: name.to_owned(),
            })?;
        // Connectives stay on the two-phase path so their operands can
        // short-circuit; everything else with leaf-only children skips the
        // stacks entirely.
        let kind = if gate.is_none() && children.iter().all(TreeNode::is_leaf) {
            NodeKind::FastOperator
        } else {
            NodeKind::Operator
        };
        Ok(TreeNode {
            kind,
            value: Value::Str(Arc::from(name)),
            sel_key: None,
            op: Some(op),
            gate,
            children,
        })
    }
}

fn literal_value(lit: &Literal<'_>) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Str(s) => Value::Str(Arc::from(*s)),
        Literal::Bool(b) => Value::Bool(*b),
    }
}

fn list_constant(elements: &[&Ast<'_>]) -> Result<TreeNode, CompileError> {
    let mut ints: Vec<i64> = Vec::new();
    let mut strs: Vec<String> = Vec::new();
    for element in elements {
        match element {
            Ast::Literal(Literal::Int(n)) => ints.push(*n),
            Ast::Literal(Literal::Str(s)) => strs.push((*s).to_owned()),
            _ => {
                return Err(CompileError::ListNotConstant {
                    detail: "found a non-literal element".to_owned(),
                })
            }
        }
    }
    if !ints.is_empty() && !strs.is_empty() {
        return Err(CompileError::ListNotConstant {
            detail: "mixed int and string elements".to_owned(),
        });
    }
    let value = if strs.is_empty() {
        Value::IntList(ints.into())
    } else {
        Value::StrList(strs.into())
    };
    Ok(TreeNode::leaf(NodeKind::Constant, value, None))
}

/// Breadth-first index assignment plus the flag and depth passes.
fn assemble(root: &TreeNode) -> Result<Expr, CompileError> {
    // The output order doubles as the BFS queue.
    let mut items: Vec<(&TreeNode, i16)> = vec![(root, -1)];
    let mut child_of: Vec<u16> = Vec::new();
    let mut head = 0;
    while head < items.len() {
        let (node, node_parent) = items[head];
        if node.children.len() > usize::from(u8::MAX) {
            return Err(CompileError::TooLarge {
                nodes: node.children.len(),
            });
        }
        child_of.push(if node.children.is_empty() {
            0
        } else {
            items.len() as u16
        });
        for child in &node.children {
            // The join node resumes the conditional's parent, not the
            // conditional itself.
            let parent = if child.kind == NodeKind::End {
                node_parent
            } else {
                head as i16
            };
            items.push((child, parent));
        }
        head += 1;
    }

    let n = items.len();
    // Half the i16 range so a trace-enabled table still fits.
    if n > i16::MAX as usize / 2 {
        return Err(CompileError::TooLarge { nodes: n });
    }

    let mut nodes: Vec<Node> = Vec::with_capacity(n);
    let mut parent_idx: Vec<i16> = Vec::with_capacity(n);
    let mut gates: Vec<Option<Gate>> = Vec::with_capacity(n);
    for (i, (t, p)) in items.iter().enumerate() {
        nodes.push(Node {
            kind: t.kind,
            sc: ScFlags::default(),
            child_cnt: t.children.len() as u8,
            child_idx: child_of[i],
            sel_key: t.sel_key,
            value: t.value.clone(),
            op: t.op.clone(),
        });
        parent_idx.push(*p);
        gates.push(t.gate);
    }

    // Short-circuit flags: each child of a connective can collapse it. A
    // conditional's value is produced by its join node, so the flags go
    // there. Target 0 doubles as "the expression is done", since the root's
    // result is the final result.
    let mut sc_target = vec![0u16; n];
    for i in 0..n {
        let Some(gate) = gates[i] else { continue };
        let target = i as u16; // the root is index 0
        let first = nodes[i].child_idx as usize;
        for c in first..first + nodes[i].child_cnt as usize {
            let holder = if nodes[c].kind == NodeKind::Cond {
                nodes[c].child_idx as usize + nodes[c].child_cnt as usize - 1
            } else {
                c
            };
            // A node has one parent, so one connective at most flags it.
            debug_assert!(nodes[holder].sc.is_empty());
            match gate {
                Gate::And => nodes[holder].sc.if_false = true,
                Gate::Or => nodes[holder].sc.if_true = true,
            }
            sc_target[holder] = target;
        }
    }

    let mut sf_size = vec![0u16; n];
    let mut os_size = vec![0u16; n];
    let mut depths = Depths {
        nodes: &nodes,
        sf_size: &mut sf_size,
        os_size: &mut os_size,
        max_sf: 0,
        max_os: 0,
    };
    depths.measure(0, 1, 0);
    let max_stack_size = depths.max_sf.max(depths.max_os);

    Ok(Expr {
        nodes,
        parent_idx,
        sc_target,
        sf_size,
        os_size,
        max_stack_size,
    })
}

/// Abstract replay of the machine's stack discipline. `sf` counts the node
/// itself on top of the frame stack at its first pop; `os` is the operand
/// depth at the same moment. Both conditional branches are walked; they
/// start and end at identical depths.
struct Depths<'a> {
    nodes: &'a [Node],
    sf_size: &'a mut [u16],
    os_size: &'a mut [u16],
    max_sf: u16,
    max_os: u16,
}

impl Depths<'_> {
    fn measure(&mut self, i: usize, sf: u16, os: u16) {
        self.sf_size[i] = sf;
        self.os_size[i] = os;
        self.max_sf = self.max_sf.max(sf);

        let node = &self.nodes[i];
        let ci = node.child_idx as usize;
        match node.kind {
            NodeKind::Constant | NodeKind::Selector | NodeKind::FastOperator | NodeKind::End => {}
            NodeKind::Operator => {
                let cnt = u16::from(node.child_cnt);
                for j in 0..cnt {
                    self.measure(ci + j as usize, sf + cnt - j, os + j);
                }
            }
            NodeKind::Cond => {
                // First visit queues [join, self, predicate]; the second
                // visit swaps in one branch at the predicate's expense.
                self.measure(ci, sf + 2, os);
                self.measure(ci + 1, sf + 1, os);
                self.measure(ci + 2, sf + 1, os);
                self.measure(ci + 3, sf, os + 1);
            }
            NodeKind::Debug => unreachable!("shadow nodes are emitted after depth measurement"),
        }

        // Depth after this node pushes its result.
        let completion = if node.kind == NodeKind::End { os } else { os + 1 };
        self.max_os = self.max_os.max(completion);
    }
}

/// Double the table for trace mode: shadows in the low half, the real nodes
/// in the high half. Child links keep pointing at the low half so every node
/// prints before it executes; parent links, rewind targets and the depth
/// tables move to the high half with the real nodes.
fn shadow(plain: Expr) -> Expr {
    let m = plain.nodes.len();

    let mut nodes: Vec<Node> = Vec::with_capacity(2 * m);
    for n in &plain.nodes {
        nodes.push(Node {
            kind: NodeKind::Debug,
            sc: ScFlags::default(),
            child_cnt: 0,
            child_idx: 0,
            sel_key: None,
            value: n.value.clone(),
            op: None,
        });
    }
    nodes.extend(plain.nodes);

    let mut parent_idx = vec![-1i16; m];
    parent_idx.extend(
        plain
            .parent_idx
            .iter()
            .map(|p| if *p < 0 { -1 } else { p + m as i16 }),
    );

    let mut sc_target = vec![0u16; m];
    sc_target.extend(
        plain
            .sc_target
            .iter()
            .map(|t| if *t == 0 { 0 } else { t + m as u16 }),
    );

    let mut sf_size = vec![0u16; m];
    sf_size.extend(&plain.sf_size);
    let mut os_size = vec![0u16; m];
    os_size.extend(&plain.os_size);

    Expr {
        nodes,
        parent_idx,
        sc_target,
        sf_size,
        os_size,
        max_stack_size: plain.max_stack_size,
    }
}
