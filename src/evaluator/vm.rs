//! The dispatch loop.

use std::fmt::Write as _;

use crate::context::Ctx;
use crate::evaluator::EvalError;
use crate::program::{Expr, Node, NodeKind};
use crate::value::{unify, Value};

impl Expr {
    /// Evaluate the compiled expression against one context.
    pub fn eval(&self, ctx: &Ctx<'_>) -> Result<Value, EvalError> {
        let size = self.max_stack_size as usize;
        // Small programs share a couple of round sizes to keep the
        // allocator out of the way.
        let cap = if size <= 8 {
            8
        } else if size <= 16 {
            16
        } else {
            size
        };

        let mut sf: Vec<u16> = Vec::with_capacity(cap); // stack frame
        let mut os: Vec<Value> = Vec::with_capacity(cap); // operand stack

        // Highest node index entered so far. A popped index above the
        // watermark is being seen for the first time.
        let mut max_idx: i32 = -1;
        let mut sc_triggered = false;

        // Root node.
        sf.push(0);

        while let Some(mut cur_idx) = sf.pop() {
            if ctx.is_cancelled() {
                return Err(EvalError::Cancelled);
            }
            debug_assert!(sf.len() < self.max_stack_size as usize);
            debug_assert!(os.len() <= self.max_stack_size as usize);

            let mut cur = &self.nodes[cur_idx as usize];

            let res: Value = match cur.kind {
                NodeKind::FastOperator => {
                    let cnt = cur.child_cnt as usize;
                    let ci = cur.child_idx as usize;
                    if cnt == 2 {
                        let params = [
                            self.leaf_value(ctx, &self.nodes[ci])?,
                            self.leaf_value(ctx, &self.nodes[ci + 1])?,
                        ];
                        self.invoke(ctx, cur, &params)?
                    } else {
                        let mut params = Vec::with_capacity(cnt);
                        for k in ci..ci + cnt {
                            params.push(self.leaf_value(ctx, &self.nodes[k])?);
                        }
                        self.invoke(ctx, cur, &params)?
                    }
                }

                NodeKind::Operator => {
                    let cnt = cur.child_cnt as usize;
                    if i32::from(cur_idx) > max_idx {
                        // First visit: re-queue the node, then its children
                        // in reverse so the leftmost runs first.
                        max_idx = i32::from(cur_idx);
                        sf.push(cur_idx);
                        for k in (0..cur.child_cnt as u16).rev() {
                            sf.push(cur.child_idx + k);
                        }
                        continue;
                    }

                    // Second visit: the children's results sit on top of the
                    // operand stack in child order.
                    max_idx = i32::from(cur_idx);
                    if cnt == 2 {
                        let b = os.pop().expect("operand stack underflow");
                        let a = os.pop().expect("operand stack underflow");
                        self.invoke(ctx, cur, &[a, b])?
                    } else {
                        let params = os.split_off(os.len() - cnt);
                        self.invoke(ctx, cur, &params)?
                    }
                }

                NodeKind::Selector => self.selector_value(ctx, cur)?,

                NodeKind::Constant => cur.value.clone(),

                NodeKind::Cond => {
                    let ci = cur.child_idx;
                    if i32::from(cur_idx) > max_idx {
                        // Queue the join node, the conditional itself, then
                        // the predicate.
                        max_idx = i32::from(cur_idx);
                        sf.push(ci + u16::from(cur.child_cnt) - 1);
                        sf.push(cur_idx);
                        sf.push(ci);
                    } else {
                        match os.pop().expect("operand stack underflow") {
                            Value::Bool(true) => sf.push(ci + 1),
                            Value::Bool(false) => sf.push(ci + 2),
                            other => {
                                return Err(EvalError::TypeMismatch {
                                    expected: "bool",
                                    got: other.type_name().to_owned(),
                                })
                            }
                        }
                        // The selected branch produces the value.
                    }
                    continue;
                }

                NodeKind::End => {
                    // Reset the watermark to the conditional's parent so it
                    // re-enters correctly; adopt the branch result.
                    max_idx = i32::from(self.parent_idx[cur_idx as usize]);
                    os.pop().expect("operand stack underflow")
                }

                NodeKind::Debug => {
                    let offset = (self.nodes.len() / 2) as u16;
                    // Pending real entries revert to their shadows so every
                    // step gets printed.
                    for entry in sf.iter_mut() {
                        if *entry >= offset {
                            *entry -= offset;
                        }
                    }
                    sf.push(cur_idx + offset);
                    self.print_stacks(sc_triggered, max_idx, offset, &os, &sf);
                    sc_triggered = false;
                    continue;
                }
            };

            // A boolean result may collapse a chain of pending ancestors:
            // restore both stacks to the precomputed depths at the target
            // and re-test the target's own flags.
            if let Value::Bool(b) = res {
                while cur.sc.triggers(b) {
                    let target = self.sc_target[cur_idx as usize];
                    if target == 0 {
                        return Ok(res);
                    }
                    sc_triggered = true;
                    max_idx = i32::from(target);
                    sf.truncate(self.sf_size[target as usize] as usize - 1);
                    os.truncate(self.os_size[target as usize] as usize);
                    cur_idx = target;
                    cur = &self.nodes[cur_idx as usize];
                }
            }

            os.push(res);
        }

        Ok(os.pop().expect("operand stack holds the result"))
    }

    /// Evaluate and require a boolean result.
    pub fn eval_bool(&self, ctx: &Ctx<'_>) -> Result<bool, EvalError> {
        match self.eval(ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::TypeMismatch {
                expected: "bool",
                got: other.type_name().to_owned(),
            }),
        }
    }

    /// Value of a leaf consumed inline by a fast operator.
    fn leaf_value(&self, ctx: &Ctx<'_>, n: &Node) -> Result<Value, EvalError> {
        match n.kind {
            NodeKind::Constant => Ok(n.value.clone()),
            _ => self.selector_value(ctx, n),
        }
    }

    fn selector_value(&self, ctx: &Ctx<'_>, n: &Node) -> Result<Value, EvalError> {
        let key = n.sel_key.expect("selector node carries a key");
        let name = n.label();
        let value = ctx.get(key, name).map_err(|source| EvalError::Selector {
            name: n.label_arc(),
            source,
        })?;
        if value.is_canonical() {
            Ok(value)
        } else {
            Ok(unify(value))
        }
    }

    fn invoke(&self, ctx: &Ctx<'_>, n: &Node, params: &[Value]) -> Result<Value, EvalError> {
        let op = n.op.as_ref().expect("operator node carries an implementation");
        op(ctx, params).map_err(|source| EvalError::Operator {
            operator: n.label_arc(),
            source,
        })
    }

    /// Trace-mode rendering of the machine state, one block per step.
    fn print_stacks(&self, sc_triggered: bool, max_idx: i32, offset: u16, os: &[Value], sf: &[u16]) {
        let mut out = String::new();
        if sc_triggered {
            let _ = writeln!(out, "short circuit triggered\n");
        }
        let shown_max = if max_idx >= i32::from(offset) {
            max_idx - i32::from(offset)
        } else {
            max_idx
        };
        let _ = writeln!(
            out,
            "maxIdx:{}, sfTop:{}, osTop:{}",
            shown_max,
            sf.len() as i64 - 1,
            os.len() as i64 - 1
        );

        let _ = write!(out, "{:>15}", "Stack Frame: ");
        for idx in sf.iter().rev() {
            let _ = write!(out, "|{:>4}", self.nodes[*idx as usize].value.to_string());
        }
        let _ = writeln!(out, "|");

        let _ = write!(out, "{:>15}", "Operand Stack: ");
        for v in os.iter().rev() {
            let _ = write!(out, "|{:>4}", v.to_string());
        }
        let _ = writeln!(out, "|");

        println!("{}", out);
    }
}
