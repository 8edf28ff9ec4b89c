//! Membership over the sequence kinds.

use crate::context::Ctx;
use crate::value::Value;
use crate::DynError;

use super::operand_kinds;

pub(super) fn contains(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Int(n), Value::IntList(items)] => Ok(Value::Bool(items.contains(n))),
        [Value::Str(s), Value::StrList(items)] => {
            Ok(Value::Bool(items.iter().any(|item| item == s.as_ref())))
        }
        _ => Err(format!(
            "'in' expects an int against an int list or a string against a string list, got {}",
            operand_kinds(params)
        )
        .into()),
    }
}
