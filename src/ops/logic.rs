//! Boolean connectives.
//!
//! `and` and `or` are usually short-circuited away by the machine before the
//! implementations here run; they still evaluate honestly when every operand
//! was produced (e.g. with short-circuit flags absent, or under constant
//! folding).

use crate::context::Ctx;
use crate::value::Value;
use crate::DynError;

use super::operand_kinds;

fn bools<'p>(name: &str, params: &'p [Value]) -> Result<impl Iterator<Item = bool> + 'p, DynError> {
    if params.iter().any(|p| !matches!(p, Value::Bool(_))) {
        return Err(format!(
            "'{}' expects bool operands, got {}",
            name,
            operand_kinds(params)
        )
        .into());
    }
    Ok(params.iter().filter_map(Value::as_bool))
}

pub(super) fn and(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    let mut it = bools("and", params)?;
    Ok(Value::Bool(it.all(|b| b)))
}

pub(super) fn or(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    let mut it = bools("or", params)?;
    Ok(Value::Bool(it.any(|b| b)))
}

pub(super) fn not(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Bool(b)] => Ok(Value::Bool(!b)),
        _ => Err(format!("'not' expects one bool, got {}", operand_kinds(params)).into()),
    }
}
