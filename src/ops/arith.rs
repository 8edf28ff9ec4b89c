//! Integer arithmetic. Wrapping semantics on overflow; division and
//! remainder by zero are reported as operator errors.

use crate::context::Ctx;
use crate::value::Value;
use crate::DynError;

use super::operand_kinds;

pub(super) fn add(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a.wrapping_add(*b))),
        // `+` doubles as string concatenation.
        [Value::Str(a), Value::Str(b)] => Ok(Value::Str(format!("{}{}", a, b).into())),
        _ => Err(format!(
            "'+' expects two ints or two strings, got {}",
            operand_kinds(params)
        )
        .into()),
    }
}

pub(super) fn sub(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a.wrapping_sub(*b))),
        _ => Err(format!("'-' expects two ints, got {}", operand_kinds(params)).into()),
    }
}

pub(super) fn mul(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a.wrapping_mul(*b))),
        _ => Err(format!("'*' expects two ints, got {}", operand_kinds(params)).into()),
    }
}

pub(super) fn div(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Int(_), Value::Int(0)] => Err("division by zero".into()),
        // wrapping_div handles i64::MIN / -1.
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a.wrapping_div(*b))),
        _ => Err(format!("'/' expects two ints, got {}", operand_kinds(params)).into()),
    }
}

pub(super) fn rem(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Int(_), Value::Int(0)] => Err("remainder by zero".into()),
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a.wrapping_rem(*b))),
        _ => Err(format!("'%' expects two ints, got {}", operand_kinds(params)).into()),
    }
}

pub(super) fn neg(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [Value::Int(a)] => Ok(Value::Int(a.wrapping_neg())),
        _ => Err(format!("unary '-' expects an int, got {}", operand_kinds(params)).into()),
    }
}
