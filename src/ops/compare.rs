//! Comparisons. Ordering is defined for ints and strings; equality for any
//! pair of values of the same kind.

use crate::context::Ctx;
use crate::value::Value;
use crate::DynError;

use super::operand_kinds;

macro_rules! ordering_op {
    ($name:ident, $sym:literal, $op:tt) => {
        pub(super) fn $name(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
            match params {
                [Value::Int(a), Value::Int(b)] => Ok(Value::Bool(a $op b)),
                [Value::Str(a), Value::Str(b)] => Ok(Value::Bool(a $op b)),
                _ => Err(format!(
                    concat!("'", $sym, "' expects two ints or two strings, got {}"),
                    operand_kinds(params)
                )
                .into()),
            }
        }
    };
}

ordering_op!(lt, "<", <);
ordering_op!(le, "<=", <=);
ordering_op!(gt, ">", >);
ordering_op!(ge, ">=", >=);

pub(super) fn eq(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [a, b] => Ok(Value::Bool(a == b)),
        _ => Err(format!("'==' expects two operands, got {}", params.len()).into()),
    }
}

pub(super) fn ne(_ctx: &Ctx<'_>, params: &[Value]) -> Result<Value, DynError> {
    match params {
        [a, b] => Ok(Value::Bool(a != b)),
        _ => Err(format!("'!=' expects two operands, got {}", params.len()).into()),
    }
}
