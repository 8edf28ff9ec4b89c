//! Runtime values and the numeric unification applied to context results.
//!
//! The engine works over a small set of *canonical* kinds: booleans, 64-bit
//! signed integers, strings, integer sequences and string sequences. A
//! [`Selector`](crate::Selector) may additionally hand back wall-clock times
//! and durations; [`unify`] normalizes those to their integer second values
//! before the machine ever sees them. Narrower integer types never exist as
//! variants at all: the `From` conversions widen them on construction.
//!
//! Compound variants are `Arc`-backed so that cloning a value (constants are
//! cloned out of the node table on every evaluation) is a reference-count
//! bump, not a deep copy.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer. All narrower integers widen to this on
    /// construction.
    Int(i64),
    /// String value.
    Str(Arc<str>),
    /// Ordered sequence of 64-bit signed integers.
    IntList(Arc<[i64]>),
    /// Ordered sequence of strings.
    StrList(Arc<[String]>),
    /// Wall-clock time, as a context may return it. Normalized to its Unix
    /// second by [`unify`].
    Time(SystemTime),
    /// Duration, as a context may return it. Normalized to whole seconds by
    /// [`unify`].
    Duration(Duration),
}

impl Value {
    /// Whether this value is one of the canonical kinds the machine
    /// operates on directly.
    pub fn is_canonical(&self) -> bool {
        !matches!(self, Value::Time(_) | Value::Duration(_))
    }

    /// Human-readable kind name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::IntList(_) => "int list",
            Value::StrList(_) => "string list",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
        }
    }

    /// Extract a boolean, or `None` if the value is another kind.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an integer, or `None` if the value is another kind.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract a string slice, or `None` if the value is another kind.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Normalize a context-supplied value to a canonical kind.
///
/// Times collapse to their Unix second, durations to whole seconds
/// (truncating toward zero). Canonical kinds pass through untouched, which
/// makes the function idempotent.
pub fn unify(value: Value) -> Value {
    match value {
        Value::Time(t) => Value::Int(unix_seconds(t)),
        Value::Duration(d) => Value::Int(d.as_secs() as i64),
        other => other,
    }
}

fn unix_seconds(t: SystemTime) -> i64 {
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        // Pre-epoch times count backwards.
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::IntList(items) => {
                write!(f, "[")?;
                for (i, n) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", n)?;
                }
                write!(f, "]")
            }
            Value::StrList(items) => {
                write!(f, "[")?;
                for (i, s) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", s)?;
                }
                write!(f, "]")
            }
            Value::Time(t) => write!(f, "{}", unix_seconds(*t)),
            Value::Duration(d) => write!(f, "{}s", d.as_secs()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

macro_rules! widen_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

widen_int!(i8, i16, i32, u8, u16, u32);

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Arc::from(v.as_str()))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntList(v.into())
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntList(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<isize>> for Value {
    fn from(v: Vec<isize>) -> Self {
        Value::IntList(v.into_iter().map(|n| n as i64).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StrList(v.into())
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::StrList(v.into_iter().map(str::to_owned).collect())
    }
}

impl From<SystemTime> for Value {
    fn from(v: SystemTime) -> Self {
        Value::Time(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}
