//! Runtime evaluation errors.
//!
//! Every failure propagates immediately; the machine performs no local
//! recovery and never retries. Selector and operator failures wrap the
//! underlying error together with the failing node's name.

use std::fmt;
use std::sync::Arc;

use crate::DynError;

/// Runtime evaluation error.
#[derive(Debug)]
pub enum EvalError {
    /// The context returned an error while resolving a variable.
    Selector { name: Arc<str>, source: DynError },

    /// An operator implementation returned an error.
    Operator { operator: Arc<str>, source: DynError },

    /// A conditional predicate, or a result requested as boolean, had the
    /// wrong kind.
    TypeMismatch { expected: &'static str, got: String },

    /// The context's cancellation token tripped between nodes.
    Cancelled,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Selector { name, source } => {
                write!(f, "selector '{}' failed: {}", name, source)
            }
            EvalError::Operator { operator, source } => {
                write!(f, "operator '{}' failed: {}", operator, source)
            }
            EvalError::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {}, got {}", expected, got)
            }
            EvalError::Cancelled => write!(f, "evaluation cancelled"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Selector { source, .. } | EvalError::Operator { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}
