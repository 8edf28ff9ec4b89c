//! The public error type unifying the compilation and evaluation layers.

use std::fmt;

use crate::compiler::CompileError;
use crate::evaluator::EvalError;

/// Any failure from the one-shot entry points.
#[derive(Debug)]
pub enum Error {
    Compile(CompileError),
    Eval(EvalError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile(err) => write!(f, "compile error: {}", err),
            Error::Eval(err) => write!(f, "evaluation error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Compile(err) => Some(err),
            Error::Eval(err) => Some(err),
        }
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Error::Compile(err)
    }
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        Error::Eval(err)
    }
}
