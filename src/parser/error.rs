//! Parse errors.

use std::fmt;

#[derive(Debug)]
pub enum ParseError {
    /// The source did not match the grammar. Carries pest's rendered
    /// diagnostic, which includes the offending location.
    Syntax { message: String },

    /// An integer literal did not fit in 64 bits.
    IntLiteral { literal: String },

    /// A string literal used an escape the language does not define.
    BadEscape { sequence: String },

    /// Call syntax applied to something other than a name, e.g. `(1 + 2)(3)`.
    CallTarget,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax { message } => write!(f, "{}", message),
            ParseError::IntLiteral { literal } => {
                write!(f, "integer literal '{}' does not fit in 64 bits", literal)
            }
            ParseError::BadEscape { sequence } => {
                write!(f, "unknown escape sequence '\\{}'", sequence)
            }
            ParseError::CallTarget => write!(f, "only a name can be called"),
        }
    }
}

impl std::error::Error for ParseError {}
