//! Configuration options for the engine.

/// Configuration for compilation and evaluation behavior.
///
/// # Example
///
/// ```
/// use verdict::EngineOptions;
///
/// let options = EngineOptions {
///     constant_folding: false,
///     ..EngineOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Reduce pure literal subexpressions at compile time.
    ///
    /// Default: `true`
    pub constant_folding: bool,

    /// Compile a shadow table that prints both machine stacks after every
    /// step. Strictly diagnostic: results and operator invocation order are
    /// unchanged.
    ///
    /// Default: `false`
    pub debug_trace: bool,

    /// Assign fresh selector keys to variables the engine never registered.
    /// Turn off to make typos compile errors when the full variable set is
    /// known up front.
    ///
    /// Default: `true`
    pub allow_undeclared_selectors: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            constant_folding: true,
            debug_trace: false,
            allow_undeclared_selectors: true,
        }
    }
}
