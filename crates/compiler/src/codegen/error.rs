//! Code generation error types.

/// Error type for code generation operations.
///
/// `Compile` carries a semantic error detected while lowering (undefined
/// variable, arity mismatch, ...); `Format` wraps a write failure from the
/// assembly formatter so everything propagates with `?`.
#[derive(Debug)]
pub enum CodeGenError {
    /// A semantic error in the program being compiled.
    Compile(String),
    /// A formatting error while writing assembly text.
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Compile(s) => write!(f, "{}", s),
            CodeGenError::Format(e) => write!(f, "assembly generation error: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<String> for CodeGenError {
    fn from(s: String) -> Self {
        CodeGenError::Compile(s)
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}
