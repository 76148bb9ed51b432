//! Compile error types.
//!
//! One error aborts the pass: every fallible operation returns
//! `Result<_, CompileError>` and the first failure propagates with `?`
//! straight out of the parser. The listing trailer prints the message via
//! `Display`, prefixed with the source line in effect when the failing
//! token was scanned.

/// Error raised anywhere in the compilation pass.
///
/// The variant tells which component rejected the input; `Display` yields
/// the bare message as it appears in the listing after `Error: Line <n>: `.
#[derive(Debug)]
pub enum CompileError {
    /// Malformed character stream (illegal symbol, bad comment, ...)
    Lexical(String),
    /// A grammar production did not find the token it required
    Syntax(String),
    /// Undefined or doubly-defined name, or a keyword used as one
    Name(String),
    /// Operand types rejected by an emitter
    Type(String),
    /// Symbol table is full
    TableOverflow,
    /// A compiler invariant broke (e.g. temp counter underflow)
    Internal(String),
    /// Reading the source file failed
    Io(std::io::Error),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lexical(msg)
            | CompileError::Syntax(msg)
            | CompileError::Name(msg)
            | CompileError::Type(msg)
            | CompileError::Internal(msg) => write!(f, "{}", msg),
            CompileError::TableOverflow => write!(f, "symbol table overflow"),
            CompileError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e)
    }
}

impl From<std::fmt::Error> for CompileError {
    fn from(e: std::fmt::Error) -> Self {
        CompileError::Internal(format!("object text formatting error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_message() {
        let err = CompileError::Syntax("semicolon expected".to_string());
        assert_eq!(err.to_string(), "semicolon expected");

        let err = CompileError::TableOverflow;
        assert_eq!(err.to_string(), "symbol table overflow");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CompileError = io.into();
        assert!(matches!(err, CompileError::Io(_)));
        assert!(err.to_string().contains("no such file"));
    }
}
