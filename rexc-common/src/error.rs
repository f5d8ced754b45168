//! Error handling for the REX compiler
//!
//! One error type covers every phase: reading input, lexing/parsing,
//! IR generation, and structural verification. Errors are structured
//! values (kind + message + location where one exists), never silent
//! truncation of the output.

use crate::source_loc::SourceLocation;
use thiserror::Error;

/// Main compiler error type that encompasses all phases of compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Lexical error at {location}: {message}")]
    LexError {
        location: SourceLocation,
        message: String,
    },

    #[error("Parse error at {location}: {message}")]
    ParseError {
        location: SourceLocation,
        message: String,
    },

    #[error("Unbound identifier at {location}: {message}")]
    UnboundIdentifier {
        location: SourceLocation,
        message: String,
    },

    #[error("Unsupported construct at {location}: {message}")]
    UnsupportedConstruct {
        location: SourceLocation,
        message: String,
    },

    #[error("Dominance violation at {location}: {message}")]
    DominanceViolation {
        location: SourceLocation,
        message: String,
    },

    #[error("Verification error at {location}: {message}")]
    VerificationError {
        location: SourceLocation,
        message: String,
    },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompilerError {
    /// Create a lexer error
    pub fn lex_error(message: String, location: SourceLocation) -> Self {
        CompilerError::LexError { location, message }
    }

    /// Create a parse error
    pub fn parse_error(message: String, location: SourceLocation) -> Self {
        CompilerError::ParseError { location, message }
    }

    /// Create an unbound-identifier error
    pub fn unbound(message: String, location: SourceLocation) -> Self {
        CompilerError::UnboundIdentifier { location, message }
    }

    /// Create an unsupported-construct error
    pub fn unsupported(message: String, location: SourceLocation) -> Self {
        CompilerError::UnsupportedConstruct { location, message }
    }

    /// Create a dominance-violation error
    pub fn dominance(message: String, location: SourceLocation) -> Self {
        CompilerError::DominanceViolation { location, message }
    }

    /// Create a verification error
    pub fn verification(message: String, location: SourceLocation) -> Self {
        CompilerError::VerificationError { location, message }
    }

    /// The source location the error points at, if it has one.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            CompilerError::IoError { .. } | CompilerError::InternalError { .. } => None,
            CompilerError::LexError { location, .. }
            | CompilerError::ParseError { location, .. }
            | CompilerError::UnboundIdentifier { location, .. }
            | CompilerError::UnsupportedConstruct { location, .. }
            | CompilerError::DominanceViolation { location, .. }
            | CompilerError::VerificationError { location, .. } => Some(location),
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompilerError::dominance(
            "operand %3 does not dominate its use".to_string(),
            SourceLocation::new("test.rex", 4, 9),
        );
        assert_eq!(
            err.to_string(),
            "Dominance violation at test.rex:4:9: operand %3 does not dominate its use"
        );
    }

    #[test]
    fn test_error_location() {
        let loc = SourceLocation::new("a.rex", 1, 2);
        let err = CompilerError::verification("bad call".to_string(), loc.clone());
        assert_eq!(err.location(), Some(&loc));

        let io: CompilerError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.location(), None);
    }
}
