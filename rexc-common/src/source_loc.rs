//! Source location tracking for error reporting
//!
//! Every IR node and every diagnostic carries a location so that errors
//! found long after parsing can still point back at the source line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a source file (line and column are 1-based)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// Create a location with filename
    pub fn new(filename: &str, line: u32, column: u32) -> Self {
        Self {
            filename: filename.to_string(),
            line,
            column,
        }
    }

    /// Location for nodes with no meaningful source position
    /// (builder-synthesized operations, tests).
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let loc = SourceLocation::new("test.rex", 3, 14);
        assert_eq!(loc.to_string(), "test.rex:3:14");
    }

    #[test]
    fn test_unknown() {
        let loc = SourceLocation::unknown();
        assert_eq!(loc.filename, "<unknown>");
        assert_eq!(loc.line, 0);
    }
}
