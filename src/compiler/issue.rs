//! Diagnostics
//!
//! Non-fatal issues collected across compilation stages. Every stage keeps
//! producing best-effort output after recording an issue; nothing here
//! aborts a compilation.

use snafu::Snafu;

/// Severity class of an [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Malformed characters or token sequences (scanner and parser).
    Syntax,
    /// Scope violations: redeclarations and undefined references.
    Semantic,
}

/// A diagnostic recorded by the scanner or the syntax/IR builder.
///
/// Issues are ordered by discovery and rendered with [`Display`] for the
/// external front ends; lines and columns are 1-based.
///
/// [`Display`]: std::fmt::Display
#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum Issue {
    /// A character outside the language's alphabet. The scanner skips exactly
    /// one character and resumes.
    #[snafu(display("invalid character '{character}' at line {line}, column {column}"))]
    InvalidCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    /// An integer literal that does not fit the value type.
    #[snafu(display("invalid integer literal '{literal}' at line {line}"))]
    InvalidIntegerLiteral { literal: String, line: usize },
    /// A decimal literal that cannot be represented.
    #[snafu(display("invalid decimal literal '{literal}' at line {line}"))]
    InvalidDecimalLiteral { literal: String, line: usize },
    /// A token no grammar production accepts at this position.
    #[snafu(display("syntax error near '{token}' (line {line})"))]
    UnexpectedToken { token: String, line: usize },
    /// Input ended in the middle of a production.
    #[snafu(display("unexpected end of input"))]
    UnexpectedEof,
    /// A second declaration of the same name within one scope frame.
    #[snafu(display("redeclaration of '{name}' in current scope"))]
    Redeclaration { name: String },
    /// A use of a name no enclosing scope declares.
    #[snafu(display("undefined variable '{name}'"))]
    UndefinedVariable { name: String },
}

impl Issue {
    /// Returns the severity class of this issue.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Issue::InvalidCharacter { .. }
            | Issue::InvalidIntegerLiteral { .. }
            | Issue::InvalidDecimalLiteral { .. }
            | Issue::UnexpectedToken { .. }
            | Issue::UnexpectedEof => Severity::Syntax,
            Issue::Redeclaration { .. } | Issue::UndefinedVariable { .. } => Severity::Semantic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_severity_classes() {
        let syntax = Issue::InvalidCharacter {
            character: '@',
            line: 1,
            column: 3,
        };
        let semantic = Issue::UndefinedVariable { name: "n".into() };

        assert_eq!(syntax.severity(), Severity::Syntax);
        assert_eq!(semantic.severity(), Severity::Semantic);
    }

    #[test]
    fn issue_display_wording() {
        let issue = Issue::Redeclaration { name: "x".into() };
        assert_eq!(issue.to_string(), "redeclaration of 'x' in current scope");

        let issue = Issue::UnexpectedToken {
            token: "else".into(),
            line: 4,
        };
        assert_eq!(issue.to_string(), "syntax error near 'else' (line 4)");
    }
}
