//! Error types for configuration, scanning and declaration extraction
//!
//! Three families, matching how far the failure reaches:
//!
//! - [`ConfigurationError`](crate::config::ConfigurationError): bad setup, raised
//!   by [`Parser::new`](crate::parser::Parser::new) before any file is read.
//! - [`ParseError`]: the scanner cannot structurally continue in a file
//!   (unterminated comment, unbalanced braces, include depth exceeded).
//! - [`MalformedDeclarationError`]: one recognized declaration does not fit the
//!   model; the scanner resynchronizes at the next top-level boundary.
//!
//! Recoverable errors are recorded in the session log; which of them abort a
//! `parse()` call is decided by [`ErrorPolicy`](crate::config::ErrorPolicy).

use crate::config::ConfigurationError;
use crate::model::DeclKind;
use crate::parser::ast::SourceLocation;
use crate::parser::lexer::LexError;
use std::path::PathBuf;
use thiserror::Error;

/// The scanner could not continue past a construct in `file`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}:{}:{}: {reason}", .file.display(), .location.line, .location.column)]
pub struct ParseError {
    pub file: PathBuf,
    pub location: SourceLocation,
    pub reason: String,
}

impl ParseError {
    pub fn new(file: impl Into<PathBuf>, location: SourceLocation, reason: impl Into<String>) -> Self {
        ParseError {
            file: file.into(),
            location,
            reason: reason.into(),
        }
    }

    pub(crate) fn from_lex(file: impl Into<PathBuf>, err: LexError) -> Self {
        ParseError::new(file, err.location, err.message)
    }
}

/// A recognized declaration whose internals do not fit the model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{}:{}:{}: malformed {kind} declaration: {reason}",
    .file.display(),
    .location.line,
    .location.column
)]
pub struct MalformedDeclarationError {
    pub file: PathBuf,
    pub location: SourceLocation,
    pub kind: DeclKind,
    pub reason: String,
}

impl MalformedDeclarationError {
    pub fn new(
        file: impl Into<PathBuf>,
        location: SourceLocation,
        kind: DeclKind,
        reason: impl Into<String>,
    ) -> Self {
        MalformedDeclarationError {
            file: file.into(),
            location,
            kind,
            reason: reason.into(),
        }
    }
}

/// An error kept in the session log after a recoverable failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordedError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Malformed(#[from] MalformedDeclarationError),
}

impl RecordedError {
    pub fn file(&self) -> &std::path::Path {
        match self {
            RecordedError::Parse(e) => &e.file,
            RecordedError::Malformed(e) => &e.file,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            RecordedError::Parse(e) => e.location,
            RecordedError::Malformed(e) => e.location,
        }
    }
}

/// Crate-level error returned by fallible public operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Malformed(#[from] MalformedDeclarationError),
}

impl From<RecordedError> for Error {
    fn from(err: RecordedError) -> Self {
        match err {
            RecordedError::Parse(e) => Error::Parse(e),
            RecordedError::Malformed(e) => Error::Malformed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("api.c", SourceLocation::new(12, 3), "unbalanced '{'");
        assert_eq!(err.to_string(), "api.c:12:3: unbalanced '{'");
    }

    #[test]
    fn test_malformed_display() {
        let err = MalformedDeclarationError::new(
            "api.c",
            SourceLocation::new(4, 1),
            DeclKind::Function,
            "expected parameter type",
        );
        assert_eq!(
            err.to_string(),
            "api.c:4:1: malformed function declaration: expected parameter type"
        );
    }

    #[test]
    fn test_recorded_error_into_error() {
        let recorded: RecordedError =
            ParseError::new("a.h", SourceLocation::new(1, 1), "boom").into();
        assert_eq!(recorded.location(), SourceLocation::new(1, 1));
        assert!(matches!(Error::from(recorded), Error::Parse(_)));
    }
}
