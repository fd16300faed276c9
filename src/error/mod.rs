//! Error handling for the Dyre compiler.
//!
//! This module provides the crate-wide error type and a `Span` for carrying
//! source location information out of the lexer and parser.

use std::fmt;

/// A span in the source code, represented as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span from start and end offsets.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a span for a single position.
    pub fn point(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// The unified error type for every stage of the compiler.
///
/// Lex and parse errors carry a [`Span`]; errors that originate from catalog
/// JSON or from post-parse graph state do not, since there is no source
/// offset to point at.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    Lex { message: String, span: Span },

    #[error("{message}")]
    Parse { message: String, span: Span },

    #[error("{message}")]
    Catalog { message: String },

    #[error("{message}")]
    Resolution { message: String },

    #[error("{message}")]
    Type { message: String },

    #[error("{message}")]
    Permission { message: String },

    #[error("{message}")]
    Join { message: String },
}

impl Error {
    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        Error::Lex {
            message: message.into(),
            span,
        }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Error::Parse {
            message: message.into(),
            span,
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Error::Catalog {
            message: message.into(),
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Error::Resolution {
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Error::Type {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Error::Permission {
            message: message.into(),
        }
    }

    pub fn join(message: impl Into<String>) -> Self {
        Error::Join {
            message: message.into(),
        }
    }

    /// The span of this error, if it originated in the lexer or parser.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lex { span, .. } | Error::Parse { span, .. } => Some(*span),
            _ => None,
        }
    }
}

/// Joins several errors into a single `Catalog` error with a combined message,
/// mirroring the accumulate-then-join behavior of the catalog loader.
pub fn join_errors(kind: &str, errors: Vec<Error>) -> Error {
    let joined = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Error::catalog(format!("{kind}: {joined}"))
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both() {
        let a = Span::new(2, 5);
        let b = Span::new(10, 12);
        let merged = a.merge(b);
        assert_eq!(merged, Span::new(2, 12));
    }

    #[test]
    fn lex_and_parse_errors_carry_span() {
        let e = Error::lex("illegal byte", Span::point(3));
        assert_eq!(e.span(), Some(Span::new(3, 4)));

        let e = Error::catalog("missing name");
        assert_eq!(e.span(), None);
    }

    #[test]
    fn join_errors_combines_messages() {
        let errs = vec![
            Error::catalog("Unexpected key foo"),
            Error::catalog("Unexpected key bar"),
        ];
        let joined = join_errors("Endpoint Widgets", errs);
        assert!(joined.to_string().contains("foo"));
        assert!(joined.to_string().contains("bar"));
    }
}
