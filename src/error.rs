//! Error types for query construction and dispatch.

use crate::dispatch::Purpose;
use crate::token::Span;

/// The grammar could not derive the input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at {}..{}: {fragment:?})", .span.start, .span.end)]
pub struct SyntaxError {
    pub message: String,
    /// The offending substring of the input
    pub fragment: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, input: &str, span: Span) -> Self {
        let fragment = input.get(span.start..span.end).unwrap_or_default().to_string();
        Self {
            message: message.into(),
            fragment,
            span,
        }
    }
}

/// Coarse classification of [`QueryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    Syntax,
    UnknownKey,
    InvalidValue,
    StructuralInvariant,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("unknown key \"{key}\"; use one of {}", crate::tree::Key::names().join(", "))]
    UnknownKey { key: String },

    #[error("invalid {key} \"{value}\": {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Internal bug signal. User input never produces this.
    #[error("internal error: {message}")]
    StructuralInvariant { message: String },
}

impl QueryError {
    pub fn kind(&self) -> QueryErrorKind {
        match self {
            QueryError::Syntax(_) => QueryErrorKind::Syntax,
            QueryError::UnknownKey { .. } => QueryErrorKind::UnknownKey,
            QueryError::InvalidValue { .. } => QueryErrorKind::InvalidValue,
            QueryError::StructuralInvariant { .. } => QueryErrorKind::StructuralInvariant,
        }
    }

    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn structural(message: impl Into<String>) -> Self {
        QueryError::StructuralInvariant {
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{purpose} request failed: {source}")]
    Backend {
        purpose: Purpose,
        #[source]
        source: anyhow::Error,
    },

    #[error("{purpose} request returned an unexpected response shape")]
    UnexpectedShape { purpose: Purpose },

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}
