//! The token definition for the query language.

use serde::{Deserialize, Serialize};

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    And,       // "AND"
    Or,        // "OR"
    Normalize, // "NORMALIZE"
    Subtract,  // "SUBTRACT"

    // Literals
    Word(&'a str),
    Quoted(&'a str), // The content between the quotes
    Alias(&'a str),  // The content between `[` and `]`

    // Punctuation
    LParen, // (
    RParen, // )
    Eq,     // =

    // Special
    UnterminatedQuote,
    UnterminatedAlias,
}

impl TokenKind<'_> {
    /// Reserved words end a bare value run.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::And | TokenKind::Or | TokenKind::Normalize | TokenKind::Subtract
        )
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

/// Spellings of the reserved words, shared by the lexer and the validator.
///
/// Matching is always case-insensitive, so `and`, `And` and `AND` are the same
/// keyword under the default set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub and: String,
    pub or: String,
    pub normalize: String,
    pub subtract: String,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            and: "AND".to_string(),
            or: "OR".to_string(),
            normalize: "NORMALIZE".to_string(),
            subtract: "SUBTRACT".to_string(),
        }
    }
}

impl Keywords {
    /// Classify a bare word as a keyword token, if it is one.
    pub fn classify<'a>(&self, word: &str) -> Option<TokenKind<'a>> {
        if word.eq_ignore_ascii_case(&self.and) {
            Some(TokenKind::And)
        } else if word.eq_ignore_ascii_case(&self.or) {
            Some(TokenKind::Or)
        } else if word.eq_ignore_ascii_case(&self.normalize) {
            Some(TokenKind::Normalize)
        } else if word.eq_ignore_ascii_case(&self.subtract) {
            Some(TokenKind::Subtract)
        } else {
            None
        }
    }

    pub fn is_and(&self, word: &str) -> bool {
        word.eq_ignore_ascii_case(&self.and)
    }
}
