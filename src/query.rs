//! The query model: alias, main tree and an optional NORMALIZE / SUBTRACT tree.

use tracing::{debug, warn};

pub use crate::ast::SecondaryKind;
use crate::ast::RawNode;
use crate::error::QueryError;
use crate::optimizer::optimize;
use crate::parser::parse;
use crate::token::Keywords;
use crate::tree::Node;
use crate::validator::Validator;
use crate::vocabulary::VocabularyProvider;

/// How grammar failures are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Every error is returned
    #[default]
    Strict,
    /// A top-level syntax error yields a match-everything query.
    /// Validation errors are still returned.
    Lenient,
}

impl ParseMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ParseMode::Strict
        } else {
            ParseMode::Lenient
        }
    }
}

/// Secondary query paired with the main one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secondary {
    kind: SecondaryKind,
    /// `None` stands for everything
    tree: Option<Node>,
}

impl Secondary {
    pub fn kind(&self) -> SecondaryKind {
        self.kind
    }

    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }
}

/// A parsed, validated and optimized query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    alias: Option<String>,
    main: Option<Node>,
    secondary: Option<Secondary>,
    source_text: String,
}

impl Query {
    /// Builds a query with the default keywords.
    pub fn build(
        source_text: &str,
        vocabulary: &dyn VocabularyProvider,
        strict: bool,
    ) -> Result<Query, QueryError> {
        QueryCompiler::new(vocabulary).build(source_text, ParseMode::from_strict(strict))
    }

    /// A query without filters
    pub fn match_all(source_text: &str) -> Self {
        Self {
            alias: None,
            main: None,
            secondary: None,
            source_text: source_text.to_string(),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// `None` matches everything
    pub fn main(&self) -> Option<&Node> {
        self.main.as_ref()
    }

    pub fn secondary(&self) -> Option<&Secondary> {
        self.secondary.as_ref()
    }

    pub fn normalize(&self) -> Option<&Secondary> {
        self.secondary
            .as_ref()
            .filter(|s| s.kind == SecondaryKind::Normalize)
    }

    pub fn subtract(&self) -> Option<&Secondary> {
        self.secondary
            .as_ref()
            .filter(|s| s.kind == SecondaryKind::Subtract)
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Label for legends: the alias, or else the source text
    pub fn display_name(&self) -> &str {
        self.alias().unwrap_or_else(|| self.source_text.trim())
    }

    pub fn is_match_all(&self) -> bool {
        self.main.is_none() && self.secondary.is_none()
    }
}

/// Turns query strings into [`Query`] values against one vocabulary and
/// keyword set.
pub struct QueryCompiler<'a> {
    vocabulary: &'a dyn VocabularyProvider,
    keywords: Keywords,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(vocabulary: &'a dyn VocabularyProvider) -> Self {
        Self::with_keywords(vocabulary, Keywords::default())
    }

    pub fn with_keywords(vocabulary: &'a dyn VocabularyProvider, keywords: Keywords) -> Self {
        Self {
            vocabulary,
            keywords,
        }
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    pub fn vocabulary(&self) -> &'a dyn VocabularyProvider {
        self.vocabulary
    }

    fn validator(&self) -> Validator<'_> {
        Validator::new(self.vocabulary, &self.keywords)
    }

    pub fn build(&self, source_text: &str, mode: ParseMode) -> Result<Query, QueryError> {
        let raw = match parse(source_text, &self.keywords) {
            Ok(raw) => raw,
            Err(err) if mode == ParseMode::Lenient => {
                warn!(error = %err, "syntax error absorbed, query matches everything");
                return Ok(Query::match_all(source_text));
            }
            Err(err) => return Err(err.into()),
        };

        let main = self.compile_tree(raw.main.as_ref())?;
        let secondary = match raw.secondary {
            Some(secondary) => Some(Secondary {
                kind: secondary.kind,
                tree: self.compile_tree(secondary.tree.as_ref())?,
            }),
            None => None,
        };

        debug!(
            source = source_text,
            alias = raw.alias.as_deref(),
            leaves = main.as_ref().map_or(0, Node::leaf_count),
            secondary = secondary.as_ref().map(|s| s.kind.as_str()),
            "built query"
        );

        Ok(Query {
            alias: raw.alias,
            main,
            secondary,
            source_text: source_text.to_string(),
        })
    }

    fn compile_tree(&self, raw: Option<&RawNode>) -> Result<Option<Node>, QueryError> {
        raw.map(|node| self.validator().validate(node).map(optimize))
            .transpose()
    }

    /// Every problem with `source_text`: the syntax error if it does not
    /// parse, otherwise all validation errors of the main and secondary trees.
    pub fn check(&self, source_text: &str) -> Vec<QueryError> {
        let raw = match parse(source_text, &self.keywords) {
            Ok(raw) => raw,
            Err(err) => return vec![err.into()],
        };
        let validator = self.validator();
        raw.main
            .iter()
            .chain(raw.secondary.iter().filter_map(|s| s.tree.as_ref()))
            .flat_map(|node| validator.collect_violations(node))
            .collect()
    }
}
