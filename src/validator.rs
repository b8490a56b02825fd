//! Semantic validation of raw parse trees.
//!
//! Every raw `key=value` leaf becomes a typed [`KeyValue`] checked against the
//! vocabularies, and every flat `[child, conj, child, ...]` chain becomes
//! proper [`BoolOp`] nodes.
//!
//! | key | accepted | stored as |
//! |---|---|---|
//! | `text` | non-empty text | `Text` |
//! | `text_window` | digits | `Int` |
//! | `face_name` | person vocabulary | `Enum`, canonical spelling |
//! | `face_tag` | tags split on `,` / `AND`, tag vocabulary | `StringList` |
//! | `face_count` | digits, greater than zero | `Int` |
//! | `channel` | channel vocabulary, aliases resolved | `Enum`, uppercase |
//! | `show` | show vocabulary | `Enum`, canonical spelling |
//! | `hour`, `day_of_week`, `video` | anything | `Text` |

use crate::ast::{Conjunction, RawItem, RawNode};
use crate::error::QueryError;
use crate::token::Keywords;
use crate::tree::{BoolOp, Key, KeyValue, Node, Operator, Value};
use crate::vocabulary::{VocabularyKind, VocabularyProvider};

pub struct Validator<'a> {
    vocabulary: &'a dyn VocabularyProvider,
    keywords: &'a Keywords,
}

impl<'a> Validator<'a> {
    pub fn new(vocabulary: &'a dyn VocabularyProvider, keywords: &'a Keywords) -> Self {
        Self {
            vocabulary,
            keywords,
        }
    }

    /// Validates the whole tree, stopping at the first error in document order.
    pub fn validate(&self, raw: &RawNode) -> Result<Node, QueryError> {
        match raw {
            RawNode::Leaf { key, value, .. } => self.validate_leaf(key, value).map(Node::KeyValue),
            RawNode::Op(items) => self.reduce(items),
        }
    }

    /// Returns every violation in the tree, in document order.
    pub fn collect_violations(&self, raw: &RawNode) -> Vec<QueryError> {
        let mut errors = Vec::new();
        self.collect_into(raw, &mut errors);
        errors
    }

    fn collect_into(&self, raw: &RawNode, errors: &mut Vec<QueryError>) {
        match raw {
            RawNode::Leaf { key, value, .. } => {
                if let Err(e) = self.validate_leaf(key, value) {
                    errors.push(e);
                }
            }
            RawNode::Op(items) => {
                if let Err(e) = check_chain_shape(items) {
                    errors.push(e);
                }
                for item in items {
                    if let RawItem::Node(node) = item {
                        self.collect_into(node, errors);
                    }
                }
            }
        }
    }

    /// Splits the chain into maximal AND runs separated by OR.
    /// `a AND b OR c` becomes `(a AND b) OR c`.
    fn reduce(&self, items: &[RawItem]) -> Result<Node, QueryError> {
        check_chain_shape(items)?;

        let mut runs: Vec<Vec<Node>> = vec![Vec::new()];
        for item in items {
            match item {
                RawItem::Node(node) => {
                    let node = self.validate(node)?;
                    if let Some(run) = runs.last_mut() {
                        run.push(node);
                    }
                }
                RawItem::Conj(Conjunction::And) => {}
                RawItem::Conj(Conjunction::Or) => runs.push(Vec::new()),
            }
        }

        let alternatives = runs
            .into_iter()
            .map(|run| group(Operator::And, run))
            .collect();
        Ok(group(Operator::Or, alternatives))
    }

    pub fn validate_leaf(&self, key: &str, value: &str) -> Result<KeyValue, QueryError> {
        let key = Key::from_name(key).ok_or_else(|| QueryError::UnknownKey {
            key: key.to_string(),
        })?;

        let value = match key {
            Key::Text => {
                if value.trim().is_empty() {
                    return Err(QueryError::invalid(key.as_str(), value, "text must not be empty"));
                }
                Value::Text(free_text(key, value)?)
            }
            Key::TextWindow => Value::Int(parse_count(key, value)?),
            Key::FaceCount => {
                let count = parse_count(key, value)?;
                if count == 0 {
                    return Err(QueryError::invalid(
                        key.as_str(),
                        value,
                        "face_count must be greater than zero",
                    ));
                }
                Value::Int(count)
            }
            Key::FaceName => Value::Enum(self.lookup(key, VocabularyKind::Person, value)?),
            Key::Channel => Value::Enum(self.lookup(key, VocabularyKind::Channel, value)?),
            Key::Show => Value::Enum(self.lookup(key, VocabularyKind::Show, value)?),
            Key::FaceTag => {
                let tags = self
                    .split_tags(value)
                    .into_iter()
                    .map(|tag| {
                        if tag.is_empty() {
                            Err(QueryError::invalid(key.as_str(), value, "empty tag in list"))
                        } else {
                            self.lookup(key, VocabularyKind::Tag, &tag)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Value::StringList(tags)
            }
            Key::Hour | Key::DayOfWeek | Key::Video => Value::Text(free_text(key, value)?),
        };

        Ok(KeyValue { key, value })
    }

    fn lookup(&self, key: Key, kind: VocabularyKind, value: &str) -> Result<String, QueryError> {
        self.vocabulary.canonical(kind, value).ok_or_else(|| {
            QueryError::invalid(key.as_str(), value, format!("not a known {}", kind.noun()))
        })
    }

    /// `"male AND presenter, white"` → `["male", "presenter", "white"]`
    fn split_tags(&self, value: &str) -> Vec<String> {
        let mut tags = Vec::new();
        for piece in value.split(',') {
            let mut words: Vec<&str> = Vec::new();
            for word in piece.split_whitespace() {
                if self.keywords.is_and(word) {
                    tags.push(words.join(" "));
                    words.clear();
                } else {
                    words.push(word);
                }
            }
            tags.push(words.join(" "));
        }
        tags
    }
}

/// A chain must be `node (conj node)+`
fn check_chain_shape(items: &[RawItem]) -> Result<(), QueryError> {
    if items.len() < 3 || items.len() % 2 == 0 {
        return Err(QueryError::structural(format!(
            "operator node with {} elements cannot hold two or more children",
            items.len()
        )));
    }
    let alternates = items.iter().enumerate().all(|(i, item)| match item {
        RawItem::Node(_) => i % 2 == 0,
        RawItem::Conj(_) => i % 2 == 1,
    });
    if !alternates {
        return Err(QueryError::structural(
            "operator chain must alternate children and conjunctions",
        ));
    }
    Ok(())
}

fn group(operator: Operator, mut nodes: Vec<Node>) -> Node {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        Node::BoolOp(BoolOp {
            operator,
            children: nodes,
        })
    }
}

/// Quotes cannot be escaped, so a value may use one kind of quote but not both.
fn free_text(key: Key, value: &str) -> Result<String, QueryError> {
    if value.contains('"') && value.contains('\'') {
        return Err(QueryError::invalid(
            key.as_str(),
            value,
            "value cannot contain both ' and \" quotes",
        ));
    }
    Ok(value.to_string())
}

fn parse_count(key: Key, value: &str) -> Result<u64, QueryError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QueryError::invalid(
            key.as_str(),
            value,
            format!("{} must be a whole number", key),
        ));
    }
    value
        .parse::<u64>()
        .map_err(|_| QueryError::invalid(key.as_str(), value, "number is too large"))
}
