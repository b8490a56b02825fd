//! Validated query tree and its wire format.
//!
//! The backend consumes a JSON array whose first element is the key or the
//! operator and whose second element is the value or the children:
//!
//! ```text
//! ["and", [["channel", "FOXNEWS"], ["text", "climate change"]]]
//! ```

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use crate::token::Keywords;

/// The closed set of filter keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Text,
    TextWindow,
    FaceName,
    FaceTag,
    FaceCount,
    Channel,
    Show,
    Hour,
    DayOfWeek,
    Video,
}

impl Key {
    pub const ALL: [Key; 10] = [
        Key::Text,
        Key::TextWindow,
        Key::FaceName,
        Key::FaceTag,
        Key::FaceCount,
        Key::Channel,
        Key::Show,
        Key::Hour,
        Key::DayOfWeek,
        Key::Video,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Key::Text => "text",
            Key::TextWindow => "text_window",
            Key::FaceName => "face_name",
            Key::FaceTag => "face_tag",
            Key::FaceCount => "face_count",
            Key::Channel => "channel",
            Key::Show => "show",
            Key::Hour => "hour",
            Key::DayOfWeek => "day_of_week",
            Key::Video => "video",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Key::ALL.iter().map(|k| k.as_str()).collect()
    }

    /// Keys are matched exactly; `Channel` is not `channel`.
    pub fn from_name(name: &str) -> Option<Key> {
        Key::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value of a leaf; the variant is decided by the key during validation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Text(String),
    Int(u64),
    StringList(Vec<String>),
    /// Canonical member of a vocabulary
    Enum(String),
}

impl Value {
    fn to_json(&self) -> Json {
        match self {
            Value::Text(s) | Value::Enum(s) => Json::String(s.clone()),
            Value::Int(n) => Json::from(*n),
            Value::StringList(items) => Json::String(items.join(",")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) | Value::Enum(s) => write_quoted(f, s),
            Value::StringList(items) => write_quoted(f, &items.join(",")),
        }
    }
}

/// Quotes text that would not survive as a bare value.
///
/// The grammar has no escapes, so a value holding both quote characters has
/// no faithful rendering; the validator never produces one.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let needs_quotes = s.is_empty()
        || Keywords::default().classify(s).is_some()
        || s.chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'' | '='));
    if !needs_quotes {
        f.write_str(s)
    } else if s.contains('"') {
        write!(f, "'{}'", s)
    } else {
        write!(f, "\"{}\"", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    pub key: Key,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

/// AND / OR over two or more children
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoolOp {
    pub operator: Operator,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    KeyValue(KeyValue),
    BoolOp(BoolOp),
}

impl Node {
    pub fn kv(key: Key, value: Value) -> Self {
        Node::KeyValue(KeyValue { key, value })
    }

    pub fn and(children: Vec<Node>) -> Self {
        Node::BoolOp(BoolOp {
            operator: Operator::And,
            children,
        })
    }

    pub fn or(children: Vec<Node>) -> Self {
        Node::BoolOp(BoolOp {
            operator: Operator::Or,
            children,
        })
    }

    /// `[key_or_op, value_or_children]`
    pub fn to_json(&self) -> Json {
        match self {
            Node::KeyValue(kv) => Json::Array(vec![
                Json::String(kv.key.as_str().to_string()),
                kv.value.to_json(),
            ]),
            Node::BoolOp(op) => Json::Array(vec![
                Json::String(op.operator.as_str().to_string()),
                Json::Array(op.children.iter().map(Node::to_json).collect()),
            ]),
        }
    }

    /// Compact wire serialization sent to the backend
    pub fn to_wire(&self) -> String {
        self.to_json().to_string()
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::KeyValue(_) => 1,
            Node::BoolOp(op) => op.children.iter().map(Node::leaf_count).sum(),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Renders the tree back into query syntax, parenthesizing nested groups.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::KeyValue(kv) => write!(f, "{}={}", kv.key, kv.value),
            Node::BoolOp(op) => {
                let joiner = match op.operator {
                    Operator::And => " AND ",
                    Operator::Or => " OR ",
                };
                for (i, child) in op.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    match child {
                        Node::BoolOp(_) => write!(f, "({})", child)?,
                        Node::KeyValue(_) => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
        }
    }
}
