//! 语法分析器产出的原始语法树，尚未经过校验

use crate::token::Span;

/// 原始语法树的根节点, 代表一个完整的查询字符串
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawQuery {
    /// 开头 `[alias]` 中的文本，原样保留
    pub alias: Option<String>,
    /// 主查询为空时为 `None`（匹配全部）
    pub main: Option<RawNode>,
    /// 顶层 `NORMALIZE` / `SUBTRACT` 右侧的查询
    pub secondary: Option<RawSecondary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSecondary {
    pub kind: SecondaryKind,
    pub tree: Option<RawNode>,
}

/// 将次查询与主查询配对的顶层修饰符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryKind {
    Normalize,
    Subtract,
}

impl SecondaryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SecondaryKind::Normalize => "normalize",
            SecondaryKind::Subtract => "subtract",
        }
    }
}

/// 弱类型的树节点，键和值仍是普通字符串
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    /// `key=value`
    Leaf { key: String, value: String, span: Span },
    /// 扁平链 `[child, conj, child, conj, child, ...]`
    Op(Vec<RawItem>),
}

/// 运算符链中的一个元素
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Node(RawNode),
    Conj(Conjunction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conjunction {
    And,
    Or,
}

impl RawNode {
    pub fn leaf(key: &str, value: &str) -> Self {
        RawNode::Leaf {
            key: key.to_string(),
            value: value.to_string(),
            span: Span::default(),
        }
    }
}
