//! 查询语言的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   ├─ 别名 token?             → `[my label]`，原样保留
//!   ├─ parse_single_query()    → 主查询树，为空时为 None
//!   ├─ NORMALIZE / SUBTRACT?   → parse_single_query() 解析次查询树
//!   └─ 期望输入结束
//!
//! parse_single_query()
//!   └─ parse_node()
//!        ├─ parse_kv_or_group()
//!        │    ├─ "(" → parse_node() → 期望 ")"
//!        │    │         └─ 括号内出现 NORMALIZE / SUBTRACT → 报错
//!        │    └─ key "=" parse_value()
//!        │                  ├─ "quoted" / 'quoted'
//!        │                  └─ 不带引号的连续单词，直到关键字、"(" 、")" 或输入结束
//!        └─ 遇到 AND / OR 时：必须与本层之前的连接词相同，继续 parse_kv_or_group()
//! ```
//!
//! ## 语法
//!
//! ```text
//! Start       := '[' Alias ']' Query | Query
//! Query       := SingleQuery ('NORMALIZE' | 'SUBTRACT') SingleQuery | SingleQuery
//! SingleQuery := Node | <empty>
//! Node        := KVOrGroup (('AND' | 'OR') KVOrGroup)*     每层只允许一种连接词
//! KVOrGroup   := Key '=' Value | '(' Node ')'
//! ```
//!
//! 每一层在 [`RawNode::Op`] 中保持扁平的 `[child, conj, child, ...]` 形式，
//! 由校验器转换为真正的运算符节点。
//!
//! ## 解析示例
//!
//! ```text
//! // 简单过滤
//! channel=CNN
//!
//! // 别名和多个条件
//! [fox climate] channel=FOX AND text="climate change"
//!
//! // 分组
//! (show=Hannity OR show="Tucker Carlson Tonight") AND face_name=donald trump
//!
//! // 归一化
//! text=wall NORMALIZE channel=FOXNEWS
//! ```

use crate::ast::{Conjunction, RawItem, RawNode, RawQuery, RawSecondary, SecondaryKind};
use crate::error::SyntaxError;
use crate::lexer::tokenize;
use crate::token::{Keywords, Span, Token, TokenKind};

pub struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token<'a>],
    position: usize,
}

/// 一步完成 `input` 的词法分析和语法分析
pub fn parse(input: &str, keywords: &Keywords) -> Result<RawQuery, SyntaxError> {
    let tokens = tokenize(input, keywords);
    Parser::new(input, &tokens).parse()
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, tokens: &'a [Token<'a>]) -> Self {
        Self {
            input,
            tokens,
            position: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position);
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn end_span(&self) -> Span {
        Span::new(self.input.len(), self.input.len())
    }

    fn error(&self, message: impl Into<String>, span: Span) -> SyntaxError {
        SyntaxError::new(message, self.input, span)
    }

    fn text(&self, span: Span) -> &'a str {
        &self.input[span.start..span.end]
    }

    fn unexpected(&self, token: &Token<'a>) -> SyntaxError {
        match token.kind {
            TokenKind::RParen => self.error("unbalanced parentheses: unexpected ')'", token.span),
            TokenKind::Normalize | TokenKind::Subtract => self.error(
                "only one NORMALIZE or SUBTRACT may appear in a query",
                token.span,
            ),
            _ => self.error(
                format!("unexpected \"{}\"", self.text(token.span)),
                token.span,
            ),
        }
    }

    pub fn parse(&mut self) -> Result<RawQuery, SyntaxError> {
        let alias = self.parse_alias()?;
        let main = self.parse_single_query()?;

        let secondary = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Normalize) | Some(TokenKind::Subtract) => {
                let kind = match self.advance().map(|t| &t.kind) {
                    Some(TokenKind::Normalize) => SecondaryKind::Normalize,
                    _ => SecondaryKind::Subtract,
                };
                let tree = self.parse_single_query()?;
                Some(RawSecondary { kind, tree })
            }
            _ => None,
        };

        if let Some(token) = self.peek() {
            return Err(self.unexpected(token));
        }

        Ok(RawQuery {
            alias,
            main,
            secondary,
        })
    }

    fn parse_alias(&mut self) -> Result<Option<String>, SyntaxError> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        match token.kind {
            TokenKind::Alias(text) => {
                self.advance();
                if text.is_empty() {
                    return Err(self.error("alias must not be empty", token.span));
                }
                Ok(Some(text.to_string()))
            }
            TokenKind::UnterminatedAlias => {
                Err(self.error("unterminated alias: missing ']'", token.span))
            }
            _ => Ok(None),
        }
    }

    /// NORMALIZE / SUBTRACT 前后允许为空查询
    fn parse_single_query(&mut self) -> Result<Option<RawNode>, SyntaxError> {
        match self.peek().map(|t| &t.kind) {
            None | Some(TokenKind::Normalize) | Some(TokenKind::Subtract) => Ok(None),
            Some(_) => self.parse_node().map(Some),
        }
    }

    /// 解析一个嵌套层级
    ///
    /// 语法: `kv_or_group (conj kv_or_group)*`，同一层级的 `conj` 必须相同
    /// 示例: `channel=CNN AND show=Hannity AND face_count=2`
    fn parse_node(&mut self) -> Result<RawNode, SyntaxError> {
        let first = self.parse_kv_or_group()?;
        let mut items = vec![RawItem::Node(first)];
        let mut level_conj: Option<Conjunction> = None;

        while let Some(token) = self.peek() {
            let conj = match token.kind {
                TokenKind::And => Conjunction::And,
                TokenKind::Or => Conjunction::Or,
                _ => break,
            };
            if level_conj.is_some_and(|c| c != conj) {
                return Err(self.error(
                    "cannot mix AND and OR at the same level; add parentheses",
                    token.span,
                ));
            }
            level_conj = Some(conj);
            self.advance(); // 消费 AND / OR

            match self.peek() {
                Some(next) if !next.kind.is_keyword() && next.kind != TokenKind::RParen => {}
                _ => {
                    return Err(self.error(
                        format!("expecting input after {}", self.text(token.span)),
                        token.span,
                    ));
                }
            }

            items.push(RawItem::Conj(conj));
            items.push(RawItem::Node(self.parse_kv_or_group()?));
        }

        if items.len() == 1 {
            if let Some(RawItem::Node(node)) = items.pop() {
                return Ok(node);
            }
        }
        Ok(RawNode::Op(items))
    }

    fn parse_kv_or_group(&mut self) -> Result<RawNode, SyntaxError> {
        let Some(token) = self.advance() else {
            return Err(self.error("unexpected end of input", self.end_span()));
        };

        match token.kind {
            TokenKind::LParen => {
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
                    return Err(self.error("empty parentheses", token.span));
                }
                let node = self.parse_node()?;
                match self.advance() {
                    Some(close) if close.kind == TokenKind::RParen => Ok(node),
                    Some(modifier)
                        if matches!(modifier.kind, TokenKind::Normalize | TokenKind::Subtract) =>
                    {
                        Err(self.error(
                            "NORMALIZE/SUBTRACT is only allowed at the top level, outside parentheses",
                            modifier.span,
                        ))
                    }
                    Some(other) => Err(self.unexpected(other)),
                    None => Err(self.error(
                        "unbalanced parentheses: expected ')'",
                        token.span,
                    )),
                }
            }
            TokenKind::Word(key) => {
                match self.advance() {
                    Some(eq) if eq.kind == TokenKind::Eq => {
                        let (value, value_span) = self.parse_value(eq.span)?;
                        Ok(RawNode::Leaf {
                            key: key.to_string(),
                            value,
                            span: token.span.to(value_span),
                        })
                    }
                    Some(other) => Err(self.error(
                        format!("expected '=' after key \"{}\"", key),
                        other.span,
                    )),
                    None => Err(self.error(
                        format!("expected '=' after key \"{}\"", key),
                        token.span,
                    )),
                }
            }
            _ => Err(self.error(
                format!("expected key=value or '(', found \"{}\"", self.text(token.span)),
                token.span,
            )),
        }
    }

    /// 解析值：带引号的字符串，或不带引号的连续单词
    ///
    /// 不带引号的值遇到关键字、括号或输入结束时停止
    fn parse_value(&mut self, eq_span: Span) -> Result<(String, Span), SyntaxError> {
        let Some(first) = self.peek() else {
            return Err(self.error("expecting a value after '='", eq_span));
        };

        match first.kind {
            TokenKind::Quoted(content) => {
                self.advance();
                Ok((content.to_string(), first.span))
            }
            TokenKind::UnterminatedQuote => Err(self.error("unterminated quote", first.span)),
            TokenKind::Word(_) | TokenKind::Eq => {
                let mut span = first.span;
                while let Some(token) = self.peek() {
                    if !is_bare_value_part(&token.kind) {
                        break;
                    }
                    span = span.to(token.span);
                    self.advance();
                }
                Ok((self.text(span).to_string(), span))
            }
            _ => Err(self.error("expecting a value after '='", eq_span)),
        }
    }
}

fn is_bare_value_part(kind: &TokenKind<'_>) -> bool {
    matches!(
        kind,
        TokenKind::Word(_) | TokenKind::Eq | TokenKind::Quoted(_) | TokenKind::UnterminatedQuote
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_string(input: &str) -> Result<RawQuery, SyntaxError> {
        parse(input, &Keywords::default())
    }

    fn leaf(key: &str, value: &str) -> RawNode {
        RawNode::leaf(key, value)
    }

    /// 去掉 span，便于按结构比较语法树
    fn strip(node: RawNode) -> RawNode {
        match node {
            RawNode::Leaf { key, value, .. } => RawNode::leaf(&key, &value),
            RawNode::Op(items) => RawNode::Op(
                items
                    .into_iter()
                    .map(|item| match item {
                        RawItem::Node(n) => RawItem::Node(strip(n)),
                        conj => conj,
                    })
                    .collect(),
            ),
        }
    }

    fn main_of(input: &str) -> RawNode {
        strip(parse_string(input).unwrap().main.expect("main tree"))
    }

    #[test]
    fn test_simple_key_value() {
        let query = parse_string("channel=CNN").unwrap();
        assert_eq!(query.alias, None);
        assert!(query.secondary.is_none());
        match query.main.unwrap() {
            RawNode::Leaf { key, value, span } => {
                assert_eq!(key, "channel");
                assert_eq!(value, "CNN");
                assert_eq!(span, Span::new(0, 11));
            }
            other => panic!("Expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_and_chain_is_interleaved() {
        assert_eq!(
            main_of("a=1 AND b=2 and c=3"),
            RawNode::Op(vec![
                RawItem::Node(leaf("a", "1")),
                RawItem::Conj(Conjunction::And),
                RawItem::Node(leaf("b", "2")),
                RawItem::Conj(Conjunction::And),
                RawItem::Node(leaf("c", "3")),
            ])
        );
    }

    #[test]
    fn test_nested_group() {
        assert_eq!(
            main_of("a=1 OR (b=2 AND c=3)"),
            RawNode::Op(vec![
                RawItem::Node(leaf("a", "1")),
                RawItem::Conj(Conjunction::Or),
                RawItem::Node(RawNode::Op(vec![
                    RawItem::Node(leaf("b", "2")),
                    RawItem::Conj(Conjunction::And),
                    RawItem::Node(leaf("c", "3")),
                ])),
            ])
        );
    }

    #[test]
    fn test_outer_parentheses() {
        assert_eq!(main_of("(channel=CNN)"), leaf("channel", "CNN"));
    }

    #[test]
    fn test_bare_value_spans_words() {
        assert_eq!(
            main_of("face_name=donald trump AND channel=CNN"),
            RawNode::Op(vec![
                RawItem::Node(leaf("face_name", "donald trump")),
                RawItem::Conj(Conjunction::And),
                RawItem::Node(leaf("channel", "CNN")),
            ])
        );
    }

    #[test]
    fn test_bare_value_stops_at_paren() {
        assert_eq!(
            main_of("(text=hello world)"),
            leaf("text", "hello world")
        );
    }

    #[test]
    fn test_bare_value_keeps_inner_equals_and_quotes() {
        assert_eq!(main_of("text=a=b"), leaf("text", "a=b"));
        assert_eq!(main_of("text=rock 'n roll"), leaf("text", "rock 'n roll"));
    }

    #[test]
    fn test_quoted_values() {
        assert_eq!(
            main_of(r#"text="climate AND change""#),
            leaf("text", "climate AND change")
        );
        assert_eq!(main_of("show='Fox & Friends'"), leaf("show", "Fox & Friends"));
    }

    #[test]
    fn test_alias() {
        let query = parse_string("  [my query]  channel=CNN ").unwrap();
        assert_eq!(query.alias.as_deref(), Some("my query"));
        assert_eq!(strip(query.main.unwrap()), leaf("channel", "CNN"));
    }

    #[test]
    fn test_alias_only() {
        let query = parse_string("[everything]").unwrap();
        assert_eq!(query.alias.as_deref(), Some("everything"));
        assert!(query.main.is_none());
    }

    #[test]
    fn test_empty_alias_is_error() {
        assert!(parse_string("[] channel=CNN").is_err());
    }

    #[test]
    fn test_unterminated_alias_is_error() {
        let err = parse_string("[oops channel=CNN").unwrap_err();
        assert!(err.message.contains("alias"));
    }

    #[test]
    fn test_empty_input() {
        let query = parse_string("   ").unwrap();
        assert_eq!(query, RawQuery::default());
    }

    #[test]
    fn test_normalize() {
        let query = parse_string("text=wall normalize channel=FOXNEWS").unwrap();
        assert_eq!(strip(query.main.unwrap()), leaf("text", "wall"));
        let secondary = query.secondary.unwrap();
        assert_eq!(secondary.kind, SecondaryKind::Normalize);
        assert_eq!(strip(secondary.tree.unwrap()), leaf("channel", "FOXNEWS"));
    }

    #[test]
    fn test_subtract_with_empty_sides() {
        let query = parse_string("SUBTRACT channel=CNN").unwrap();
        assert!(query.main.is_none());
        assert_eq!(query.secondary.unwrap().kind, SecondaryKind::Subtract);

        let query = parse_string("channel=CNN NORMALIZE").unwrap();
        let secondary = query.secondary.unwrap();
        assert_eq!(secondary.kind, SecondaryKind::Normalize);
        assert!(secondary.tree.is_none());
    }

    #[test]
    fn test_both_modifiers_is_error() {
        let err = parse_string("a=1 NORMALIZE b=2 SUBTRACT c=3").unwrap_err();
        assert_eq!(err.message, "only one NORMALIZE or SUBTRACT may appear in a query");
        assert_eq!(err.fragment, "SUBTRACT");
    }

    #[test]
    fn test_modifier_inside_parentheses_is_error() {
        let err = parse_string("(text=a NORMALIZE text=b)").unwrap_err();
        assert_eq!(
            err.message,
            "NORMALIZE/SUBTRACT is only allowed at the top level, outside parentheses"
        );
        assert_eq!(err.fragment, "NORMALIZE");
        assert_eq!(err.span, Span::new(8, 17));

        let err = parse_string("a=1 AND (b=2 subtract c=3)").unwrap_err();
        assert!(err.message.contains("top level"));
        assert_eq!(err.fragment, "subtract");
    }

    #[test]
    fn test_dangling_conjunction() {
        let err = parse_string("channel=CNN AND").unwrap_err();
        assert_eq!(err.message, "expecting input after AND");
        assert_eq!(err.span, Span::new(12, 15));

        let err = parse_string("channel=CNN or NORMALIZE x=1").unwrap_err();
        assert_eq!(err.message, "expecting input after or");

        assert!(parse_string("(a=1 AND)").is_err());
    }

    #[test]
    fn test_mixed_conjunctions_is_error() {
        let err = parse_string("a=1 AND b=2 OR c=3").unwrap_err();
        assert!(err.message.contains("cannot mix"));
        assert_eq!(err.fragment, "OR");
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(parse_string("(a=1 AND b=2").is_err());
        let err = parse_string("a=1)").unwrap_err();
        assert!(err.message.contains("unbalanced"));
        assert!(parse_string("()").is_err());
    }

    #[test]
    fn test_unterminated_quote_at_value_start() {
        let err = parse_string(r#"text="climate change"#).unwrap_err();
        assert_eq!(err.message, "unterminated quote");
    }

    #[test]
    fn test_missing_value_or_equals() {
        assert!(parse_string("text=").is_err());
        assert!(parse_string("text= AND b=1").is_err());
        let err = parse_string("channel CNN").unwrap_err();
        assert!(err.message.contains("expected '='"));
    }

    #[test]
    fn test_leading_conjunction_is_error() {
        let err = parse_string("AND a=1").unwrap_err();
        assert!(err.message.starts_with("expected key=value"));
    }

    #[test]
    fn test_missing_conjunction_joins_value() {
        // 没有 AND 时，第二个键值对属于第一个不带引号的值
        assert_eq!(
            main_of("channel=CNN text=foo"),
            leaf("channel", "CNN text=foo")
        );
    }
}
