//! 查询语言的词法分析器

use crate::token::{Keywords, Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    keywords: &'a Keywords,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
    /// 产出第一个 token 之前为 true，只有此时 `[` 才能开始别名
    at_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, keywords: &'a Keywords) -> Self {
        Lexer {
            input,
            keywords,
            position: 0,
            at_start: true,
        }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取引号包围的字符串
    /// 注意：开始的引号已经被调用者消费
    ///
    /// 找不到配对的结束引号时，只有引号本身成为 token，随后从引号之后继续分词
    fn read_quoted(&mut self, start: usize, quote: char) -> Token<'a> {
        let content_start = self.position;
        match self.input[content_start..].find(quote) {
            Some(len) => {
                let content = &self.input[content_start..content_start + len];
                self.position = content_start + len + quote.len_utf8();
                Token {
                    kind: TokenKind::Quoted(content),
                    span: Span::new(start, self.position),
                }
            }
            None => Token {
                kind: TokenKind::UnterminatedQuote,
                span: Span::new(start, self.position),
            },
        }
    }

    /// 读取 `[alias]`，开始的 `[` 已经被调用者消费
    fn read_alias(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        match self.input[content_start..].find(']') {
            Some(len) => {
                let content = &self.input[content_start..content_start + len];
                self.position = content_start + len + 1;
                Token {
                    kind: TokenKind::Alias(content),
                    span: Span::new(start, self.position),
                }
            }
            None => {
                self.position = self.input.len();
                Token {
                    kind: TokenKind::UnterminatedAlias,
                    span: Span::new(start, self.position),
                }
            }
        }
    }

    /// 读取单词或关键字
    /// 单词遇到空白、括号或 `=` 时结束
    fn read_word(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if ends_word(c) {
                break;
            }
            self.bump();
        }
        let literal = &self.input[start..self.position];
        let kind = self
            .keywords
            .classify(literal)
            .unwrap_or(TokenKind::Word(literal));
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }
}

fn ends_word(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '=')
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;
        let at_start = std::mem::replace(&mut self.at_start, false);

        let c = self.bump()?;

        let token = match c {
            '(' => Token { kind: TokenKind::LParen, span: Span::new(start, self.position) },
            ')' => Token { kind: TokenKind::RParen, span: Span::new(start, self.position) },
            '=' => Token { kind: TokenKind::Eq, span: Span::new(start, self.position) },
            '[' if at_start => self.read_alias(start),
            '"' | '\'' => self.read_quoted(start, c),
            _ => self.read_word(start),
        };
        Some(token)
    }
}

/// 对整个输入进行分词
pub fn tokenize<'a>(input: &'a str, keywords: &'a Keywords) -> Vec<Token<'a>> {
    Lexer::new(input, keywords).collect()
}
