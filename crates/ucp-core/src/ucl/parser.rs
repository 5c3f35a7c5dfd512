//! Parser: recursive descent over lexer tokens
//!
//! Produces one [`Statement`] per top-level command. A statement ends at a
//! newline, `;` or end of input. `ATOMIC { ... }` groups may span lines;
//! inside them statements are separated by newlines or `;`.
//!
//! Parsing is all-or-nothing: the first malformed line fails the whole
//! source, before anything is executed.

use crate::content::ContentType;
use crate::edge::EdgeType;
use crate::primitives::MAX_UCL_SOURCE_LEN;
use crate::ucl::ast::{Command, EditOp, IdRef, Statement};
use crate::ucl::lexer::{Lexer, Token, TokenKind, line_fragment};
use crate::{CustomMap, CustomValue, UcpError};

/// Parse UCL source into statements.
pub fn parse(source: &str) -> Result<Vec<Statement>, UcpError> {
    if source.len() > MAX_UCL_SOURCE_LEN {
        return Err(UcpError::syntax(
            0,
            "",
            format!(
                "source is {} bytes, limit is {MAX_UCL_SOURCE_LEN}",
                source.len()
            ),
        ));
    }
    let tokens = Lexer::new(source).tokenize()?;
    Parser {
        source,
        tokens,
        pos: 0,
    }
    .parse_all()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn parse_all(&mut self) -> Result<Vec<Statement>, UcpError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.peek_kind() == TokenKind::Eof {
                break;
            }
            let line = self.peek().line;
            let command = if self.peek_keyword("ATOMIC") {
                self.parse_atomic()?
            } else {
                self.parse_command()?
            };
            self.expect_statement_end(false)?;
            statements.push(Statement::new(line, command));
        }
        Ok(statements)
    }

    fn parse_atomic(&mut self) -> Result<Command, UcpError> {
        self.advance(); // ATOMIC
        self.expect(TokenKind::OpenBrace)?;
        let mut inner = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_kind() {
                TokenKind::CloseBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => return Err(self.error("unclosed ATOMIC block")),
                _ => {}
            }
            if self.peek_keyword("ATOMIC") {
                return Err(self.error("ATOMIC blocks cannot be nested"));
            }
            let line = self.peek().line;
            let command = self.parse_command()?;
            self.expect_statement_end(true)?;
            inner.push(Statement::new(line, command));
        }
        Ok(Command::Atomic(inner))
    }

    fn parse_command(&mut self) -> Result<Command, UcpError> {
        let keyword = self.expect(TokenKind::Word)?.text.to_ascii_uppercase();
        match keyword.as_str() {
            "EDIT" => self.parse_edit(),
            "APPEND" => self.parse_append(),
            "DELETE" => {
                let id = self.parse_id()?;
                let cascade = self.accept_keyword("CASCADE");
                let preserve_children = !cascade && self.accept_keyword("PRESERVE_CHILDREN");
                Ok(Command::Delete {
                    id,
                    cascade,
                    preserve_children,
                })
            }
            "MOVE" => self.parse_move(),
            "LINK" => {
                let source = self.parse_id()?;
                let edge_type = self.parse_edge_type()?;
                let target = self.parse_id()?;
                let properties = if self.accept_keyword("WITH") {
                    self.parse_properties()?
                } else {
                    CustomMap::new()
                };
                Ok(Command::Link {
                    source,
                    edge_type,
                    target,
                    properties,
                })
            }
            "UNLINK" => Ok(Command::Unlink {
                source: self.parse_id()?,
                edge_type: self.parse_edge_type()?,
                target: self.parse_id()?,
            }),
            "PRUNE" => {
                let target = self.expect(TokenKind::Word)?.text.clone();
                if target.eq_ignore_ascii_case("unreachable") {
                    Ok(Command::Prune)
                } else {
                    Err(self.error(format!("unknown prune target '{target}'")))
                }
            }
            _ => Err(self.error(format!("unknown command '{keyword}'"))),
        }
    }

    /// `EDIT <id> SET [<path>] (= | += | -=) "<value>"`; a bare value sets `text`.
    fn parse_edit(&mut self) -> Result<Command, UcpError> {
        let id = self.parse_id()?;
        self.expect_keyword("SET")?;
        let (path, op) = match self.peek_kind() {
            TokenKind::Str => ("text".to_string(), EditOp::Set),
            TokenKind::Equals => {
                self.advance();
                ("text".to_string(), EditOp::Set)
            }
            _ => {
                let path = self.expect(TokenKind::Word)?.text.clone();
                let op = match self.peek_kind() {
                    TokenKind::Equals => EditOp::Set,
                    TokenKind::PlusEquals => EditOp::Add,
                    TokenKind::MinusEquals => EditOp::Remove,
                    _ => return Err(self.error("expected '=', '+=' or '-='")),
                };
                self.advance();
                (path, op)
            }
        };
        let value = self.expect(TokenKind::Str)?.text.clone();
        Ok(Command::Edit {
            id,
            path,
            op,
            value,
        })
    }

    /// `APPEND <parent> [<type>] [AT <n>] :: <content> [WITH k=v, ...]`
    fn parse_append(&mut self) -> Result<Command, UcpError> {
        let parent = self.parse_id()?;
        let content_type = if self.peek_kind() == TokenKind::Word && !self.peek_keyword("AT") {
            let name = self.expect(TokenKind::Word)?.text.clone();
            Some(
                ContentType::parse(&name)
                    .ok_or_else(|| self.error(format!("unknown content type '{name}'")))?,
            )
        } else {
            None
        };
        let index = if self.accept_keyword("AT") {
            Some(self.parse_index()?)
        } else {
            None
        };
        self.expect(TokenKind::DoubleColon)?;

        let (content, quoted) = match self.peek_kind() {
            TokenKind::Str => (self.expect(TokenKind::Str)?.text.clone(), true),
            TokenKind::Raw => (self.expect(TokenKind::Raw)?.text.clone(), false),
            _ => return Err(self.error("expected content after '::'")),
        };

        let properties = if quoted && self.accept_keyword("WITH") {
            self.parse_properties()?
        } else {
            CustomMap::new()
        };

        Ok(Command::Append {
            parent,
            content_type,
            index,
            content,
            properties,
        })
    }

    /// `k=v, k=v, ...` following `WITH`.
    fn parse_properties(&mut self) -> Result<CustomMap, UcpError> {
        let mut properties = CustomMap::new();
        loop {
            let key = self.expect(TokenKind::Word)?.text.clone();
            self.expect(TokenKind::Equals)?;
            let value = match self.peek_kind() {
                TokenKind::Str => CustomValue::String(self.expect(TokenKind::Str)?.text.clone()),
                _ => CustomValue::from_literal(&self.expect(TokenKind::Word)?.text),
            };
            properties.insert(key, value);
            if self.peek_kind() != TokenKind::Comma {
                return Ok(properties);
            }
            self.advance();
        }
    }

    /// `MOVE <id> (TO <parent> [INDEX <n>] | BEFORE <anchor> | AFTER <anchor>)`
    fn parse_move(&mut self) -> Result<Command, UcpError> {
        let id = self.parse_id()?;
        let direction = self.expect(TokenKind::Word)?.text.to_ascii_uppercase();
        match direction.as_str() {
            "TO" => {
                let parent = self.parse_id()?;
                let index = if self.accept_keyword("INDEX") {
                    Some(self.parse_index()?)
                } else {
                    None
                };
                Ok(Command::MoveTo { id, parent, index })
            }
            "BEFORE" => Ok(Command::MoveBefore {
                id,
                anchor: self.parse_id()?,
            }),
            "AFTER" => Ok(Command::MoveAfter {
                id,
                anchor: self.parse_id()?,
            }),
            _ => Err(self.error(format!(
                "expected TO, BEFORE or AFTER, found '{direction}'"
            ))),
        }
    }

    fn parse_index(&mut self) -> Result<usize, UcpError> {
        let raw = self.expect(TokenKind::Word)?.text.clone();
        raw.parse::<usize>()
            .map_err(|_| self.error(format!("invalid index '{raw}'")))
    }

    fn parse_id(&mut self) -> Result<IdRef, UcpError> {
        let raw = self.expect(TokenKind::Word)?.text.clone();
        IdRef::from_token(&raw).ok_or_else(|| self.error(format!("invalid block id '{raw}'")))
    }

    fn parse_edge_type(&mut self) -> Result<EdgeType, UcpError> {
        let raw = self.expect(TokenKind::Word)?.text.clone();
        EdgeType::parse(&raw).ok_or_else(|| self.error(format!("unknown edge type '{raw}'")))
    }

    // =========================================================================
    // TOKEN HELPERS
    // =========================================================================

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Word && token.text.eq_ignore_ascii_case(keyword)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn accept_keyword(&mut self, keyword: &str) -> bool {
        let matched = self.peek_keyword(keyword);
        if matched {
            self.advance();
        }
        matched
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), UcpError> {
        if self.accept_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected {keyword}")))
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, UcpError> {
        if self.peek_kind() != kind {
            let found = self.peek();
            let found = if found.kind == TokenKind::Word {
                format!("'{}'", found.text)
            } else {
                found.kind.to_string()
            };
            return Err(self.error(format!("expected {kind}, found {found}")));
        }
        let at = self.pos;
        self.advance();
        Ok(&self.tokens[at])
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// A statement must be followed by a separator (or `}` inside ATOMIC).
    fn expect_statement_end(&mut self, in_atomic: bool) -> Result<(), UcpError> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => Ok(()),
            TokenKind::CloseBrace if in_atomic => Ok(()),
            _ => {
                let token = self.peek();
                Err(self.error(format!("unexpected '{}' after command", token.text)))
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> UcpError {
        let line = self.peek().line;
        UcpError::syntax(line, line_fragment(self.source, line), message)
    }
}

// =============================================================================
// TESTS
// =============================================================================
