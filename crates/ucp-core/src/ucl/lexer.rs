//! Lexer: tokenizes UCL source text
//!
//! UCL is line-oriented, so newlines are tokens. Keywords are not
//! distinguished here; the parser matches words case-insensitively.
//!
//! Content after `::` that does not start with a quote is captured raw up
//! to the end of the line (inside `ATOMIC { ... }` also up to `;` or `}`).

use crate::UcpError;

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Word text, unescaped string value, or raw content
    pub text: String,
    /// Line number (1-based)
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }
}

/// Token types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Str,
    Raw,
    DoubleColon,
    Equals,
    PlusEquals,
    MinusEquals,
    Comma,
    Semicolon,
    OpenBrace,
    CloseBrace,
    Newline,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Word => write!(f, "word"),
            Self::Str => write!(f, "string literal"),
            Self::Raw => write!(f, "content"),
            Self::DoubleColon => write!(f, "'::'"),
            Self::Equals => write!(f, "'='"),
            Self::PlusEquals => write!(f, "'+='"),
            Self::MinusEquals => write!(f, "'-='"),
            Self::Comma => write!(f, "','"),
            Self::Semicolon => write!(f, "';'"),
            Self::OpenBrace => write!(f, "'{{'"),
            Self::CloseBrace => write!(f, "'}}'"),
            Self::Newline => write!(f, "end of line"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Characters allowed in a bare word (ids, keywords, paths, literals).
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+')
}

/// The trimmed text of a 1-based source line, for error fragments.
pub(crate) fn line_fragment(source: &str, line: usize) -> String {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Lexer for UCL
pub struct Lexer<'a> {
    source: &'a str,
    input: Vec<char>,
    pos: usize,
    line: usize,
    /// Open `{` count; raw content stops at `;`/`}` inside braces.
    depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.chars().collect(),
            pos: 0,
            line: 1,
            depth: 0,
        }
    }

    /// Tokenize the entire input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, UcpError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_blanks_and_comments();
            let Some(ch) = self.peek_at(0) else {
                tokens.push(Token::new(TokenKind::Eof, "", self.line));
                break;
            };
            let line = self.line;
            match ch {
                '\n' => {
                    self.advance();
                    tokens.push(Token::new(TokenKind::Newline, "\n", line));
                }
                ':' if self.peek_at(1) == Some(':') => {
                    self.advance();
                    self.advance();
                    tokens.push(Token::new(TokenKind::DoubleColon, "::", line));
                    if let Some(raw) = self.read_raw_content() {
                        tokens.push(Token::new(TokenKind::Raw, raw, line));
                    }
                }
                '=' => tokens.push(self.single(TokenKind::Equals, "=")),
                '+' | '-' if self.peek_at(1) == Some('=') => {
                    let (kind, text) = if ch == '+' {
                        (TokenKind::PlusEquals, "+=")
                    } else {
                        (TokenKind::MinusEquals, "-=")
                    };
                    self.advance();
                    self.advance();
                    tokens.push(Token::new(kind, text, line));
                }
                ',' => tokens.push(self.single(TokenKind::Comma, ",")),
                ';' => tokens.push(self.single(TokenKind::Semicolon, ";")),
                '{' => {
                    self.depth += 1;
                    tokens.push(self.single(TokenKind::OpenBrace, "{"));
                }
                '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    tokens.push(self.single(TokenKind::CloseBrace, "}"));
                }
                '"' => tokens.push(self.read_string()?),
                c if is_word_char(c) => tokens.push(self.read_word()),
                other => {
                    return Err(self.error(format!("unexpected character '{other}'")));
                }
            }
        }
        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind, text: &str) -> Token {
        let token = Token::new(kind, text, self.line);
        self.advance();
        token
    }

    fn read_word(&mut self) -> Token {
        let line = self.line;
        let mut text = String::new();
        while let Some(c) = self.peek_at(0).filter(|c| is_word_char(*c)) {
            // `tags+=` ends the word before the operator
            if matches!(c, '+' | '-') && self.peek_at(1) == Some('=') {
                break;
            }
            text.push(c);
            self.advance();
        }
        Token::new(TokenKind::Word, text, line)
    }

    fn read_string(&mut self) -> Result<Token, UcpError> {
        let line = self.line;
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek_at(0) {
                None | Some('\n') => return Err(self.error("unterminated string literal")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let unescaped = match self.peek_at(1) {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) if other != '\n' => {
                            return Err(self.error(format!("unknown escape '\\{other}'")));
                        }
                        _ => return Err(self.error("unterminated string literal")),
                    };
                    text.push(unescaped);
                    self.advance();
                    self.advance();
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::Str, text, line))
    }

    /// Capture unquoted content following `::`, if any.
    fn read_raw_content(&mut self) -> Option<String> {
        while matches!(self.peek_at(0), Some(' ' | '\t' | '\r')) {
            self.advance();
        }
        match self.peek_at(0) {
            None | Some('"' | '\n') => return None,
            _ => {}
        }
        let mut raw = String::new();
        while let Some(c) = self.peek_at(0) {
            if c == '\n' || (self.depth > 0 && matches!(c, ';' | '}')) {
                break;
            }
            raw.push(c);
            self.advance();
        }
        let trimmed = raw.trim_end();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn skip_blanks_and_comments(&mut self) {
        while let Some(ch) = self.peek_at(0) {
            if ch != '\n' && ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_at(1) == Some('/') {
                while self.peek_at(0).is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> UcpError {
        UcpError::syntax(self.line, line_fragment(self.source, self.line), message)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_at(0) {
            if c == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}
