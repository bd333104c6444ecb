//! SQL lexer for tokenizing dump text.
//!
//! Tokens borrow from the input and carry their byte span, so callers can
//! always recover the exact source text of a literal.

use std::borrow::Cow;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'input> {
    /// The kind of token.
    pub kind: TokenKind<'input>,
    /// Byte offset where this token starts.
    pub pos: usize,
    /// Byte offset one past the end of this token.
    pub end: usize,
}

/// The different kinds of tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'input> {
    // Keywords
    /// INSERT keyword
    Insert,
    /// INTO keyword
    Into,
    /// VALUES keyword
    Values,
    /// NULL keyword
    Null,
    /// TRUE keyword
    True,
    /// FALSE keyword
    False,

    // Literals
    /// Integer literal, kept as written.
    IntegerLiteral(&'input str),
    /// Decimal or exponent literal, kept as written.
    NumericLiteral(&'input str),
    /// Single-quoted string literal (escapes resolved).
    StringLiteral(Cow<'input, str>),

    // Identifiers
    /// A bare identifier.
    Identifier(&'input str),
    /// A double-quoted identifier (doubled quotes resolved).
    QuotedIdentifier(Cow<'input, str>),

    // Symbols
    /// Left parenthesis
    LParen,
    /// Right parenthesis
    RParen,
    /// Comma
    Comma,
    /// Semicolon
    Semicolon,
    /// Dot
    Dot,
    /// `::` cast operator
    DoubleColon,
    /// Minus sign
    Minus,

    // Special
    /// End of input
    Eof,
}

impl TokenKind<'_> {
    /// Returns a `'static` descriptive name for this token kind.
    ///
    /// Unlike the token itself, this never borrows from the input and is
    /// safe to store in error types.
    #[must_use]
    pub fn static_name(&self) -> &'static str {
        match self {
            TokenKind::Insert => "INSERT",
            TokenKind::Into => "INTO",
            TokenKind::Values => "VALUES",
            TokenKind::Null => "NULL",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::IntegerLiteral(_) => "<integer>",
            TokenKind::NumericLiteral(_) => "<numeric>",
            TokenKind::StringLiteral(_) => "<string>",
            TokenKind::Identifier(_) => "<identifier>",
            TokenKind::QuotedIdentifier(_) => "<quoted identifier>",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::DoubleColon => "::",
            TokenKind::Minus => "-",
            TokenKind::Eof => "<eof>",
        }
    }
}

/// SQL lexer that produces tokens from input.
pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    peeked: Option<Token<'input>>,
}

impl<'input> Lexer<'input> {
    /// Create a new lexer for the given input.
    #[must_use]
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            pos: 0,
            peeked: None,
        }
    }

    /// Create a lexer that starts tokenizing at byte offset `pos`.
    ///
    /// Token positions stay absolute with respect to `input`.
    #[must_use]
    pub fn at(input: &'input str, pos: usize) -> Self {
        Self {
            input,
            pos: pos.min(input.len()),
            peeked: None,
        }
    }

    /// The text being tokenized.
    #[must_use]
    pub fn input(&self) -> &'input str {
        self.input
    }

    /// Source text covered by a token.
    #[must_use]
    pub fn slice(&self, token: &Token<'_>) -> &'input str {
        &self.input[token.pos..token.end]
    }

    /// Peek at the next token without consuming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the next token cannot be lexed.
    pub fn peek(&mut self) -> Result<&Token<'input>, LexerError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Consume and return the next token.
    ///
    /// # Errors
    ///
    /// Returns an error if the next token cannot be lexed.
    pub fn next(&mut self) -> Result<Token<'input>, LexerError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        self.next_token()
    }

    /// Skip whitespace and comments.
    fn skip_whitespace(&mut self) -> Result<(), LexerError> {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'-' && bytes.get(self.pos + 1) == Some(&b'-') {
                // Line comment
                self.pos += 2;
                while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else if b == b'/' && bytes.get(self.pos + 1) == Some(&b'*') {
                // Block comment
                let start = self.pos;
                self.pos += 2;
                while self.pos + 1 < bytes.len()
                    && !(bytes[self.pos] == b'*' && bytes[self.pos + 1] == b'/')
                {
                    self.pos += 1;
                }
                if self.pos + 1 >= bytes.len() {
                    return Err(LexerError::UnterminatedComment { pos: start });
                }
                self.pos += 2;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token<'input>, LexerError> {
        self.skip_whitespace()?;

        let start_pos = self.pos;
        let bytes = self.input.as_bytes();

        let Some(&b) = bytes.get(self.pos) else {
            return Ok(Token {
                kind: TokenKind::Eof,
                pos: start_pos,
                end: start_pos,
            });
        };

        let kind = match b {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' if !bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit) => TokenKind::Dot,
            b'-' => TokenKind::Minus,
            b':' if bytes.get(self.pos + 1) == Some(&b':') => {
                self.pos += 2;
                return Ok(self.token(TokenKind::DoubleColon, start_pos));
            }
            b'\'' => return self.read_string(start_pos, false),
            b'"' => return self.read_quoted_identifier(start_pos),
            b'E' | b'e' if bytes.get(self.pos + 1) == Some(&b'\'') => {
                self.pos += 1;
                return self.read_string(start_pos, true);
            }
            b'.' => return Ok(self.read_number(start_pos)),
            _ if b.is_ascii_digit() => return Ok(self.read_number(start_pos)),
            _ if is_ident_start(b) => return Ok(self.read_identifier(start_pos)),
            _ => {
                return Err(LexerError::UnexpectedChar {
                    char: self.input[start_pos..].chars().next().unwrap_or('\u{FFFD}'),
                    pos: start_pos,
                });
            }
        };

        self.pos += 1;
        Ok(self.token(kind, start_pos))
    }

    fn token(&self, kind: TokenKind<'input>, pos: usize) -> Token<'input> {
        Token {
            kind,
            pos,
            end: self.pos,
        }
    }

    /// Read a single-quoted string. `self.pos` must sit on the opening quote.
    ///
    /// With `backslash_escapes` set (an `E'...'` string), `\'` and `\\` are
    /// resolved; any other backslash sequence is kept verbatim.
    fn read_string(
        &mut self,
        start_pos: usize,
        backslash_escapes: bool,
    ) -> Result<Token<'input>, LexerError> {
        let bytes = self.input.as_bytes();
        self.pos += 1;
        let content_start = self.pos;

        let mut owned: Option<String> = None;
        let mut segment_start = content_start;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\'' if bytes.get(self.pos + 1) == Some(&b'\'') => {
                    let buf = owned.get_or_insert_with(String::new);
                    buf.push_str(&self.input[segment_start..=self.pos]);
                    self.pos += 2;
                    segment_start = self.pos;
                }
                b'\'' => {
                    let tail = &self.input[segment_start..self.pos];
                    self.pos += 1;
                    let value = match owned {
                        Some(mut buf) => {
                            buf.push_str(tail);
                            Cow::Owned(buf)
                        }
                        None => Cow::Borrowed(&self.input[content_start..self.pos - 1]),
                    };
                    return Ok(self.token(TokenKind::StringLiteral(value), start_pos));
                }
                b'\\' if backslash_escapes && self.pos + 1 < bytes.len() => {
                    let escaped = bytes[self.pos + 1];
                    let buf = owned.get_or_insert_with(String::new);
                    buf.push_str(&self.input[segment_start..self.pos]);
                    if escaped == b'\'' || escaped == b'\\' {
                        buf.push(char::from(escaped));
                        self.pos += 2;
                        segment_start = self.pos;
                    } else {
                        segment_start = self.pos;
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }

        Err(LexerError::UnterminatedString { pos: start_pos })
    }

    fn read_quoted_identifier(&mut self, start_pos: usize) -> Result<Token<'input>, LexerError> {
        let bytes = self.input.as_bytes();
        self.pos += 1;
        let content_start = self.pos;

        let mut owned: Option<String> = None;
        let mut segment_start = content_start;
        while self.pos < bytes.len() {
            if bytes[self.pos] == b'"' {
                if bytes.get(self.pos + 1) == Some(&b'"') {
                    let buf = owned.get_or_insert_with(String::new);
                    buf.push_str(&self.input[segment_start..=self.pos]);
                    self.pos += 2;
                    segment_start = self.pos;
                    continue;
                }
                let tail = &self.input[segment_start..self.pos];
                self.pos += 1;
                let name = match owned {
                    Some(mut buf) => {
                        buf.push_str(tail);
                        Cow::Owned(buf)
                    }
                    None => Cow::Borrowed(&self.input[content_start..self.pos - 1]),
                };
                return Ok(self.token(TokenKind::QuotedIdentifier(name), start_pos));
            }
            self.pos += 1;
        }

        Err(LexerError::UnterminatedIdentifier { pos: start_pos })
    }

    fn read_number(&mut self, start_pos: usize) -> Token<'input> {
        let bytes = self.input.as_bytes();

        while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        let mut is_numeric = false;
        if self.pos < bytes.len() && bytes[self.pos] == b'.' {
            is_numeric = true;
            self.pos += 1;
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }

        if self.pos < bytes.len() && (bytes[self.pos] == b'e' || bytes[self.pos] == b'E') {
            let mut lookahead = self.pos + 1;
            if lookahead < bytes.len() && (bytes[lookahead] == b'+' || bytes[lookahead] == b'-') {
                lookahead += 1;
            }
            if bytes.get(lookahead).is_some_and(u8::is_ascii_digit) {
                is_numeric = true;
                self.pos = lookahead;
                while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }

        let text = &self.input[start_pos..self.pos];
        let kind = if is_numeric {
            TokenKind::NumericLiteral(text)
        } else {
            TokenKind::IntegerLiteral(text)
        };
        self.token(kind, start_pos)
    }

    fn read_identifier(&mut self, start_pos: usize) -> Token<'input> {
        let bytes = self.input.as_bytes();

        while self.pos < bytes.len() && is_ident_cont(bytes[self.pos]) {
            self.pos += 1;
        }

        let ident = &self.input[start_pos..self.pos];
        let kind = if ident.eq_ignore_ascii_case("INSERT") {
            TokenKind::Insert
        } else if ident.eq_ignore_ascii_case("INTO") {
            TokenKind::Into
        } else if ident.eq_ignore_ascii_case("VALUES") {
            TokenKind::Values
        } else if ident.eq_ignore_ascii_case("NULL") {
            TokenKind::Null
        } else if ident.eq_ignore_ascii_case("TRUE") {
            TokenKind::True
        } else if ident.eq_ignore_ascii_case("FALSE") {
            TokenKind::False
        } else {
            TokenKind::Identifier(ident)
        };

        self.token(kind, start_pos)
    }
}

/// Check if a byte can start an identifier.
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Check if a byte can continue an identifier.
fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Errors that can occur during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexerError {
    /// Unexpected character in input.
    #[error("Unexpected character '{char}' at position {pos}")]
    UnexpectedChar {
        /// The unexpected character.
        char: char,
        /// Position in input.
        pos: usize,
    },
    /// Unterminated string literal.
    #[error("Unterminated string literal starting at position {pos}")]
    UnterminatedString {
        /// Position where the string started.
        pos: usize,
    },
    /// Unterminated quoted identifier.
    #[error("Unterminated quoted identifier starting at position {pos}")]
    UnterminatedIdentifier {
        /// Position where the identifier started.
        pos: usize,
    },
    /// Unterminated block comment.
    #[error("Unterminated block comment starting at position {pos}")]
    UnterminatedComment {
        /// Position where the comment started.
        pos: usize,
    },
}

impl LexerError {
    /// The same error with its position moved `by` bytes later.
    #[must_use]
    pub fn offset(self, by: usize) -> Self {
        match self {
            Self::UnexpectedChar { char, pos } => Self::UnexpectedChar { char, pos: pos + by },
            Self::UnterminatedString { pos } => Self::UnterminatedString { pos: pos + by },
            Self::UnterminatedIdentifier { pos } => Self::UnterminatedIdentifier { pos: pos + by },
            Self::UnterminatedComment { pos } => Self::UnterminatedComment { pos: pos + by },
        }
    }
}
