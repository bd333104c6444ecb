//! Parser for INSERT headers and value tuples.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use super::lexer::{Lexer, LexerError, Token, TokenKind};

/// The kind of a literal found in a value tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    /// Single-quoted string.
    Text,
    /// Bare integer, optionally negative.
    Integer,
    /// Bare decimal or exponent number.
    Numeric,
    /// `true` or `false`.
    Boolean,
    /// `NULL`.
    Null,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LiteralKind::Text => "text",
            LiteralKind::Integer => "integer",
            LiteralKind::Numeric => "numeric",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Null => "NULL",
        })
    }
}

/// One literal of a value tuple, with its exact source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'input> {
    /// What kind of literal this is.
    pub kind: LiteralKind,
    /// Source text of the literal, including quotes and any `::type` cast.
    pub raw: &'input str,
    /// Whitespace (and comments) between the preceding `(` or `,` and the literal.
    pub leading: &'input str,
}

/// A parenthesized value tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple<'input> {
    /// The fields, in source order.
    pub fields: Vec<Field<'input>>,
    /// Whitespace between the last field and the closing parenthesis.
    pub trailing: &'input str,
}

/// A table or column identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier<'input> {
    /// The identifier, with quoting removed.
    pub name: Cow<'input, str>,
    /// Whether the identifier was written in double quotes.
    pub quoted: bool,
}

impl<'input> Identifier<'input> {
    /// Build a double-quoted identifier.
    #[must_use]
    pub fn quoted(name: impl Into<Cow<'input, str>>) -> Self {
        Self {
            name: name.into(),
            quoted: true,
        }
    }

    /// Build a bare identifier.
    #[must_use]
    pub fn bare(name: impl Into<Cow<'input, str>>) -> Self {
        Self {
            name: name.into(),
            quoted: false,
        }
    }
}

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName<'input> {
    /// Schema qualifier, such as `public`.
    pub schema: Option<Identifier<'input>>,
    /// Table name.
    pub name: Identifier<'input>,
}

/// The `INSERT INTO name (columns) VALUES` prefix of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertHeader<'input> {
    /// Target table.
    pub table: QualifiedName<'input>,
    /// Declared column list.
    pub columns: Vec<Identifier<'input>>,
    /// Source span of each column identifier.
    pub column_spans: Vec<Range<usize>>,
    /// Source span from `INSERT` through `VALUES`.
    pub span: Range<usize>,
}

impl InsertHeader<'_> {
    /// Column names with quoting removed.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_ref()).collect()
    }
}

/// SQL parser errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Lexer error.
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),
    /// Unexpected token.
    #[error("Unexpected token {found} at position {pos}, expected {expected}")]
    UnexpectedToken {
        /// What was expected.
        expected: &'static str,
        /// What was found.
        found: &'static str,
        /// Position in input.
        pos: usize,
    },
    /// Empty column list in an INSERT header.
    #[error("Empty column list at position {pos}")]
    EmptyColumnList {
        /// Position of the closing parenthesis.
        pos: usize,
    },
    /// A value tuple with no values.
    #[error("Empty value tuple at position {pos}")]
    EmptyTuple {
        /// Position of the closing parenthesis.
        pos: usize,
    },
}

impl ParseError {
    /// The same error with its position moved `by` bytes later, for errors
    /// found in a slice that starts `by` bytes into a larger document.
    #[must_use]
    pub fn offset(self, by: usize) -> Self {
        match self {
            Self::Lexer(error) => Self::Lexer(error.offset(by)),
            Self::UnexpectedToken {
                expected,
                found,
                pos,
            } => Self::UnexpectedToken {
                expected,
                found,
                pos: pos + by,
            },
            Self::EmptyColumnList { pos } => Self::EmptyColumnList { pos: pos + by },
            Self::EmptyTuple { pos } => Self::EmptyTuple { pos: pos + by },
        }
    }
}

/// Parser over a lexer that remembers where the last consumed token ended.
pub struct Parser<'input> {
    lexer: Lexer<'input>,
    last_end: usize,
}

impl<'input> Parser<'input> {
    /// Create a new parser for the given input.
    #[must_use]
    pub fn new(input: &'input str) -> Self {
        Self::at(input, 0)
    }

    /// Create a parser that starts at byte offset `pos` of `input`.
    #[must_use]
    pub fn at(input: &'input str, pos: usize) -> Self {
        Self {
            lexer: Lexer::at(input, pos),
            last_end: pos,
        }
    }

    /// Byte offset just past the last consumed token.
    #[must_use]
    pub fn position(&self) -> usize {
        self.last_end
    }

    /// Parse `INSERT INTO [schema.]table (col, ...) VALUES`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input at the current position is not an
    /// INSERT header with an explicit column list.
    pub fn parse_insert_header(&mut self) -> Result<InsertHeader<'input>, ParseError> {
        let insert = self.expect(&TokenKind::Insert)?;
        self.expect(&TokenKind::Into)?;

        let first = self.expect_identifier()?;
        let table = if self.lexer.peek()?.kind == TokenKind::Dot {
            self.next()?;
            QualifiedName {
                schema: Some(first),
                name: self.expect_identifier()?,
            }
        } else {
            QualifiedName {
                schema: None,
                name: first,
            }
        };

        self.expect(&TokenKind::LParen)?;
        let peeked = self.lexer.peek()?;
        if peeked.kind == TokenKind::RParen {
            return Err(ParseError::EmptyColumnList { pos: peeked.pos });
        }

        let mut columns = Vec::new();
        let mut column_spans = Vec::new();
        loop {
            let start = self.lexer.peek()?.pos;
            columns.push(self.expect_identifier()?);
            column_spans.push(start..self.last_end);

            let token = self.next()?;
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RParen => break,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "',' or ')' in column list",
                        found: other.static_name(),
                        pos: token.pos,
                    });
                }
            }
        }

        let values = self.expect(&TokenKind::Values)?;

        Ok(InsertHeader {
            table,
            columns,
            column_spans,
            span: insert.pos..values.end,
        })
    }

    /// Parse exactly one parenthesized value tuple spanning the rest of the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the tuple is malformed, empty, or followed by
    /// anything other than end of input.
    pub fn parse_tuple(&mut self) -> Result<Tuple<'input>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let peeked = self.lexer.peek()?;
        if peeked.kind == TokenKind::RParen {
            return Err(ParseError::EmptyTuple { pos: peeked.pos });
        }

        let mut fields = Vec::new();
        let trailing = loop {
            let leading_start = self.last_end;
            let value_start = self.lexer.peek()?.pos;
            let mut field = self.parse_value()?;
            field.leading = &self.lexer.input()[leading_start..value_start];
            fields.push(field);

            let before_separator = self.last_end;
            let token = self.next()?;
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RParen => break &self.lexer.input()[before_separator..token.pos],
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "',' or ')' after value",
                        found: other.static_name(),
                        pos: token.pos,
                    });
                }
            }
        };

        self.expect(&TokenKind::Eof)?;
        Ok(Tuple { fields, trailing })
    }

    /// Parse a single literal spanning the whole input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly one literal.
    pub fn parse_literal(&mut self) -> Result<Field<'input>, ParseError> {
        let field = self.parse_value()?;
        self.expect(&TokenKind::Eof)?;
        Ok(field)
    }

    /// Parse a value literal with an optional `::type` cast.
    fn parse_value(&mut self) -> Result<Field<'input>, ParseError> {
        let token = self.next()?;
        let start = token.pos;
        let kind = match token.kind {
            TokenKind::StringLiteral(_) => LiteralKind::Text,
            TokenKind::IntegerLiteral(_) => LiteralKind::Integer,
            TokenKind::NumericLiteral(_) => LiteralKind::Numeric,
            TokenKind::True | TokenKind::False => LiteralKind::Boolean,
            TokenKind::Null => LiteralKind::Null,
            TokenKind::Minus => {
                let number = self.next()?;
                match number.kind {
                    TokenKind::IntegerLiteral(_) => LiteralKind::Integer,
                    TokenKind::NumericLiteral(_) => LiteralKind::Numeric,
                    other => {
                        return Err(ParseError::UnexpectedToken {
                            expected: "number after minus",
                            found: other.static_name(),
                            pos: number.pos,
                        });
                    }
                }
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "value (string, number, boolean, or NULL)",
                    found: other.static_name(),
                    pos: token.pos,
                });
            }
        };

        // Casts such as `::jsonb` or `::timestamp with time zone`
        while self.lexer.peek()?.kind == TokenKind::DoubleColon {
            self.next()?;
            self.expect_identifier()?;
            while matches!(self.lexer.peek()?.kind, TokenKind::Identifier(_)) {
                self.next()?;
            }
        }

        Ok(Field {
            kind,
            raw: &self.lexer.input()[start..self.last_end],
            leading: "",
        })
    }

    fn next(&mut self) -> Result<Token<'input>, ParseError> {
        let token = self.lexer.next()?;
        if token.kind != TokenKind::Eof {
            self.last_end = token.end;
        }
        Ok(token)
    }

    /// Expect a specific token kind.
    fn expect(&mut self, expected: &TokenKind<'_>) -> Result<Token<'input>, ParseError> {
        let token = self.next()?;
        if std::mem::discriminant(&token.kind) == std::mem::discriminant(expected) {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.static_name(),
                found: token.kind.static_name(),
                pos: token.pos,
            })
        }
    }

    /// Expect an identifier, bare or quoted.
    fn expect_identifier(&mut self) -> Result<Identifier<'input>, ParseError> {
        let token = self.next()?;
        let text = self.lexer.slice(&token);
        match token.kind {
            TokenKind::Identifier(name) => Ok(Identifier::bare(name)),
            TokenKind::QuotedIdentifier(name) => Ok(Identifier::quoted(name)),
            // Keywords are accepted as bare names where an identifier is required
            TokenKind::Insert
            | TokenKind::Into
            | TokenKind::Values
            | TokenKind::Null
            | TokenKind::True
            | TokenKind::False => Ok(Identifier::bare(text)),
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier",
                found: other.static_name(),
                pos: token.pos,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_header() {
        let sql = r#"INSERT INTO "public"."match_games" ("id", "game_number") VALUES"#;
        let header = Parser::new(sql).parse_insert_header().unwrap();
        assert_eq!(header.table.schema, Some(Identifier::quoted("public")));
        assert_eq!(header.table.name, Identifier::quoted("match_games"));
        assert_eq!(header.column_names(), vec!["id", "game_number"]);
        assert_eq!(header.span, 0..sql.len());
        assert_eq!(&sql[header.column_spans[1].clone()], "\"game_number\"");
    }

    #[test]
    fn test_parse_bare_header_at_offset() {
        let sql = "-- data\nINSERT INTO users (id, name) VALUES\n\t(1, 'a');";
        let mut parser = Parser::at(sql, 8);
        let header = parser.parse_insert_header().unwrap();
        assert_eq!(header.table.schema, None);
        assert_eq!(header.table.name, Identifier::bare("users"));
        assert_eq!(&sql[header.span.clone()], "INSERT INTO users (id, name) VALUES");
        assert_eq!(parser.position(), header.span.end);
    }

    #[test]
    fn test_header_requires_column_list() {
        let err = Parser::new("INSERT INTO users VALUES").parse_insert_header();
        assert!(matches!(
            err,
            Err(ParseError::UnexpectedToken { expected: "(", .. })
        ));
        let err = Parser::new("INSERT INTO users () VALUES").parse_insert_header();
        assert_eq!(err, Err(ParseError::EmptyColumnList { pos: 19 }));
    }

    #[test]
    fn test_parse_tuple_preserves_raw_text_and_spacing() {
        let tuple = Parser::new("('a1','m1', 2, false, NULL, -3.5 )")
            .parse_tuple()
            .unwrap();
        let raws: Vec<_> = tuple.fields.iter().map(|f| f.raw).collect();
        assert_eq!(raws, vec!["'a1'", "'m1'", "2", "false", "NULL", "-3.5"]);
        let leading: Vec<_> = tuple.fields.iter().map(|f| f.leading).collect();
        assert_eq!(leading, vec!["", "", " ", " ", " ", " "]);
        let kinds: Vec<_> = tuple.fields.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LiteralKind::Text,
                LiteralKind::Text,
                LiteralKind::Integer,
                LiteralKind::Boolean,
                LiteralKind::Null,
                LiteralKind::Numeric,
            ]
        );
        assert_eq!(tuple.trailing, " ");
    }

    #[test]
    fn test_parse_tuple_with_embedded_separators() {
        let tuple = Parser::new("('O''Brien, Pat', '(555) 010-0199')")
            .parse_tuple()
            .unwrap();
        assert_eq!(tuple.fields.len(), 2);
        assert_eq!(tuple.fields[0].raw, "'O''Brien, Pat'");
        assert_eq!(tuple.fields[1].raw, "'(555) 010-0199'");
    }

    #[test]
    fn test_parse_tuple_with_casts() {
        let tuple = Parser::new("('{}'::jsonb, '2025-01-01'::timestamp with time zone)")
            .parse_tuple()
            .unwrap();
        assert_eq!(tuple.fields[0].raw, "'{}'::jsonb");
        assert_eq!(tuple.fields[0].kind, LiteralKind::Text);
        assert_eq!(
            tuple.fields[1].raw,
            "'2025-01-01'::timestamp with time zone"
        );
    }

    #[test]
    fn test_error_offset() {
        let err = Parser::new("(1, 'open").parse_tuple().unwrap_err();
        assert_eq!(
            err.offset(100),
            ParseError::Lexer(LexerError::UnterminatedString { pos: 104 })
        );
        let err = Parser::new("()").parse_tuple().unwrap_err();
        assert_eq!(err.offset(10), ParseError::EmptyTuple { pos: 11 });
    }

    #[test]
    fn test_parse_tuple_errors() {
        assert_eq!(
            Parser::new("()").parse_tuple(),
            Err(ParseError::EmptyTuple { pos: 1 })
        );
        assert!(matches!(
            Parser::new("(1, now())").parse_tuple(),
            Err(ParseError::UnexpectedToken {
                found: "<identifier>",
                ..
            })
        ));
        assert!(matches!(
            Parser::new("(1 2)").parse_tuple(),
            Err(ParseError::UnexpectedToken {
                expected: "',' or ')' after value",
                ..
            })
        ));
        assert!(matches!(
            Parser::new("(1) extra").parse_tuple(),
            Err(ParseError::UnexpectedToken {
                expected: "<eof>",
                ..
            })
        ));
        assert!(matches!(
            Parser::new("('open)").parse_tuple(),
            Err(ParseError::Lexer(LexerError::UnterminatedString { pos: 1 }))
        ));
    }

    #[test]
    fn test_parse_literal() {
        let field = Parser::new("'eight_ball'").parse_literal().unwrap();
        assert_eq!(field.kind, LiteralKind::Text);
        assert_eq!(field.raw, "'eight_ball'");
        assert!(Parser::new("'a', 'b'").parse_literal().is_err());
        assert!(Parser::new("eight_ball").parse_literal().is_err());
    }
}
