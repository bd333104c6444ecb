//! Locating INSERT statement blocks in a dump and cutting them into rows.
//!
//! A block runs from `INSERT INTO` through the `;` that follows its last
//! value tuple. Rows are found with a quote-aware scan, so commas,
//! parentheses and semicolons inside string literals never split a row.
//! Each row is kept as raw text here; typing its fields is the parser's job.

use std::fmt;
use std::ops::Range;

use crate::sql::{InsertHeader, Parser};

/// The table a migration step targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Required schema qualifier. `None` matches any or no qualifier.
    pub schema: Option<String>,
    /// Unquoted table name.
    pub table: String,
}

impl TableRef {
    /// Target a table by name, with any schema qualifier.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    /// Require the given schema qualifier.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Whether an INSERT header targets this table.
    #[must_use]
    pub fn matches(&self, header: &InsertHeader<'_>) -> bool {
        if header.table.name.name != self.table.as_str() {
            return false;
        }
        match (&self.schema, &header.table.schema) {
            (None, _) => true,
            (Some(expected), Some(found)) => found.name == expected.as_str(),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.table),
            None => f.write_str(&self.table),
        }
    }
}

/// The punctuation that ends a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `,`: another row follows.
    Comma,
    /// `;`: last row of the statement.
    Semicolon,
}

impl Terminator {
    /// The terminator for the row at `index` of `count` emitted rows.
    #[must_use]
    pub fn for_position(index: usize, count: usize) -> Self {
        if index + 1 == count {
            Terminator::Semicolon
        } else {
            Terminator::Comma
        }
    }

    /// The terminator character.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Terminator::Comma => ',',
            Terminator::Semicolon => ';',
        }
    }
}

/// One value tuple of a statement block, as source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRow<'input> {
    /// Text between the previous terminator (or `VALUES`) and the tuple,
    /// typically a newline and a tab.
    pub lead: &'input str,
    /// The tuple, from `(` through the matching `)`.
    pub tuple: &'input str,
    /// Text between the closing `)` and the terminator.
    pub after: &'input str,
    /// Terminator found in the source.
    pub terminator: Terminator,
    /// Byte offset of the tuple in the document.
    pub pos: usize,
    /// 1-based line of the tuple in the document.
    pub line: usize,
}

/// A located INSERT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBlock<'input> {
    /// Parsed header.
    pub header: InsertHeader<'input>,
    /// Rows in source order.
    pub rows: Vec<RawRow<'input>>,
    /// Span of the whole statement in the document, `;` included.
    pub span: Range<usize>,
    /// Source text of the whole statement.
    pub text: &'input str,
}

/// Structural errors that prevent cutting a statement into rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    /// A quoted string or identifier never closes.
    #[error("Unterminated quoted text starting at position {pos}")]
    UnterminatedQuote {
        /// Position of the opening quote.
        pos: usize,
    },
    /// A value tuple never closes.
    #[error("Unterminated value tuple starting at position {pos}")]
    UnterminatedTuple {
        /// Position of the opening parenthesis.
        pos: usize,
    },
    /// Something other than a tuple or separator between rows.
    #[error("Unexpected '{found}' at position {pos}, expected {expected}")]
    UnexpectedText {
        /// What was expected.
        expected: &'static str,
        /// The offending character.
        found: char,
        /// Position in the document.
        pos: usize,
    },
    /// The statement reaches end of input without a `;`.
    #[error("INSERT statement starting at position {pos} has no terminating ';'")]
    MissingTerminator {
        /// Position of the statement's `INSERT` keyword.
        pos: usize,
    },
}

const INSERT_PREFIX: &str = "INSERT INTO";

/// Find every INSERT statement for `target` in `document`.
///
/// Statements are recognised only where `INSERT INTO` (as written by dump
/// tools, upper case) starts a line. Headers that fail to parse are skipped.
///
/// # Errors
///
/// Returns an error if a statement for `target` cannot be cut into rows.
pub fn find_blocks<'input>(
    document: &'input str,
    target: &TableRef,
) -> Result<Vec<StatementBlock<'input>>, BlockError> {
    let mut blocks = Vec::new();
    let mut resume_at = 0;
    let mut lines = LineCounter::default();

    for (idx, _) in document.match_indices(INSERT_PREFIX) {
        if idx < resume_at || !starts_line(document, idx) {
            continue;
        }

        let mut parser = Parser::at(document, idx);
        let header = match parser.parse_insert_header() {
            Ok(header) => header,
            Err(error) => {
                tracing::debug!(pos = idx, %error, "skipping unparseable INSERT header");
                continue;
            }
        };
        let wanted = target.matches(&header);

        // Other tables' rows are still scanned so text inside their string
        // literals is never mistaken for a statement.
        let values_end = header.span.end;
        let line = lines.line_at(document, values_end);
        let (rows, end) = match scan_rows(document, idx, values_end, line) {
            Ok(scanned) => scanned,
            Err(error) if wanted => return Err(error),
            Err(error) => {
                tracing::debug!(pos = idx, %error, "skipping malformed statement");
                continue;
            }
        };
        resume_at = end;
        if !wanted {
            continue;
        }
        tracing::trace!(
            table = %target,
            pos = idx,
            rows = rows.len(),
            "located statement block"
        );
        blocks.push(StatementBlock {
            header,
            rows,
            span: idx..end,
            text: &document[idx..end],
        });
    }

    Ok(blocks)
}

fn starts_line(document: &str, idx: usize) -> bool {
    document[..idx]
        .rsplit('\n')
        .next()
        .is_none_or(|prefix| prefix.trim().is_empty())
}

/// Incremental 1-based line lookup for increasing offsets.
#[derive(Default)]
struct LineCounter {
    pos: usize,
    newlines: usize,
}

impl LineCounter {
    fn line_at(&mut self, document: &str, pos: usize) -> usize {
        if pos < self.pos {
            self.pos = 0;
            self.newlines = 0;
        }
        self.newlines += document.as_bytes()[self.pos..pos]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.pos = pos;
        self.newlines + 1
    }
}

/// Cut the rows that follow `VALUES`, returning them and the offset just past `;`.
fn scan_rows<'input>(
    document: &'input str,
    statement_pos: usize,
    start: usize,
    mut line: usize,
) -> Result<(Vec<RawRow<'input>>, usize), BlockError> {
    let bytes = document.as_bytes();
    let mut rows = Vec::new();
    let mut pos = start;

    loop {
        let lead_start = pos;
        pos = skip_gap(bytes, pos, &mut line);
        match bytes.get(pos) {
            None => return Err(BlockError::MissingTerminator { pos: statement_pos }),
            Some(b';') if rows.is_empty() => return Ok((rows, pos + 1)),
            Some(b'(') => {}
            Some(_) => {
                return Err(BlockError::UnexpectedText {
                    expected: "'(' starting a value tuple",
                    found: char_at(document, pos),
                    pos,
                });
            }
        }

        let tuple_start = pos;
        let tuple_line = line;
        pos = scan_tuple(bytes, pos, &mut line)?;
        let tuple_end = pos;
        pos = skip_gap(bytes, pos, &mut line);

        let terminator = match bytes.get(pos) {
            Some(b',') => Terminator::Comma,
            Some(b';') => Terminator::Semicolon,
            None => return Err(BlockError::MissingTerminator { pos: statement_pos }),
            Some(_) => {
                return Err(BlockError::UnexpectedText {
                    expected: "',' or ';' after value tuple",
                    found: char_at(document, pos),
                    pos,
                });
            }
        };

        rows.push(RawRow {
            lead: &document[lead_start..tuple_start],
            tuple: &document[tuple_start..tuple_end],
            after: &document[tuple_end..pos],
            terminator,
            pos: tuple_start,
            line: tuple_line,
        });
        pos += 1;

        if terminator == Terminator::Semicolon {
            return Ok((rows, pos));
        }
    }
}

/// Skip whitespace and comments, counting newlines.
fn skip_gap(bytes: &[u8], mut pos: usize, line: &mut usize) -> usize {
    while pos < bytes.len() {
        match bytes[pos] {
            b'\n' => {
                *line += 1;
                pos += 1;
            }
            b if b.is_ascii_whitespace() => pos += 1,
            b'-' if bytes.get(pos + 1) == Some(&b'-') => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                while pos < bytes.len() && !(bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/')) {
                    if bytes[pos] == b'\n' {
                        *line += 1;
                    }
                    pos += 1;
                }
                pos = (pos + 2).min(bytes.len());
            }
            _ => break,
        }
    }
    pos
}

/// Scan from `(` to its matching `)`, returning the offset just past it.
/// Quoted text and comments are skipped.
fn scan_tuple(bytes: &[u8], start: usize, line: &mut usize) -> Result<usize, BlockError> {
    let mut depth = 0usize;
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' => {
                let backslash_escapes = pos > 0 && matches!(bytes[pos - 1], b'E' | b'e');
                pos = skip_quoted(bytes, pos, b'\'', backslash_escapes, line)?;
                continue;
            }
            b'"' => {
                pos = skip_quoted(bytes, pos, b'"', false, line)?;
                continue;
            }
            b'-' if bytes.get(pos + 1) == Some(&b'-') => {
                pos = skip_gap(bytes, pos, line);
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = skip_gap(bytes, pos, line);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos + 1);
                }
            }
            b'\n' => *line += 1,
            _ => {}
        }
        pos += 1;
    }
    Err(BlockError::UnterminatedTuple { pos: start })
}

/// Skip a quoted run starting at `start`, returning the offset just past the closing quote.
fn skip_quoted(
    bytes: &[u8],
    start: usize,
    quote: u8,
    backslash_escapes: bool,
    line: &mut usize,
) -> Result<usize, BlockError> {
    let mut pos = start + 1;
    while pos < bytes.len() {
        let b = bytes[pos];
        if b == b'\n' {
            *line += 1;
        }
        if backslash_escapes && b == b'\\' {
            if bytes.get(pos + 1) == Some(&b'\n') {
                *line += 1;
            }
            pos += 2;
            continue;
        }
        if b == quote {
            if bytes.get(pos + 1) == Some(&quote) {
                pos += 2;
                continue;
            }
            return Ok(pos + 1);
        }
        pos += 1;
    }
    Err(BlockError::UnterminatedQuote { pos: start })
}

fn char_at(document: &str, pos: usize) -> char {
    document[pos..].chars().next().unwrap_or('\u{FFFD}')
}
