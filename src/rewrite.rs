//! The row rewriter: reshape every INSERT statement for one table.
//!
//! Each located statement is cut into rows, every row is parsed and checked
//! against the old schema, and the statement is re-emitted with the
//! mapping's output columns. Text between rows is carried over verbatim, so
//! the dump keeps its one-row-per-line layout.

use crate::block::{BlockError, StatementBlock, TableRef, Terminator, find_blocks};
use crate::mapping::ColumnMapping;
use crate::schema::{RowError, TableSchema};
use crate::sql::{FormatSql, Identifier, InsertHeader, Parser, QualifiedName};

/// What to do with rows that do not satisfy the old schema.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorPolicy {
    /// Leave the document unchanged and report every failing row.
    #[default]
    Abort,
    /// Exclude failing rows from the output and report them.
    Skip,
}

/// A row that could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    /// 1-based line of the row in the document.
    pub line: usize,
    /// Byte offset of the row in the document.
    pub pos: usize,
    /// The row's tuple text.
    pub text: String,
    /// Why the row was rejected.
    pub error: RowError,
}

/// Why a rewrite found nothing to work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// No INSERT statement targets the table.
    NoStatement,
    /// A statement targets the table but declares different columns.
    ColumnMismatch {
        /// Columns declared by the statement.
        found: Vec<String>,
    },
}

/// A successful rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// The document with every target statement replaced.
    pub document: String,
    /// The new text of each replaced statement.
    pub blocks: Vec<String>,
    /// Rows read from the target statements.
    pub rows_in: usize,
    /// Rows written to the output.
    pub rows_out: usize,
    /// Rows excluded under [`RowErrorPolicy::Skip`].
    pub skipped: Vec<RowFailure>,
}

/// Result of running a [`RowRewriter`] over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Nothing to rewrite; the document is unchanged.
    NotFound(NotFound),
    /// The statements hold no rows; the document is unchanged.
    Empty,
    /// Rows failed under [`RowErrorPolicy::Abort`], or every row failed;
    /// the document is unchanged.
    RowFailures(Vec<RowFailure>),
    /// The statements were rewritten.
    Rewritten(Rewrite),
}

/// Reshapes the rows of one table according to a [`ColumnMapping`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRewriter {
    target: TableRef,
    rename_table: Option<String>,
    mapping: ColumnMapping,
    policy: RowErrorPolicy,
}

impl RowRewriter {
    /// Create a rewriter for `target` using `mapping`.
    #[must_use]
    pub fn new(target: TableRef, mapping: ColumnMapping) -> Self {
        Self {
            target,
            rename_table: None,
            mapping,
            policy: RowErrorPolicy::default(),
        }
    }

    /// Give the rewritten statements a new table name.
    #[must_use]
    pub fn rename_table(mut self, name: impl Into<String>) -> Self {
        self.rename_table = Some(name.into());
        self
    }

    /// Set the row error policy.
    #[must_use]
    pub fn on_row_error(mut self, policy: RowErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The table being rewritten.
    #[must_use]
    pub fn target(&self) -> &TableRef {
        &self.target
    }

    /// The column mapping.
    #[must_use]
    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// The old schema rows are checked against.
    #[must_use]
    pub fn old_schema(&self) -> &TableSchema {
        self.mapping.input()
    }

    /// The row error policy.
    #[must_use]
    pub fn policy(&self) -> RowErrorPolicy {
        self.policy
    }

    /// Rewrite every statement for the target table in `document`.
    ///
    /// # Errors
    ///
    /// Returns an error if a target statement cannot be cut into rows.
    pub fn rewrite_document(&self, document: &str) -> Result<RewriteOutcome, BlockError> {
        let blocks = find_blocks(document, &self.target)?;
        if blocks.is_empty() {
            return Ok(RewriteOutcome::NotFound(NotFound::NoStatement));
        }
        if let Some(block) = blocks
            .iter()
            .find(|block| !self.old_schema().matches_header(&block.header))
        {
            let found = block
                .header
                .column_names()
                .into_iter()
                .map(str::to_owned)
                .collect();
            return Ok(RewriteOutcome::NotFound(NotFound::ColumnMismatch { found }));
        }

        let rows_in: usize = blocks.iter().map(|block| block.rows.len()).sum();
        if rows_in == 0 {
            return Ok(RewriteOutcome::Empty);
        }

        let mut failures = Vec::new();
        let mut rewritten_blocks = Vec::with_capacity(blocks.len());
        for block in &blocks {
            rewritten_blocks.push(self.rewrite_rows(block, &mut failures));
        }

        for failure in &failures {
            tracing::warn!(
                table = %self.target,
                line = failure.line,
                error = %failure.error,
                "row does not match the old schema"
            );
        }

        let rows_out: usize = rewritten_blocks.iter().map(Vec::len).sum();
        if !failures.is_empty() && (self.policy == RowErrorPolicy::Abort || rows_out == 0) {
            return Ok(RewriteOutcome::RowFailures(failures));
        }

        let mut output = String::with_capacity(document.len());
        let mut texts = Vec::with_capacity(blocks.len());
        let mut copied_to = 0;
        for (block, rows) in blocks.iter().zip(&rewritten_blocks) {
            output.push_str(&document[copied_to..block.span.start]);
            copied_to = block.span.end;
            // A block whose rows all failed is left as it was.
            let text = if rows.is_empty() {
                block.text.to_owned()
            } else {
                self.emit_block(block, rows)
            };
            output.push_str(&text);
            texts.push(text);
        }
        output.push_str(&document[copied_to..]);

        tracing::debug!(
            table = %self.target,
            blocks = blocks.len(),
            rows_in,
            rows_out,
            skipped = failures.len(),
            "rewrote statements"
        );

        Ok(RewriteOutcome::Rewritten(Rewrite {
            document: output,
            blocks: texts,
            rows_in,
            rows_out,
            skipped: failures,
        }))
    }

    /// Rewrite each row of a block, returning the surviving rows with the
    /// source row they came from.
    fn rewrite_rows(
        &self,
        block: &StatementBlock<'_>,
        failures: &mut Vec<RowFailure>,
    ) -> Vec<(usize, String)> {
        let mut rows = Vec::with_capacity(block.rows.len());
        for (index, row) in block.rows.iter().enumerate() {
            let result = Parser::new(row.tuple)
                .parse_tuple()
                .map_err(|error| RowError::from(error.offset(row.pos)))
                .and_then(|tuple| self.mapping.rewrite_tuple(&tuple));
            match result {
                Ok(text) => {
                    tracing::trace!(line = row.line, "rewrote row");
                    rows.push((index, text));
                }
                Err(error) => failures.push(RowFailure {
                    line: row.line,
                    pos: row.pos,
                    text: row.tuple.to_owned(),
                    error,
                }),
            }
        }
        rows
    }

    /// Assemble a statement from the new header and the surviving rows.
    fn emit_block(&self, block: &StatementBlock<'_>, rows: &[(usize, String)]) -> String {
        let mut text = self.new_header(&block.header).format_sql();
        for (position, (index, tuple)) in rows.iter().enumerate() {
            let source = &block.rows[*index];
            text.push_str(source.lead);
            text.push_str(tuple);
            text.push_str(source.after);
            text.push(Terminator::for_position(position, rows.len()).as_char());
        }
        text
    }

    fn new_header<'a>(&'a self, old: &InsertHeader<'a>) -> InsertHeader<'a> {
        let quoted = old.columns.iter().all(|column| column.quoted);
        let name = match &self.rename_table {
            Some(name) => Identifier {
                name: name.as_str().into(),
                quoted: old.table.name.quoted,
            },
            None => old.table.name.clone(),
        };
        InsertHeader {
            table: QualifiedName {
                schema: old.table.schema.clone(),
                name,
            },
            columns: self
                .mapping
                .output()
                .names()
                .map(|column| Identifier {
                    name: column.into(),
                    quoted,
                })
                .collect(),
            column_spans: Vec::new(),
            span: old.span.clone(),
        }
    }
}
