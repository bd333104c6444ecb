//! Literal renames of double-quoted identifiers.
//!
//! A document-wide rename replaces every `"from"` token with `"to"` and
//! touches nothing else. A table-scoped rename edits only the column lists of
//! that table's INSERT headers, leaving row data alone.

use crate::block::{BlockError, TableRef, find_blocks};
use crate::sql::{Identifier, quote_identifier};

/// Errors building an [`IdentifierRename`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    /// The old or new name is empty.
    #[error("Rename needs non-empty names")]
    EmptyName,
    /// The old and new names are the same.
    #[error("Rename of '{0}' to itself")]
    Unchanged(String),
}

/// Where a rename applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameScope {
    /// Every quoted occurrence in the document.
    Document,
    /// Column lists of this table's INSERT headers.
    Table(TableRef),
}

/// The result of a rename that found something to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    /// The document after the rename.
    pub document: String,
    /// Number of tokens replaced.
    pub replacements: usize,
    /// For a table-scoped rename, the new text of each edited statement.
    pub blocks: Vec<String>,
}

/// Result of applying an [`IdentifierRename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// No occurrence; the document is unchanged.
    NotFound,
    /// At least one occurrence was replaced.
    Renamed(Renamed),
}

/// Replace one identifier with another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRename {
    from: String,
    to: String,
    scope: RenameScope,
}

impl IdentifierRename {
    /// Rename `from` to `to` within `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if either name is empty or both are equal.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        scope: RenameScope,
    ) -> Result<Self, RenameError> {
        let (from, to) = (from.into(), to.into());
        if from.is_empty() || to.is_empty() {
            return Err(RenameError::EmptyName);
        }
        if from == to {
            return Err(RenameError::Unchanged(from));
        }
        Ok(Self { from, to, scope })
    }

    /// The name being replaced.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The replacement name.
    #[must_use]
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Where the rename applies.
    #[must_use]
    pub fn scope(&self) -> &RenameScope {
        &self.scope
    }

    /// Apply the rename to `document`.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement of the scoped table cannot be cut
    /// into rows.
    pub fn apply(&self, document: &str) -> Result<RenameOutcome, BlockError> {
        match &self.scope {
            RenameScope::Document => Ok(self.apply_to_document(document)),
            RenameScope::Table(table) => self.apply_to_table(document, table),
        }
    }

    fn apply_to_document(&self, document: &str) -> RenameOutcome {
        let needle = quote_identifier(&self.from);
        let replacements = document.matches(needle.as_str()).count();
        if replacements == 0 {
            return RenameOutcome::NotFound;
        }
        tracing::debug!(from = %self.from, to = %self.to, replacements, "renamed identifier");
        RenameOutcome::Renamed(Renamed {
            document: document.replace(&needle, &quote_identifier(&self.to)),
            replacements,
            blocks: Vec::new(),
        })
    }

    fn apply_to_table(&self, document: &str, table: &TableRef) -> Result<RenameOutcome, BlockError> {
        let mut output = String::with_capacity(document.len());
        let mut blocks = Vec::new();
        let mut replacements = 0;
        let mut copied_to = 0;

        for block in find_blocks(document, table)? {
            let mut text = String::with_capacity(block.text.len());
            let mut block_copied_to = block.span.start;
            for (column, span) in block.header.columns.iter().zip(&block.header.column_spans) {
                if column.name != self.from.as_str() {
                    continue;
                }
                let renamed = Identifier {
                    name: self.to.as_str().into(),
                    quoted: column.quoted,
                };
                text.push_str(&document[block_copied_to..span.start]);
                text.push_str(&renamed.to_string());
                block_copied_to = span.end;
                replacements += 1;
            }
            if block_copied_to == block.span.start {
                continue;
            }
            text.push_str(&document[block_copied_to..block.span.end]);

            output.push_str(&document[copied_to..block.span.start]);
            output.push_str(&text);
            copied_to = block.span.end;
            blocks.push(text);
        }

        if replacements == 0 {
            return Ok(RenameOutcome::NotFound);
        }
        output.push_str(&document[copied_to..]);
        tracing::debug!(
            table = %table,
            from = %self.from,
            to = %self.to,
            replacements,
            "renamed column"
        );
        Ok(RenameOutcome::Renamed(Renamed {
            document: output,
            replacements,
            blocks,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
INSERT INTO \"public\".\"leagues\" (\"id\", \"operator_id\") VALUES
\t('l1', 'o1');

INSERT INTO \"public\".\"operator_blackout_preferences\" (\"id\", \"operator_id\", \"note\") VALUES
\t('b1', 'o1', 'mentions \"operator_id\" in text');

INSERT INTO \"public\".\"user_reports\" (\"id\", \"assigned_operator_id\") VALUES
\t('r1', 'o1');

INSERT INTO \"public\".\"venues\" (\"id\", \"operator_id\") VALUES
\t('v1', 'o1'),
\t('v2', 'o2');
-- \"operator_id\" noted in a comment
";

    fn renamed(outcome: RenameOutcome) -> Renamed {
        match outcome {
            RenameOutcome::Renamed(renamed) => renamed,
            RenameOutcome::NotFound => panic!("expected a rename"),
        }
    }

    #[test]
    fn test_document_rename_replaces_every_quoted_occurrence() {
        assert_eq!(DUMP.matches("\"operator_id\"").count(), 5);
        let rename =
            IdentifierRename::new("operator_id", "organization_id", RenameScope::Document).unwrap();
        let result = renamed(rename.apply(DUMP).unwrap());
        assert_eq!(result.replacements, 5);
        assert_eq!(result.document.matches("\"operator_id\"").count(), 0);
        assert_eq!(result.document.matches("\"organization_id\"").count(), 5);
        assert!(result.document.contains("\"assigned_operator_id\""));
        assert_eq!(
            result.document.replace("\"organization_id\"", "\"operator_id\""),
            DUMP
        );
    }

    #[test]
    fn test_document_rename_without_occurrence() {
        let rename = IdentifierRename::new("team_handicap", "home_team_modifier", RenameScope::Document)
            .unwrap();
        assert_eq!(rename.apply(DUMP).unwrap(), RenameOutcome::NotFound);
    }

    #[test]
    fn test_table_rename_touches_only_that_header() {
        let rename = IdentifierRename::new(
            "operator_id",
            "organization_id",
            RenameScope::Table(TableRef::new("operator_blackout_preferences")),
        )
        .unwrap();
        let result = renamed(rename.apply(DUMP).unwrap());
        assert_eq!(result.replacements, 1);
        assert_eq!(result.blocks.len(), 1);
        assert!(result.blocks[0].starts_with(
            "INSERT INTO \"public\".\"operator_blackout_preferences\" (\"id\", \"organization_id\", \"note\") VALUES"
        ));
        assert!(result.blocks[0].ends_with("'mentions \"operator_id\" in text');"));
        assert_eq!(result.document.matches("\"operator_id\"").count(), 4);
    }

    #[test]
    fn test_table_rename_keeps_bare_style() {
        let dump = "INSERT INTO lineups (id, team_handicap) VALUES (1, 2);\n";
        let rename = IdentifierRename::new(
            "team_handicap",
            "home_team_modifier",
            RenameScope::Table(TableRef::new("lineups")),
        )
        .unwrap();
        let result = renamed(rename.apply(dump).unwrap());
        assert_eq!(
            result.document,
            "INSERT INTO lineups (id, home_team_modifier) VALUES (1, 2);\n"
        );
    }

    #[test]
    fn test_table_rename_absent_column() {
        let rename = IdentifierRename::new(
            "missing",
            "present",
            RenameScope::Table(TableRef::new("venues")),
        )
        .unwrap();
        assert_eq!(rename.apply(DUMP).unwrap(), RenameOutcome::NotFound);
    }

    #[test]
    fn test_invalid_renames() {
        assert_eq!(
            IdentifierRename::new("", "x", RenameScope::Document),
            Err(RenameError::EmptyName)
        );
        assert_eq!(
            IdentifierRename::new("x", "x", RenameScope::Document),
            Err(RenameError::Unchanged("x".into()))
        );
    }
}
