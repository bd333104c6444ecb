//! Testing utilities for fuzzing the row rewriter.
//!
//! This module is gated behind the `testing` feature.
//!
//! # Provided helpers
//!
//! - [`FuzzTable`]: an arbitrary typed table, its rows, and a valid mapping
//! - [`test_rewrite_roundtrip`]: rewrite a [`FuzzTable`] dump and check the
//!   output against the new schema
//! - [`test_document_scan`]: run the locator and rewriter over arbitrary text

use arbitrary::{Arbitrary, Unstructured};

use crate::block::{TableRef, Terminator, find_blocks};
use crate::mapping::{ColumnMapping, MappingEntry};
use crate::rewrite::{RewriteOutcome, RowRewriter};
use crate::schema::{ColumnType, TableSchema};
use crate::sql::{LiteralKind, Parser};

const TABLE: &str = "fuzz_table";
const TYPES: [ColumnType; 5] = [
    ColumnType::Any,
    ColumnType::Text,
    ColumnType::Integer,
    ColumnType::Numeric,
    ColumnType::Boolean,
];
const TRICKY_TEXT: [&str; 8] = [
    "",
    "O'Brien",
    "a, b",
    "(555) 010-0199",
    "semi; colon",
    "line\nbreak",
    "INSERT INTO \"fuzz_table\" (\"c0\") VALUES (1);",
    "ünïcödé ✓",
];

/// A table with typed columns, rows that satisfy them, and a valid mapping.
#[derive(Debug, Clone)]
pub struct FuzzTable {
    /// Old column types; column `i` is named `c{i}`.
    pub columns: Vec<ColumnType>,
    /// Literal text of each row's values.
    pub rows: Vec<Vec<String>>,
    /// The mapping to apply.
    pub entries: Vec<MappingEntry>,
}

fn literal(u: &mut Unstructured<'_>, ty: ColumnType) -> arbitrary::Result<String> {
    let kind = match ty {
        ColumnType::Any => *u.choose(&[
            LiteralKind::Text,
            LiteralKind::Integer,
            LiteralKind::Numeric,
            LiteralKind::Boolean,
            LiteralKind::Null,
        ])?,
        ColumnType::Numeric => *u.choose(&[LiteralKind::Integer, LiteralKind::Numeric])?,
        ColumnType::Text => LiteralKind::Text,
        ColumnType::Integer => LiteralKind::Integer,
        ColumnType::Boolean => LiteralKind::Boolean,
    };
    if u.ratio(1, 8)? {
        return Ok("NULL".to_owned());
    }
    Ok(match kind {
        LiteralKind::Text => {
            let text = if u.arbitrary()? {
                (*u.choose(&TRICKY_TEXT)?).to_owned()
            } else {
                String::arbitrary(u)?
            };
            format!("'{}'", text.replace('\'', "''"))
        }
        LiteralKind::Integer => i64::arbitrary(u)?.to_string(),
        LiteralKind::Numeric => format!("{}.{}", i32::arbitrary(u)?, u16::arbitrary(u)?),
        LiteralKind::Boolean => (if bool::arbitrary(u)? { "true" } else { "false" }).to_owned(),
        LiteralKind::Null => "NULL".to_owned(),
    })
}

impl<'a> Arbitrary<'a> for FuzzTable {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let column_count: usize = u.int_in_range(1..=6)?;
        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            columns.push(*u.choose(&TYPES)?);
        }

        let row_count: usize = u.int_in_range(1..=8)?;
        let mut rows = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            let mut row = Vec::with_capacity(column_count);
            for ty in &columns {
                row.push(literal(u, *ty)?);
            }
            rows.push(row);
        }

        // Kept columns are emitted in an arbitrary order, followed by a constant.
        let mut kept = Vec::new();
        let mut entries = Vec::new();
        for index in 0..column_count {
            if u.ratio(1, 3)? {
                entries.push(MappingEntry::drop(index));
            } else {
                kept.push((u8::arbitrary(u)?, index));
            }
        }
        kept.sort_unstable();
        for (_, index) in kept {
            entries.push(MappingEntry::keep(index, format!("n{index}")));
        }
        entries.push(MappingEntry::constant("added", "'constant'"));

        Ok(Self {
            columns,
            rows,
            entries,
        })
    }
}

impl FuzzTable {
    /// The old schema.
    ///
    /// # Panics
    ///
    /// Panics if the table has no columns.
    #[must_use]
    pub fn schema(&self) -> TableSchema {
        TableSchema::from_columns(
            self.columns
                .iter()
                .enumerate()
                .map(|(index, ty)| (format!("c{index}"), *ty)),
        )
        .unwrap()
    }

    /// A rewriter for this table.
    ///
    /// # Panics
    ///
    /// Panics if the mapping is invalid.
    #[must_use]
    pub fn rewriter(&self) -> RowRewriter {
        let mapping = ColumnMapping::new(&self.schema(), self.entries.clone()).unwrap();
        RowRewriter::new(TableRef::new(TABLE), mapping)
    }

    /// The table as a dump, surrounded by an unrelated statement and comments.
    #[must_use]
    pub fn dump(&self) -> String {
        let columns: Vec<String> = (0..self.columns.len())
            .map(|index| format!("\"c{index}\""))
            .collect();
        let mut dump = String::from(
            "-- Data for Name: other\nINSERT INTO \"public\".\"other\" (\"id\") VALUES\n\t('x');\n\n",
        );
        dump.push_str(&format!(
            "-- Data for Name: {TABLE}\nINSERT INTO \"public\".\"{TABLE}\" ({}) VALUES",
            columns.join(", ")
        ));
        for (index, row) in self.rows.iter().enumerate() {
            let terminator = Terminator::for_position(index, self.rows.len()).as_char();
            dump.push_str(&format!("\n\t({}){terminator}", row.join(", ")));
        }
        dump.push_str("\n\n-- Done\n");
        dump
    }

    /// The literal texts each row should have after the rewrite.
    #[must_use]
    pub fn expected_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.entries
                    .iter()
                    .filter_map(|entry| match entry {
                        MappingEntry::Drop { .. } => None,
                        MappingEntry::Keep { from, .. } => Some(row[*from].clone()),
                        MappingEntry::Constant { value, .. } => Some(value.clone()),
                    })
                    .collect()
            })
            .collect()
    }
}

/// Rewrite the table's dump and check that every row survives, parses
/// against the new schema, and holds the expected values.
///
/// # Panics
///
/// Panics if any of those checks fails.
pub fn test_rewrite_roundtrip(table: &FuzzTable) {
    let rewriter = table.rewriter();
    let dump = table.dump();
    let rewrite = match rewriter.rewrite_document(&dump).unwrap() {
        RewriteOutcome::Rewritten(rewrite) => rewrite,
        other => panic!("expected a rewrite of\n{dump}\ngot {other:?}"),
    };
    assert_eq!(rewrite.rows_in, table.rows.len());
    assert_eq!(rewrite.rows_out, table.rows.len());
    assert!(rewrite.skipped.is_empty());
    assert!(rewrite.document.ends_with("\n\n-- Done\n"));
    assert!(rewrite.document.contains("INSERT INTO \"public\".\"other\" (\"id\") VALUES\n\t('x');"));

    let output = rewriter.mapping().output();
    let blocks = find_blocks(&rewrite.document, rewriter.target()).unwrap();
    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert!(output.matches_header(&block.header));
    assert_eq!(block.rows.len(), table.rows.len());

    for (row, expected) in block.rows.iter().zip(table.expected_rows()) {
        let tuple = Parser::new(row.tuple).parse_tuple().unwrap();
        output.check(&tuple).unwrap();
        let raws: Vec<&str> = tuple.fields.iter().map(|field| field.raw).collect();
        assert_eq!(raws, expected);
    }
    let last = block.rows.len() - 1;
    for (index, row) in block.rows.iter().enumerate() {
        let expected = if index == last {
            Terminator::Semicolon
        } else {
            Terminator::Comma
        };
        assert_eq!(row.terminator, expected);
    }
}

/// Run the statement locator and a rewriter over arbitrary text. Errors are
/// fine; panics are not, and a rewrite must never touch text outside the
/// target statements.
pub fn test_document_scan(table: &FuzzTable, document: &str) {
    let rewriter = table.rewriter();
    let _ = find_blocks(document, rewriter.target());
    if let Ok(RewriteOutcome::Rewritten(rewrite)) = rewriter.rewrite_document(document) {
        assert_eq!(rewrite.rows_in, rewrite.rows_out);
    }
}
