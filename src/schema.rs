//! Column types and the positional grammar a row must satisfy.

use std::fmt;

use indexmap::IndexMap;

use crate::sql::{InsertHeader, LiteralKind, ParseError, Tuple};

/// Declared type of a column, as far as row checking cares.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Any literal.
    #[default]
    Any,
    /// Quoted string.
    Text,
    /// Bare integer.
    Integer,
    /// Bare integer or decimal.
    Numeric,
    /// `true` or `false`.
    Boolean,
}

impl ColumnType {
    /// Whether a literal of `kind` fits this column. `NULL` fits every column.
    #[must_use]
    pub fn accepts(self, kind: LiteralKind) -> bool {
        matches!(
            (self, kind),
            (_, LiteralKind::Null)
                | (ColumnType::Any, _)
                | (ColumnType::Text, LiteralKind::Text)
                | (ColumnType::Integer, LiteralKind::Integer)
                | (
                    ColumnType::Numeric,
                    LiteralKind::Integer | LiteralKind::Numeric
                )
                | (ColumnType::Boolean, LiteralKind::Boolean)
        )
    }

    /// The narrowest column type holding a literal of `kind`.
    #[must_use]
    pub fn of_literal(kind: LiteralKind) -> Self {
        match kind {
            LiteralKind::Text => ColumnType::Text,
            LiteralKind::Integer => ColumnType::Integer,
            LiteralKind::Numeric => ColumnType::Numeric,
            LiteralKind::Boolean => ColumnType::Boolean,
            LiteralKind::Null => ColumnType::Any,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Any => "any",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Numeric => "numeric",
            ColumnType::Boolean => "boolean",
        })
    }
}

/// Errors building a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The same column name appears twice.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),
    /// A schema needs at least one column.
    #[error("Column list is empty")]
    Empty,
}

/// Why a row does not satisfy a table's grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    /// The tuple could not be tokenized or parsed.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// Wrong number of values.
    #[error("expected {expected} values, found {found}")]
    Arity {
        /// Column count of the schema.
        expected: usize,
        /// Values in the row.
        found: usize,
    },
    /// A value whose literal kind does not fit its column.
    #[error("column '{column}' expects {expected}, found {found} literal {raw}")]
    Type {
        /// Column name.
        column: String,
        /// Declared type.
        expected: ColumnType,
        /// Literal kind found.
        found: LiteralKind,
        /// Literal source text.
        raw: String,
    },
}

/// An ordered set of uniquely named, typed columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: IndexMap<String, ColumnType>,
}

impl TableSchema {
    /// Build a schema from `(name, type)` pairs in order.
    ///
    /// # Errors
    ///
    /// Returns an error on an empty list or a duplicate name.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for (name, ty) in columns {
            schema.push(name, ty)?;
        }
        if schema.is_empty() {
            return Err(SchemaError::Empty);
        }
        Ok(schema)
    }

    /// Build a schema whose columns all accept any literal.
    ///
    /// # Errors
    ///
    /// Returns an error on an empty list or a duplicate name.
    pub fn untyped<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_columns(names.into_iter().map(|name| (name, ColumnType::Any)))
    }

    /// Append a column, returning its position.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already present.
    pub fn push(&mut self, name: impl Into<String>, ty: ColumnType) -> Result<usize, SchemaError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(SchemaError::DuplicateColumn(name));
        }
        let (index, _) = self.columns.insert_full(name, ty);
        Ok(index)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Position of a column.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    /// Name and type of the column at `index`.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<(&str, ColumnType)> {
        self.columns
            .get_index(index)
            .map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Whether a header declares exactly these columns, in this order.
    #[must_use]
    pub fn matches_header(&self, header: &InsertHeader<'_>) -> bool {
        header.columns.len() == self.len()
            && header
                .columns
                .iter()
                .zip(self.names())
                .all(|(declared, expected)| declared.name == expected)
    }

    /// Check a parsed tuple against this schema.
    ///
    /// # Errors
    ///
    /// Returns the first arity or type mismatch.
    pub fn check(&self, tuple: &Tuple<'_>) -> Result<(), RowError> {
        if tuple.fields.len() != self.len() {
            return Err(RowError::Arity {
                expected: self.len(),
                found: tuple.fields.len(),
            });
        }
        for (field, (name, ty)) in tuple.fields.iter().zip(&self.columns) {
            if !ty.accepts(field.kind) {
                return Err(RowError::Type {
                    column: name.clone(),
                    expected: *ty,
                    found: field.kind,
                    raw: field.raw.to_owned(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;

    fn schema() -> TableSchema {
        TableSchema::from_columns([
            ("id", ColumnType::Text),
            ("game_number", ColumnType::Integer),
            ("golden_break", ColumnType::Boolean),
            ("confirmed_at", ColumnType::Any),
        ])
        .unwrap()
    }

    #[test]
    fn test_accepts() {
        assert!(ColumnType::Boolean.accepts(LiteralKind::Boolean));
        assert!(ColumnType::Boolean.accepts(LiteralKind::Null));
        assert!(!ColumnType::Boolean.accepts(LiteralKind::Text));
        assert!(ColumnType::Numeric.accepts(LiteralKind::Integer));
        assert!(!ColumnType::Integer.accepts(LiteralKind::Numeric));
        assert!(ColumnType::Any.accepts(LiteralKind::Text));
    }

    #[test]
    fn test_duplicate_and_empty() {
        assert_eq!(
            TableSchema::untyped(["id", "id"]),
            Err(SchemaError::DuplicateColumn("id".into()))
        );
        assert_eq!(
            TableSchema::untyped(Vec::<String>::new()),
            Err(SchemaError::Empty)
        );
    }

    #[test]
    fn test_lookup() {
        let schema = schema();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.position("golden_break"), Some(2));
        assert_eq!(schema.column(1), Some(("game_number", ColumnType::Integer)));
        assert_eq!(schema.position("missing"), None);
    }

    #[test]
    fn test_check_accepts_matching_row() {
        let tuple = Parser::new("('g1', 3, false, NULL)").parse_tuple().unwrap();
        assert_eq!(schema().check(&tuple), Ok(()));
    }

    #[test]
    fn test_check_arity() {
        let tuple = Parser::new("('g1', 3, false)").parse_tuple().unwrap();
        assert_eq!(
            schema().check(&tuple),
            Err(RowError::Arity {
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn test_check_type() {
        let tuple = Parser::new("('g1', 3, 'no', NULL)").parse_tuple().unwrap();
        let err = schema().check(&tuple).unwrap_err();
        assert_eq!(
            err.to_string(),
            "column 'golden_break' expects boolean, found text literal 'no'"
        );
    }

    #[test]
    fn test_matches_header() {
        let header = Parser::new(
            r#"INSERT INTO "public"."match_games" ("id", "game_number", "golden_break", "confirmed_at") VALUES"#,
        )
        .parse_insert_header()
        .unwrap();
        assert!(schema().matches_header(&header));
        let other = TableSchema::untyped(["id", "game_number"]).unwrap();
        assert!(!other.matches_header(&header));
    }
}
