//! Column mappings: how a row of the old schema becomes a row of the new one.

use crate::schema::{ColumnType, RowError, SchemaError, TableSchema};
use crate::sql::{ParseError, Parser, Tuple};

/// One entry of a [`ColumnMapping`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingEntry {
    /// Consume old column `from` and emit nothing.
    Drop {
        /// Old column position.
        from: usize,
    },
    /// Copy old column `from` verbatim into the next output position.
    Keep {
        /// Old column position.
        from: usize,
        /// Output column name.
        name: String,
    },
    /// Emit a fixed literal into the next output position.
    Constant {
        /// Output column name.
        name: String,
        /// SQL literal text, such as `'eight_ball'` or `NULL`.
        value: String,
    },
}

impl MappingEntry {
    /// A [`MappingEntry::Drop`] entry.
    #[must_use]
    pub fn drop(from: usize) -> Self {
        MappingEntry::Drop { from }
    }

    /// A [`MappingEntry::Keep`] entry.
    #[must_use]
    pub fn keep(from: usize, name: impl Into<String>) -> Self {
        MappingEntry::Keep {
            from,
            name: name.into(),
        }
    }

    /// A [`MappingEntry::Constant`] entry.
    #[must_use]
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        MappingEntry::Constant {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Errors building a [`ColumnMapping`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// An entry refers to a column the old schema does not have.
    #[error("Old column {index} is out of range for {len} columns")]
    OutOfRange {
        /// Referenced position.
        index: usize,
        /// Old column count.
        len: usize,
    },
    /// Two entries consume the same old column.
    #[error("Old column '{0}' is consumed more than once")]
    ConsumedTwice(String),
    /// No entry consumes an old column.
    #[error("Old column '{0}' is neither kept nor dropped")]
    Unconsumed(String),
    /// A constant is not exactly one SQL literal.
    #[error("Constant for '{name}' is not a single SQL literal: {source}")]
    InvalidConstant {
        /// Output column name.
        name: String,
        /// Why the literal was rejected.
        source: ParseError,
    },
    /// Output column list is empty or repeats a name.
    #[error("Invalid output columns: {0}")]
    Output(#[from] SchemaError),
}

/// A validated mapping from an old row shape to a new one.
///
/// Every old column is consumed exactly once, by a drop or a keep. Keep and
/// constant entries define the output columns, in entry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<MappingEntry>,
    input: TableSchema,
    output: TableSchema,
}

impl ColumnMapping {
    /// Validate `entries` against the old schema.
    ///
    /// # Errors
    ///
    /// Returns an error if an old column is out of range, consumed twice or
    /// never consumed, if a constant is not a single literal, or if the
    /// output column names are empty or repeated.
    pub fn new(old: &TableSchema, entries: Vec<MappingEntry>) -> Result<Self, MappingError> {
        let mut consumed = vec![false; old.len()];
        let mut output = TableSchema::default();

        for entry in &entries {
            match entry {
                MappingEntry::Drop { from } | MappingEntry::Keep { from, .. } => {
                    let Some((old_name, ty)) = old.column(*from) else {
                        return Err(MappingError::OutOfRange {
                            index: *from,
                            len: old.len(),
                        });
                    };
                    if std::mem::replace(&mut consumed[*from], true) {
                        return Err(MappingError::ConsumedTwice(old_name.to_owned()));
                    }
                    if let MappingEntry::Keep { name, .. } = entry {
                        output.push(name.clone(), ty)?;
                    }
                }
                MappingEntry::Constant { name, value } => {
                    let literal = Parser::new(value).parse_literal().map_err(|source| {
                        MappingError::InvalidConstant {
                            name: name.clone(),
                            source,
                        }
                    })?;
                    output.push(name.clone(), ColumnType::of_literal(literal.kind))?;
                }
            }
        }

        if let Some(index) = consumed.iter().position(|done| !done) {
            let name = old.column(index).map_or_else(String::new, |(n, _)| n.to_owned());
            return Err(MappingError::Unconsumed(name));
        }
        if output.is_empty() {
            return Err(SchemaError::Empty.into());
        }

        let entries = entries
            .into_iter()
            .map(|entry| match entry {
                MappingEntry::Constant { name, value } => MappingEntry::Constant {
                    name,
                    value: value.trim().to_owned(),
                },
                other => other,
            })
            .collect();

        Ok(Self {
            entries,
            input: old.clone(),
            output,
        })
    }

    /// The old schema rows are checked against.
    #[must_use]
    pub fn input(&self) -> &TableSchema {
        &self.input
    }

    /// The new schema; kept columns inherit their old type, constants take
    /// the type of their literal.
    #[must_use]
    pub fn output(&self) -> &TableSchema {
        &self.output
    }

    /// Entries in declared order.
    #[must_use]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Build the output tuple text for one old row.
    ///
    /// Kept values are copied with their original spacing; a value moved
    /// into or out of the first position takes the spacing of that position
    /// instead. Constants are preceded by a single space.
    ///
    /// # Errors
    ///
    /// Returns an error if the tuple does not satisfy the old schema.
    pub fn rewrite_tuple(&self, tuple: &Tuple<'_>) -> Result<String, RowError> {
        self.input.check(tuple)?;

        let opening = tuple.fields.first().map_or("", |f| f.leading);
        let mut out = String::with_capacity(tuple.fields.iter().map(|f| f.raw.len() + 2).sum());
        out.push('(');

        let mut position = 0usize;
        for entry in &self.entries {
            let (leading, text) = match entry {
                MappingEntry::Drop { .. } => continue,
                MappingEntry::Keep { from, .. } => {
                    let field = &tuple.fields[*from];
                    let leading = match (position == 0, *from == 0) {
                        (true, true) | (false, false) => field.leading,
                        (true, false) => opening,
                        (false, true) => " ",
                    };
                    (leading, field.raw)
                }
                MappingEntry::Constant { value, .. } => {
                    (if position == 0 { opening } else { " " }, value.as_str())
                }
            };
            if position > 0 {
                out.push(',');
            }
            out.push_str(leading);
            out.push_str(text);
            position += 1;
        }

        out.push_str(tuple.trailing);
        out.push(')');
        Ok(out)
    }
}
