//! Declarative migration plans.
//!
//! A plan is a TOML document naming the input dump, the output file and an
//! ordered list of steps. Plans are validated in full by [`Plan::resolve`]
//! before any dump is read.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::block::TableRef;
use crate::engine::{Step, StepAction};
use crate::errors::Error;
use crate::mapping::{ColumnMapping, MappingEntry, MappingError};
use crate::rename::{IdentifierRename, RenameError, RenameScope};
use crate::rewrite::{RowErrorPolicy, RowRewriter};
use crate::schema::{ColumnType, SchemaError, TableSchema};

const BUILTIN_PLAN: &str = include_str!("../plans/local-data-dump.toml");

/// A migration plan as written in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Dump to read.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// File to write the corrected dump to.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Steps, applied in order.
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// One step as written in TOML, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
    /// Reshape the rows of one table.
    Reshape(ReshapeSpec),
    /// Rename a quoted identifier.
    Rename(RenameSpec),
}

/// A `kind = "reshape"` step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReshapeSpec {
    /// Name shown in reports.
    #[serde(default)]
    pub name: Option<String>,
    /// Schema qualifier the statements must carry.
    #[serde(default)]
    pub schema: Option<String>,
    /// Table whose statements are rewritten.
    pub table: String,
    /// New table name for the rewritten statements.
    #[serde(default)]
    pub rename_table: Option<String>,
    /// Columns as they appear in the dump.
    pub old_columns: Vec<OldColumnSpec>,
    /// Columns to emit, in order.
    pub new_columns: Vec<NewColumnSpec>,
    /// Old columns to discard.
    #[serde(default)]
    pub drop: Vec<String>,
    /// What to do with rows that do not match `old_columns`.
    #[serde(default)]
    pub on_row_error: RowErrorPolicy,
    /// Snippet file for the rewritten statements.
    #[serde(default)]
    pub snippet: Option<PathBuf>,
    /// Snippet comment lines.
    #[serde(default)]
    pub description: Vec<String>,
    /// Follow-up notes.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A `kind = "rename"` step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameSpec {
    /// Name shown in reports.
    #[serde(default)]
    pub name: Option<String>,
    /// Identifier to replace.
    pub from: String,
    /// Replacement identifier.
    pub to: String,
    /// Schema qualifier, only meaningful with `table`.
    #[serde(default)]
    pub schema: Option<String>,
    /// Restrict the rename to this table's column lists.
    #[serde(default)]
    pub table: Option<String>,
    /// Snippet file for the edited statements; needs `table`.
    #[serde(default)]
    pub snippet: Option<PathBuf>,
    /// Snippet comment lines.
    #[serde(default)]
    pub description: Vec<String>,
    /// Follow-up notes.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// An old column: a bare name, or a name with a type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OldColumnSpec {
    /// A column accepting any literal.
    Name(String),
    /// A typed column.
    Typed {
        /// Column name.
        name: String,
        /// Column type.
        #[serde(rename = "type", default)]
        ty: ColumnType,
    },
}

/// A new column: kept under its old name, kept from another old column, or
/// filled with a constant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NewColumnSpec {
    /// Keep the old column of the same name.
    Name(String),
    /// Keep an old column under a new name.
    From {
        /// Output name.
        name: String,
        /// Old column name.
        from: String,
    },
    /// Emit a fixed literal.
    Value {
        /// Output name.
        name: String,
        /// SQL literal.
        value: String,
    },
}

/// Errors in a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The TOML does not describe a plan.
    #[error("Failed to parse plan TOML: {0}")]
    Toml(#[from] toml::de::Error),
    /// A step is invalid.
    #[error("Step {index} ({name}): {source}")]
    Step {
        /// 1-based step index.
        index: usize,
        /// Step name.
        name: String,
        /// What is wrong with it.
        source: StepError,
    },
}

/// What is wrong with one step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// A field that must not be empty is.
    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),
    /// `from` or `drop` names a column not in `old_columns`.
    #[error("Unknown old column '{0}'")]
    UnknownColumn(String),
    /// A rename asks for a snippet without a table.
    #[error("'snippet' needs 'table' on a rename step")]
    SnippetWithoutTable,
    /// `old_columns` is invalid.
    #[error("Invalid old columns: {0}")]
    OldColumns(#[from] SchemaError),
    /// The columns do not form a valid mapping.
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// The rename is invalid.
    #[error(transparent)]
    Rename(#[from] RenameError),
}

impl Plan {
    /// Parse a plan from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid plan document.
    pub fn from_toml_str(text: &str) -> Result<Self, PlanError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a plan file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| Error::Plan {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The plan for `local-data-dump.sql` shipped with the binary.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded plan is malformed.
    pub fn builtin() -> Result<Self, PlanError> {
        Self::from_toml_str(BUILTIN_PLAN)
    }

    /// Validate every step and turn it into an executable [`Step`].
    ///
    /// # Errors
    ///
    /// Returns the first invalid step.
    pub fn resolve(&self) -> Result<Vec<Step>, PlanError> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                spec.resolve().map_err(|source| PlanError::Step {
                    index: index + 1,
                    name: spec.name(),
                    source,
                })
            })
            .collect()
    }
}

impl StepSpec {
    /// The declared name, or one derived from the step.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            StepSpec::Reshape(spec) => spec
                .name
                .clone()
                .unwrap_or_else(|| format!("reshape {}", spec.table)),
            StepSpec::Rename(spec) => spec
                .name
                .clone()
                .unwrap_or_else(|| format!("rename {} -> {}", spec.from, spec.to)),
        }
    }

    /// Validate this step.
    ///
    /// # Errors
    ///
    /// Returns what is wrong with the step.
    pub fn resolve(&self) -> Result<Step, StepError> {
        let (action, snippet, description, notes) = match self {
            StepSpec::Reshape(spec) => (
                StepAction::Reshape(spec.rewriter()?),
                &spec.snippet,
                &spec.description,
                &spec.notes,
            ),
            StepSpec::Rename(spec) => (
                StepAction::Rename(spec.rename()?),
                &spec.snippet,
                &spec.description,
                &spec.notes,
            ),
        };
        let mut step = Step::new(self.name(), action)
            .with_description(description.clone())
            .with_notes(notes.clone());
        step.snippet.clone_from(snippet);
        Ok(step)
    }
}

fn table_ref(schema: Option<&String>, table: &str) -> Result<TableRef, StepError> {
    if table.trim().is_empty() {
        return Err(StepError::EmptyField("table"));
    }
    let target = TableRef::new(table);
    Ok(match schema {
        Some(schema) => target.with_schema(schema.as_str()),
        None => target,
    })
}

impl ReshapeSpec {
    fn rewriter(&self) -> Result<RowRewriter, StepError> {
        let target = table_ref(self.schema.as_ref(), &self.table)?;
        let old = TableSchema::from_columns(self.old_columns.iter().map(|column| match column {
            OldColumnSpec::Name(name) => (name.as_str(), ColumnType::Any),
            OldColumnSpec::Typed { name, ty } => (name.as_str(), *ty),
        }))?;

        let position = |name: &str| {
            old.position(name)
                .ok_or_else(|| StepError::UnknownColumn(name.to_owned()))
        };

        let mut entries = Vec::with_capacity(self.drop.len() + self.new_columns.len());
        for name in &self.drop {
            entries.push(MappingEntry::drop(position(name)?));
        }
        for column in &self.new_columns {
            entries.push(match column {
                NewColumnSpec::Name(name) => MappingEntry::keep(position(name)?, name.as_str()),
                NewColumnSpec::From { name, from } => {
                    MappingEntry::keep(position(from)?, name.as_str())
                }
                NewColumnSpec::Value { name, value } => {
                    MappingEntry::constant(name.as_str(), value.as_str())
                }
            });
        }

        let mapping = ColumnMapping::new(&old, entries)?;
        let mut rewriter = RowRewriter::new(target, mapping).on_row_error(self.on_row_error);
        if let Some(name) = &self.rename_table {
            if name.trim().is_empty() {
                return Err(StepError::EmptyField("rename_table"));
            }
            rewriter = rewriter.rename_table(name.as_str());
        }
        Ok(rewriter)
    }
}

impl RenameSpec {
    fn rename(&self) -> Result<IdentifierRename, StepError> {
        let scope = match &self.table {
            Some(table) => RenameScope::Table(table_ref(self.schema.as_ref(), table)?),
            None if self.snippet.is_some() => return Err(StepError::SnippetWithoutTable),
            None => RenameScope::Document,
        };
        Ok(IdentifierRename::new(
            self.from.as_str(),
            self.to.as_str(),
            scope,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StepKind;

    #[test]
    fn test_builtin_plan_resolves() {
        let plan = Plan::builtin().unwrap();
        assert_eq!(plan.input, Some(PathBuf::from("local-data-dump.sql")));
        assert_eq!(plan.output, Some(PathBuf::from("local-data-dump-fixed.sql")));
        let steps = plan.resolve().unwrap();
        let kinds: Vec<_> = steps.iter().map(Step::kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::Reshape,
                StepKind::Rename,
                StepKind::Rename,
                StepKind::Rename,
                StepKind::Reshape,
                StepKind::Rename,
            ]
        );
        let snippets: Vec<_> = steps.iter().filter_map(|s| s.snippet.clone()).collect();
        assert_eq!(
            snippets,
            vec![
                PathBuf::from("restore_match_games.sql"),
                PathBuf::from("restore_match_lineups.sql"),
            ]
        );

        let StepAction::Reshape(match_games) = &steps[4].action else {
            panic!("expected a reshape");
        };
        assert_eq!(match_games.old_schema().len(), 17);
        let output: Vec<_> = match_games.mapping().output().names().collect();
        assert_eq!(output.len(), 16);
        assert_eq!(output[11], "confirmed_at");
        assert_eq!(output[15], "game_type");
        assert!(!steps[4].notes.is_empty());
    }

    #[test]
    fn test_step_names_default_from_content() {
        let plan = Plan::from_toml_str(
            r#"
            [[steps]]
            kind = "rename"
            from = "a"
            to = "b"
            "#,
        )
        .unwrap();
        assert_eq!(plan.input, None);
        assert_eq!(plan.steps[0].name(), "rename a -> b");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = Plan::from_toml_str(
            r#"
            [[steps]]
            kind = "rename"
            from = "a"
            to = "b"
            typo = true
            "#,
        );
        assert!(matches!(err, Err(PlanError::Toml(_))));
        assert!(matches!(
            Plan::from_toml_str("inputs = 'x.sql'"),
            Err(PlanError::Toml(_))
        ));
    }

    fn resolve_one(toml: &str) -> Result<Vec<Step>, PlanError> {
        Plan::from_toml_str(toml).unwrap().resolve()
    }

    fn step_error(toml: &str) -> StepError {
        match resolve_one(toml) {
            Err(PlanError::Step { index: 1, source, .. }) => source,
            other => panic!("expected a step error, got {other:?}"),
        }
    }

    #[test]
    fn test_reshape_validation() {
        assert_eq!(
            step_error(
                r#"
                [[steps]]
                kind = "reshape"
                table = "t"
                old_columns = ["a", "b"]
                new_columns = ["a", { name = "c", from = "missing" }]
                "#
            ),
            StepError::UnknownColumn("missing".into())
        );
        assert_eq!(
            step_error(
                r#"
                [[steps]]
                kind = "reshape"
                table = "t"
                old_columns = ["a", "b"]
                new_columns = ["a"]
                "#
            ),
            StepError::Mapping(MappingError::Unconsumed("b".into()))
        );
        assert_eq!(
            step_error(
                r#"
                [[steps]]
                kind = "reshape"
                table = "t"
                old_columns = ["a", "b"]
                new_columns = ["a", "b"]
                drop = ["b"]
                "#
            ),
            StepError::Mapping(MappingError::ConsumedTwice("b".into()))
        );
        assert_eq!(
            step_error(
                r#"
                [[steps]]
                kind = "reshape"
                table = "t"
                old_columns = ["a", "a"]
                new_columns = ["a"]
                "#
            ),
            StepError::OldColumns(SchemaError::DuplicateColumn("a".into()))
        );
        assert!(matches!(
            step_error(
                r#"
                [[steps]]
                kind = "reshape"
                table = "t"
                old_columns = ["a"]
                new_columns = ["a", { name = "k", value = "not a literal" }]
                "#
            ),
            StepError::Mapping(MappingError::InvalidConstant { .. })
        ));
        assert_eq!(
            step_error(
                r#"
                [[steps]]
                kind = "reshape"
                table = " "
                old_columns = ["a"]
                new_columns = ["a"]
                "#
            ),
            StepError::EmptyField("table")
        );
    }

    #[test]
    fn test_rename_validation() {
        assert_eq!(
            step_error(
                r#"
                [[steps]]
                kind = "rename"
                from = "a"
                to = "a"
                "#
            ),
            StepError::Rename(RenameError::Unchanged("a".into()))
        );
        assert_eq!(
            step_error(
                r#"
                [[steps]]
                kind = "rename"
                from = "a"
                to = "b"
                snippet = "out.sql"
                "#
            ),
            StepError::SnippetWithoutTable
        );
    }

    #[test]
    fn test_typed_columns_and_policy() {
        let steps = resolve_one(
            r#"
            [[steps]]
            kind = "reshape"
            schema = "public"
            table = "t"
            old_columns = [{ name = "a", type = "integer" }, { name = "b" }]
            new_columns = [{ name = "b2", from = "b" }, "a"]
            on_row_error = "skip"
            "#,
        )
        .unwrap();
        let StepAction::Reshape(rewriter) = &steps[0].action else {
            panic!("expected a reshape");
        };
        assert_eq!(rewriter.policy(), RowErrorPolicy::Skip);
        assert_eq!(rewriter.target(), &TableRef::new("t").with_schema("public"));
        assert_eq!(
            rewriter.old_schema().column(0),
            Some(("a", ColumnType::Integer))
        );
        assert_eq!(rewriter.old_schema().column(1), Some(("b", ColumnType::Any)));
        assert_eq!(
            rewriter.mapping().output().names().collect::<Vec<_>>(),
            vec!["b2", "a"]
        );
    }
}
