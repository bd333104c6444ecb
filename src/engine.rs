//! Runs an ordered list of migration steps over one in-memory document.
//!
//! Steps are independent: each sees the document as the previous step left
//! it, and a step that finds nothing to do, or fails, leaves the document
//! unchanged and lets the next step run.

use std::fmt;
use std::path::PathBuf;

use crate::block::TableRef;
use crate::rename::{IdentifierRename, RenameOutcome, RenameScope};
use crate::rewrite::{NotFound, RewriteOutcome, RowFailure, RowRewriter};

/// What a step does to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Reshape the rows of one table.
    Reshape(RowRewriter),
    /// Rename a quoted identifier.
    Rename(IdentifierRename),
}

/// One named migration fixup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Name shown in reports.
    pub name: String,
    /// The change to apply.
    pub action: StepAction,
    /// Where to write the rewritten statements, if anywhere.
    pub snippet: Option<PathBuf>,
    /// Comment lines heading the snippet.
    pub description: Vec<String>,
    /// Follow-up notes printed after the run.
    pub notes: Vec<String>,
}

impl Step {
    /// A step with no snippet, description or notes.
    #[must_use]
    pub fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
            snippet: None,
            description: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Write the rewritten statements to `path` when the step applies.
    #[must_use]
    pub fn with_snippet(mut self, path: impl Into<PathBuf>) -> Self {
        self.snippet = Some(path.into());
        self
    }

    /// Set the snippet's comment lines.
    #[must_use]
    pub fn with_description(mut self, lines: Vec<String>) -> Self {
        self.description = lines;
        self
    }

    /// Set the follow-up notes.
    #[must_use]
    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    /// The kind of action.
    #[must_use]
    pub fn kind(&self) -> StepKind {
        match self.action {
            StepAction::Reshape(_) => StepKind::Reshape,
            StepAction::Rename(_) => StepKind::Rename,
        }
    }

    /// The table the step is scoped to, if any.
    #[must_use]
    pub fn table(&self) -> Option<&TableRef> {
        match &self.action {
            StepAction::Reshape(rewriter) => Some(rewriter.target()),
            StepAction::Rename(rename) => match rename.scope() {
                RenameScope::Table(table) => Some(table),
                RenameScope::Document => None,
            },
        }
    }
}

/// Kind of step, as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Row reshape.
    Reshape,
    /// Identifier rename.
    Rename,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKind::Reshape => "reshape",
            StepKind::Rename => "rename",
        })
    }
}

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The change was made in full.
    Applied,
    /// The change was made but some rows were skipped.
    Partial,
    /// Nothing to change; the document is unchanged.
    NotFound,
    /// The target statements hold no rows.
    Empty,
    /// Rows did not match the old schema; the document is unchanged.
    RowFailures,
    /// A statement was malformed; the document is unchanged.
    Failed,
}

impl StepStatus {
    /// Whether someone needs to look at the outcome.
    #[must_use]
    pub fn needs_attention(self) -> bool {
        self != StepStatus::Applied
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepStatus::Applied => "applied",
            StepStatus::Partial => "partial",
            StepStatus::NotFound => "not found",
            StepStatus::Empty => "empty",
            StepStatus::RowFailures => "row failures",
            StepStatus::Failed => "failed",
        })
    }
}

/// A row failure, as reported.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FailedRow {
    /// 1-based line in the document.
    pub line: usize,
    /// Byte offset in the document.
    pub pos: usize,
    /// The row's tuple text.
    pub text: String,
    /// Why the row was rejected.
    pub error: String,
}

impl From<RowFailure> for FailedRow {
    fn from(failure: RowFailure) -> Self {
        Self {
            line: failure.line,
            pos: failure.pos,
            text: failure.text,
            error: failure.error.to_string(),
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StepReport {
    /// Step name.
    pub name: String,
    /// Step kind.
    pub kind: StepKind,
    /// How the step ended.
    pub status: StepStatus,
    /// Why the step did not apply, when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Rows read from the target statements.
    pub rows_in: usize,
    /// Rows written.
    pub rows_out: usize,
    /// Identifiers replaced.
    pub replacements: usize,
    /// Rows that did not match the old schema.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedRow>,
    /// Follow-up notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Snippet written for this step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<PathBuf>,
}

impl StepReport {
    fn new(step: &Step, status: StepStatus) -> Self {
        Self {
            name: step.name.clone(),
            kind: step.kind(),
            status,
            detail: None,
            rows_in: 0,
            rows_out: 0,
            replacements: 0,
            failures: Vec::new(),
            notes: step.notes.clone(),
            snippet: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A standalone SQL file holding one step's rewritten statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Path as declared by the step.
    pub path: PathBuf,
    /// File contents.
    pub contents: String,
}

impl Snippet {
    fn build(step: &Step, path: PathBuf, blocks: &[String]) -> Self {
        let mut contents = String::new();
        if step.description.is_empty() {
            let table = step.table().map_or("document", |table| table.table.as_str());
            contents.push_str(&format!("-- Fixed {table} data\n"));
        }
        for line in &step.description {
            contents.push_str("-- ");
            contents.push_str(line);
            contents.push('\n');
        }
        contents.push('\n');
        contents.push_str(&blocks.join("\n\n"));
        contents.push('\n');
        Self { path, contents }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// The corrected document.
    pub document: String,
    /// One report per step, in order.
    pub reports: Vec<StepReport>,
    /// Snippets of steps that applied.
    pub snippets: Vec<Snippet>,
}

impl Run {
    /// Whether any step did not apply in full.
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        self.reports.iter().any(|report| report.status.needs_attention())
    }
}

/// Applies steps to a document in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engine {
    steps: Vec<Step>,
}

impl Engine {
    /// An engine for `steps`.
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// The steps, in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step over `document`.
    #[must_use]
    pub fn run(&self, mut document: String) -> Run {
        let mut reports = Vec::with_capacity(self.steps.len());
        let mut snippets = Vec::new();

        for step in &self.steps {
            let _span = tracing::info_span!("step", name = %step.name).entered();
            let applied = apply_step(step, &document);
            let mut report = applied.report;
            if let Some(next) = applied.document {
                document = next;
            }
            if let (Some(path), false) = (&step.snippet, applied.blocks.is_empty()) {
                report.snippet = Some(path.clone());
                snippets.push(Snippet::build(step, path.clone(), &applied.blocks));
            }
            log_report(&report);
            reports.push(report);
        }

        Run {
            document,
            reports,
            snippets,
        }
    }
}

struct Applied {
    document: Option<String>,
    blocks: Vec<String>,
    report: StepReport,
}

impl Applied {
    fn unchanged(report: StepReport) -> Self {
        Self {
            document: None,
            blocks: Vec::new(),
            report,
        }
    }
}

fn apply_step(step: &Step, document: &str) -> Applied {
    match &step.action {
        StepAction::Reshape(rewriter) => match rewriter.rewrite_document(document) {
            Ok(RewriteOutcome::Rewritten(rewrite)) => {
                let status = if rewrite.skipped.is_empty() {
                    StepStatus::Applied
                } else {
                    StepStatus::Partial
                };
                let mut report = StepReport::new(step, status);
                report.rows_in = rewrite.rows_in;
                report.rows_out = rewrite.rows_out;
                report.failures = rewrite.skipped.into_iter().map(FailedRow::from).collect();
                Applied {
                    document: Some(rewrite.document),
                    blocks: rewrite.blocks,
                    report,
                }
            }
            Ok(RewriteOutcome::NotFound(NotFound::NoStatement)) => Applied::unchanged(
                StepReport::new(step, StepStatus::NotFound)
                    .with_detail(format!("no INSERT statement for {}", rewriter.target())),
            ),
            Ok(RewriteOutcome::NotFound(NotFound::ColumnMismatch { found })) => {
                Applied::unchanged(StepReport::new(step, StepStatus::NotFound).with_detail(
                    format!(
                        "{} declares columns ({}) instead of the expected old columns",
                        rewriter.target(),
                        found.join(", ")
                    ),
                ))
            }
            Ok(RewriteOutcome::Empty) => Applied::unchanged(
                StepReport::new(step, StepStatus::Empty)
                    .with_detail(format!("{} has no rows", rewriter.target())),
            ),
            Ok(RewriteOutcome::RowFailures(failures)) => {
                let mut report = StepReport::new(step, StepStatus::RowFailures).with_detail(
                    format!("{} rows do not match the old columns", failures.len()),
                );
                report.failures = failures.into_iter().map(FailedRow::from).collect();
                Applied::unchanged(report)
            }
            Err(error) => Applied::unchanged(
                StepReport::new(step, StepStatus::Failed).with_detail(error.to_string()),
            ),
        },
        StepAction::Rename(rename) => match rename.apply(document) {
            Ok(RenameOutcome::Renamed(renamed)) => {
                let mut report = StepReport::new(step, StepStatus::Applied);
                report.replacements = renamed.replacements;
                Applied {
                    document: Some(renamed.document),
                    blocks: renamed.blocks,
                    report,
                }
            }
            Ok(RenameOutcome::NotFound) => Applied::unchanged(
                StepReport::new(step, StepStatus::NotFound)
                    .with_detail(format!("no occurrence of \"{}\"", rename.from())),
            ),
            Err(error) => Applied::unchanged(
                StepReport::new(step, StepStatus::Failed).with_detail(error.to_string()),
            ),
        },
    }
}

fn log_report(report: &StepReport) {
    match report.status {
        StepStatus::Applied => tracing::info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            replacements = report.replacements,
            "step applied"
        ),
        StepStatus::Failed => tracing::error!(
            detail = report.detail.as_deref().unwrap_or_default(),
            "step failed"
        ),
        status => tracing::warn!(
            %status,
            detail = report.detail.as_deref().unwrap_or_default(),
            failures = report.failures.len(),
            "step needs attention"
        ),
    }
}
