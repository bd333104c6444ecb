//! Submodule defining the errors used across the crate.

use std::io;
use std::path::PathBuf;

pub use crate::block::BlockError;
pub use crate::mapping::MappingError;
pub use crate::plan::{PlanError, StepError};
pub use crate::rename::RenameError;
pub use crate::schema::{RowError, SchemaError};
pub use crate::sql::{LexerError, ParseError};

/// Errors that stop a run before or after the steps execute.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// A file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// A plan file is invalid.
    #[error("Invalid plan {path}: {source}")]
    Plan {
        /// The plan file, or `<built-in>`.
        path: PathBuf,
        /// The underlying error.
        source: PlanError,
    },
    /// Neither the plan nor the caller names a file the run needs.
    #[error("No {0} path given; set it in the plan or on the command line")]
    MissingPath(&'static str),
    /// The output would overwrite the input.
    #[error("Output path {0} is the input; the input must stay untouched")]
    OutputIsInput(PathBuf),
}
