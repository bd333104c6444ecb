#![doc = include_str!("../README.md")]
#![deny(clippy::mod_module_files)]

pub mod block;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod mapping;
pub mod pipeline;
pub mod plan;
pub mod rename;
pub mod report;
pub mod rewrite;
pub mod schema;
pub mod sql;
#[cfg(feature = "testing")]
pub mod testing;

// Re-export main types
pub use block::{StatementBlock, TableRef, find_blocks};
pub use engine::{Engine, Run, Step, StepAction, StepReport, StepStatus};
pub use mapping::{ColumnMapping, MappingEntry};
pub use plan::Plan;
pub use rename::{IdentifierRename, RenameScope};
pub use rewrite::{RewriteOutcome, RowErrorPolicy, RowRewriter};
pub use schema::{ColumnType, TableSchema};

// Re-export errors
pub use errors::Error;
