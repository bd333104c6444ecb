//! File I/O around the engine: read the dump, run the steps, write results.

use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{Engine, Run, Step};
use crate::errors::Error;
use crate::plan::Plan;

/// Files a run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Dump to read.
    pub input: PathBuf,
    /// Corrected dump to write.
    pub output: PathBuf,
    /// Directory snippet paths are relative to; the working directory when unset.
    pub snippet_dir: Option<PathBuf>,
}

impl Paths {
    /// Take each path from the override when given, else from the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if neither names the input or the output, or if
    /// both name the same file.
    pub fn resolve(
        plan: &Plan,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        snippet_dir: Option<PathBuf>,
    ) -> Result<Self, Error> {
        let input = input
            .or_else(|| plan.input.clone())
            .ok_or(Error::MissingPath("input"))?;
        let output = output
            .or_else(|| plan.output.clone())
            .ok_or(Error::MissingPath("output"))?;
        if same_file(&input, &output) {
            return Err(Error::OutputIsInput(output));
        }
        Ok(Self {
            input,
            output,
            snippet_dir,
        })
    }

    /// Where a step's snippet is written.
    #[must_use]
    pub fn snippet_path(&self, snippet: &Path) -> PathBuf {
        match &self.snippet_dir {
            Some(dir) => dir.join(snippet),
            None => snippet.to_path_buf(),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// What a pipeline run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The engine's result.
    pub run: Run,
    /// Files written, in order; empty on a dry run.
    pub written: Vec<PathBuf>,
}

/// Read the input, run `steps`, and write the output and snippets unless
/// `dry_run` is set.
///
/// # Errors
///
/// Returns an error if the input cannot be read or a file cannot be written.
pub fn execute(steps: Vec<Step>, paths: &Paths, dry_run: bool) -> Result<Outcome, Error> {
    let document = fs::read_to_string(&paths.input).map_err(|source| Error::Read {
        path: paths.input.clone(),
        source,
    })?;
    tracing::info!(
        input = %paths.input.display(),
        bytes = document.len(),
        steps = steps.len(),
        "loaded dump"
    );

    let run = Engine::new(steps).run(document);

    let mut written = Vec::new();
    if dry_run {
        tracing::info!("dry run, nothing written");
        return Ok(Outcome { run, written });
    }

    write_file(&paths.output, &run.document)?;
    written.push(paths.output.clone());

    for snippet in &run.snippets {
        let path = paths.snippet_path(&snippet.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_file(&path, &snippet.contents)?;
        written.push(path);
    }

    Ok(Outcome { run, written })
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::from_toml_str("input = 'in.sql'\noutput = 'out.sql'\n").unwrap()
    }

    #[test]
    fn test_overrides_win_over_plan() {
        let paths = Paths::resolve(&plan(), Some("other.sql".into()), None, None).unwrap();
        assert_eq!(paths.input, PathBuf::from("other.sql"));
        assert_eq!(paths.output, PathBuf::from("out.sql"));
    }

    #[test]
    fn test_missing_paths() {
        let empty = Plan::from_toml_str("").unwrap();
        assert!(matches!(
            Paths::resolve(&empty, None, Some("o.sql".into()), None),
            Err(Error::MissingPath("input"))
        ));
        assert!(matches!(
            Paths::resolve(&empty, Some("i.sql".into()), None, None),
            Err(Error::MissingPath("output"))
        ));
    }

    #[test]
    fn test_output_must_differ_from_input() {
        assert!(matches!(
            Paths::resolve(&plan(), None, Some("in.sql".into()), None),
            Err(Error::OutputIsInput(_))
        ));
    }

    #[test]
    fn test_snippet_path() {
        let mut paths = Paths::resolve(&plan(), None, None, None).unwrap();
        assert_eq!(
            paths.snippet_path(Path::new("restore.sql")),
            PathBuf::from("restore.sql")
        );
        paths.snippet_dir = Some("fixes".into());
        assert_eq!(
            paths.snippet_path(Path::new("restore.sql")),
            PathBuf::from("fixes/restore.sql")
        );
    }
}
