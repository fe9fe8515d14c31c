//! Overwrite decisions for existing output files.
//!
//! A skip decision is an expected outcome, not an error: callers skip the
//! write and continue the step. The `ask` mode consults an injected
//! [`Confirm`] capability so batch runs and tests stay deterministic.

use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// How existing output files are treated on re-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwriteMode {
    /// Existing files are never overwritten.
    Never,
    /// Existing files are always overwritten.
    Always,
    /// Ask the operator per existing file.
    Ask,
    /// Overwrite only when the source file is newer than the target.
    IfNewer,
}

/// Outcome of an overwrite check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    /// Target is absent or the policy allows overwriting.
    Proceed,
    /// Target exists and the mode is `never`.
    SkipExisting,
    /// Target exists and is at least as new as the source (`ifnewer`).
    SkipUpToDate,
    /// The operator (or the non-interactive fallback) declined (`ask`).
    SkipDeclined,
}

impl WriteDecision {
    pub fn proceeds(self) -> bool {
        self == WriteDecision::Proceed
    }
}

/// The `ifnewer` mode was requested without a usable source file.
///
/// Fatal for the affected save call only; the step continues and the output
/// is reported as skipped with this reason.
#[derive(Debug, Clone)]
pub struct MissingSourceError {
    pub target: PathBuf,
    pub source: Option<PathBuf>,
}

impl fmt::Display for MissingSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(
                f,
                "overwrite_mode 'ifnewer' for {}: source file {} does not exist",
                self.target.display(),
                source.display()
            ),
            None => write!(
                f,
                "overwrite_mode 'ifnewer' for {}: no source file given to compare against",
                self.target.display()
            ),
        }
    }
}

impl std::error::Error for MissingSourceError {}

/// Capability for interactive overwrite confirmation.
pub trait Confirm {
    /// Return whether `path` may be overwritten.
    fn confirm(&self, path: &Path) -> Result<bool>;
}

/// Prompt the operator on stdin with a y/n question.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, path: &Path) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            return Err(anyhow!(
                "cannot ask about overwriting {} without a terminal \
                 (set assume_defaults or pass --ignore-questions)",
                path.display()
            ));
        }
        eprint!("File {} exists. Overwrite? (y/n): ", path.display());
        let mut response = String::new();
        std::io::stdin()
            .read_line(&mut response)
            .context("read overwrite response")?;
        let response = response.trim().to_lowercase();
        Ok(response == "y" || response == "yes")
    }
}

/// Fixed answer, used as the non-interactive fallback and in tests.
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _path: &Path) -> Result<bool> {
        Ok(self.0)
    }
}

/// Decide whether writing to `path` should proceed.
pub fn should_write(
    path: &Path,
    mode: OverwriteMode,
    source_file: Option<&Path>,
    confirm: &dyn Confirm,
) -> Result<WriteDecision> {
    // `ifnewer` validates its source before looking at the target: a save
    // call configured without a comparable source is broken regardless of
    // whether anything exists yet.
    if mode == OverwriteMode::IfNewer {
        let source = source_file.ok_or_else(|| MissingSourceError {
            target: path.to_path_buf(),
            source: None,
        })?;
        let source_mtime = mtime(source)?.ok_or_else(|| MissingSourceError {
            target: path.to_path_buf(),
            source: Some(source.to_path_buf()),
        })?;
        return match mtime(path)? {
            None => Ok(WriteDecision::Proceed),
            Some(target_mtime) if source_mtime > target_mtime => Ok(WriteDecision::Proceed),
            Some(_) => Ok(WriteDecision::SkipUpToDate),
        };
    }

    if mtime(path)?.is_none() {
        return Ok(WriteDecision::Proceed);
    }

    match mode {
        OverwriteMode::Always => Ok(WriteDecision::Proceed),
        OverwriteMode::Never => Ok(WriteDecision::SkipExisting),
        OverwriteMode::Ask => {
            if confirm.confirm(path)? {
                Ok(WriteDecision::Proceed)
            } else {
                Ok(WriteDecision::SkipDeclined)
            }
        }
        OverwriteMode::IfNewer => unreachable!("handled above"),
    }
}

fn mtime(path: &Path) -> Result<Option<SystemTime>> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            let modified = metadata
                .modified()
                .with_context(|| format!("read modification time of {}", path.display()))?;
            Ok(Some(modified))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("inspect {}", path.display()))
        }
    }
}
