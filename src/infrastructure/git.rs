//! Git operations on the journal repository.
//!
//! Shells out to the `git` binary the same way service management shells out
//! to system tools: run, check status, surface stderr on failure.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::domain::{AppError, Result};

/// A working tree to commit (and optionally push) after journaling.
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
    push: bool,
}

impl GitRepo {
    /// Create a handle for the repository at `dir`.
    #[must_use]
    pub fn new(dir: &Path, push: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            push,
        }
    }

    /// Stages everything and commits with `message`.
    ///
    /// Returns `false` when there was nothing to commit.
    ///
    /// # Errors
    /// Returns `Publish` if any git command fails.
    pub fn commit_all(&self, message: &str) -> Result<bool> {
        self.run(&["add", "-A"])?;

        if !self.has_staged_changes()? {
            tracing::info!("Journal unchanged, nothing to commit");
            return Ok(false);
        }

        self.run(&["commit", "-m", message])?;
        tracing::info!(message, "Committed journal");

        if self.push {
            self.run(&["push"])?;
            tracing::info!("Pushed journal");
        }

        Ok(true)
    }

    /// `git diff --cached --quiet` exits 1 when the index differs from HEAD.
    fn has_staged_changes(&self) -> Result<bool> {
        let output = self.git(&["diff", "--cached", "--quiet"])?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(failure("diff", &output)),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        let output = self.git(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(failure(args.first().copied().unwrap_or("git"), &output))
        }
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!("git {}", args.join(" "));
        Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| AppError::Publish {
                stage: "git",
                message: format!("failed to run git: {e}"),
            })
    }
}

fn failure(command: &str, output: &Output) -> AppError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    AppError::Publish {
        stage: "git",
        message: format!("git {command} failed ({}): {}", output.status, stderr.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_commit_outside_repository_fails() {
        let dir = tempdir().unwrap();
        let repo = GitRepo::new(dir.path(), false);

        assert!(matches!(
            repo.commit_all("journal: test"),
            Err(AppError::Publish { stage: "git", .. })
        ));
    }
}
