//! Publisher backed by an external journaling agent.
//!
//! The export is written to a temporary file whose path is substituted into
//! the prompt; the agent runs in the journal directory and edits the journal
//! itself. A successful run is followed by a git commit when configured.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::application::journal::DATA_FILE_PLACEHOLDER;
use crate::domain::{AppConfig, AppError, PublishOutcome, Publisher, Result};

use super::git::GitRepo;

/// Runs the configured agent command and commits its changes.
#[derive(Debug, Clone)]
pub struct AgentPublisher {
    command: String,
    args: Vec<String>,
    workdir: PathBuf,
    git: Option<GitRepo>,
    commit_message: String,
}

impl AgentPublisher {
    /// Create a publisher running `command args... <prompt>` in `workdir`.
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>, workdir: &Path) -> Self {
        Self {
            command: command.into(),
            args,
            workdir: workdir.to_path_buf(),
            git: None,
            commit_message: "journal: update".into(),
        }
    }

    /// Build from the `[journal]` config section.
    #[must_use]
    pub fn from_config(config: &AppConfig, commit_message: &str) -> Self {
        let workdir = config.journal_dir();
        let publisher = Self::new(
            config.journal.agent_command.clone(),
            config.journal.agent_args.clone(),
            &workdir,
        );

        if config.journal.commit {
            publisher.with_git(GitRepo::new(&workdir, config.journal.push), commit_message)
        } else {
            publisher
        }
    }

    /// Commit the working directory after each successful run.
    #[must_use]
    pub fn with_git(mut self, git: GitRepo, message: &str) -> Self {
        self.git = Some(git);
        self.commit_message = message.to_string();
        self
    }
}

impl Publisher for AgentPublisher {
    fn publish(&self, export: &str, prompt: &str) -> Result<PublishOutcome> {
        fs::create_dir_all(&self.workdir)
            .map_err(|e| AppError::io(format!("Failed to create {}", self.workdir.display()), e))?;

        // Removed when dropped at the end of this call
        let mut data_file = tempfile::Builder::new()
            .prefix("cursor-journal-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| AppError::io("Failed to create export file", e))?;
        data_file
            .write_all(export.as_bytes())
            .map_err(|e| AppError::io("Failed to write export file", e))?;
        data_file
            .flush()
            .map_err(|e| AppError::io("Failed to write export file", e))?;

        let data_path = data_file.path().display().to_string();
        let prompt = if prompt.contains(DATA_FILE_PLACEHOLDER) {
            prompt.replace(DATA_FILE_PLACEHOLDER, &data_path)
        } else {
            format!("{prompt}\n\nConversation export: {data_path}\n")
        };

        tracing::info!(command = %self.command, "Running journaling agent");
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(&prompt)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| AppError::Publish {
                stage: "agent",
                message: format!("failed to run {}: {e}", self.command),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Publish {
                stage: "agent",
                message: format!("{} exited with {}: {}", self.command, output.status, stderr.trim()),
            });
        }

        let completion = String::from_utf8_lossy(&output.stdout).trim().to_string();

        let committed = match &self.git {
            Some(git) => git.commit_all(&self.commit_message)?,
            None => false,
        };

        Ok(PublishOutcome {
            completion,
            committed,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str, workdir: &Path) -> AgentPublisher {
        AgentPublisher::new("sh", vec!["-c".into(), script.into()], workdir)
    }

    #[test]
    fn test_agent_sees_export_file() {
        let dir = tempdir().unwrap();
        // The prompt arrives as $0; the export path is its last word
        let publisher = sh(r#"cat "${0##* }""#, dir.path());

        let outcome = publisher
            .publish("[{\"id\":\"c1\"}]", "Summarize {data_file}")
            .unwrap();

        assert_eq!(outcome.completion, "[{\"id\":\"c1\"}]");
        assert!(!outcome.committed);
    }

    #[test]
    fn test_prompt_without_placeholder_gets_path_appended() {
        let dir = tempdir().unwrap();
        let publisher = sh(r#"echo "$0""#, dir.path());

        let outcome = publisher.publish("[]", "Write the journal").unwrap();

        assert!(outcome.completion.starts_with("Write the journal"));
        assert!(outcome.completion.contains("Conversation export: "));
        assert!(outcome.completion.ends_with(".json"));
    }

    #[test]
    fn test_agent_runs_in_journal_dir() {
        let dir = tempdir().unwrap();
        let journal = dir.path().join("journal");
        let publisher = sh("touch ran.marker", &journal);

        publisher.publish("[]", "x").unwrap();
        assert!(journal.join("ran.marker").exists());
    }

    #[test]
    fn test_agent_failure_is_publish_error() {
        let dir = tempdir().unwrap();
        let publisher = sh("echo boom >&2; exit 3", dir.path());

        match publisher.publish("[]", "x") {
            Err(AppError::Publish { stage, message }) => {
                assert_eq!(stage, "agent");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_agent_is_publish_error() {
        let dir = tempdir().unwrap();
        let publisher = AgentPublisher::new("cursor-journal-no-such-agent", Vec::new(), dir.path());
        assert!(matches!(
            publisher.publish("[]", "x"),
            Err(AppError::Publish { stage: "agent", .. })
        ));
    }
}
