//! Project operations through the `docker compose` command

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use berth_core::CollaboratorError;

use crate::sidecar::ProjectView;

/// Orchestrator operations on a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCommand {
    Pull,
    Create,
    Up,
    Start,
    Stop,
    Down,
    Ps,
}

impl ComposeCommand {
    /// Subcommand and fixed flags
    fn args(self) -> &'static [&'static str] {
        match self {
            ComposeCommand::Pull => &["pull"],
            ComposeCommand::Create => &["create"],
            ComposeCommand::Up => &["up", "--detach"],
            ComposeCommand::Start => &["start"],
            ComposeCommand::Stop => &["stop"],
            ComposeCommand::Down => &["down"],
            ComposeCommand::Ps => &["ps"],
        }
    }
}

impl fmt::Display for ComposeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compose {}", self.args()[0])
    }
}

/// Runs orchestrator operations against a project view
#[async_trait]
pub trait ComposeBackend: Send + Sync {
    /// Run `command` on the services the view targets.
    ///
    /// With `ignore_orphans`, containers of services missing from the view's
    /// project are left alone without warning.
    async fn run(
        &self,
        command: ComposeCommand,
        view: &ProjectView,
        ignore_orphans: bool,
    ) -> Result<(), CollaboratorError>;
}

/// Backend invoking `docker compose` with the project on standard input
#[derive(Debug, Clone)]
pub struct DockerComposeCli {
    program: String,
}

impl Default for DockerComposeCli {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}

impl DockerComposeCli {
    /// Use a different executable in place of `docker`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full argument list for one invocation
    fn arguments(&self, command: ComposeCommand, view: &ProjectView) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "--project-name".to_string(),
            view.project.name.clone(),
            "--project-directory".to_string(),
            view.project.working_dir.display().to_string(),
            "--file".to_string(),
            "-".to_string(),
        ];
        args.extend(command.args().iter().map(|a| a.to_string()));
        if let Some(services) = &view.services {
            args.extend(services.iter().cloned());
        }
        args
    }
}

#[async_trait]
impl ComposeBackend for DockerComposeCli {
    async fn run(
        &self,
        command: ComposeCommand,
        view: &ProjectView,
        ignore_orphans: bool,
    ) -> Result<(), CollaboratorError> {
        if view.is_empty() {
            debug!("Skipping {}: no services targeted", command);
            return Ok(());
        }

        let failed = |message: String| CollaboratorError::Orchestrator {
            operation: command.to_string(),
            message,
        };

        let yaml = view
            .project
            .to_yaml()
            .map_err(|e| failed(format!("unable to serialize project: {}", e)))?;
        let args = self.arguments(command, view);
        debug!("Running {} {}", self.program, args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if ignore_orphans {
            cmd.env("COMPOSE_IGNORE_ORPHANS", "true");
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| failed(format!("unable to run {}: {}", self.program, e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(yaml.as_bytes())
                .await
                .map_err(|e| failed(format!("unable to write project: {}", e)))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !status.success() {
            return Err(failed(format!("exited with {}", status)));
        }
        Ok(())
    }
}
