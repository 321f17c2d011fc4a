//! Project command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use berth_core::config::BerthConfig;
use berth_core::{EngineMetadata, Project};
use berth_reconciler::engine::EngineQuery;
use berth_reconciler::{
    build, BuildContext, ComposeLifecycle, DockerComposeCli, DockerEngine, OwnedSessions, Report,
    TcpConnector,
};

use crate::output::{
    format_dependencies, format_forwarding_sessions, format_specifications,
    format_synchronization_sessions, print_info, print_success, print_warning,
};

/// File names tried, in order, when no project file is given
pub const DEFAULT_PROJECT_FILES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Lifecycle wired to the real engine, orchestrator and daemon
pub type Lifecycle = ComposeLifecycle<DockerComposeCli, DockerEngine, TcpConnector>;

/// Locate the project file in `dir` unless one was given
pub fn find_project_file(file: Option<&Path>, dir: &Path) -> Result<PathBuf> {
    if let Some(file) = file {
        return Ok(file.to_path_buf());
    }
    DEFAULT_PROJECT_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .with_context(|| {
            format!(
                "No project file found in {:?} (tried {})",
                dir,
                DEFAULT_PROJECT_FILES.join(", ")
            )
        })
}

/// Load the project definition
pub fn load_project(file: Option<&Path>, name: Option<&str>) -> Result<Project> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let path = find_project_file(file, &cwd)?;
    let project = Project::load(&path, name)
        .with_context(|| format!("Failed to load project from {:?}", path))?;
    tracing::debug!(project = %project.name, path = ?path, "Loaded project");
    Ok(project)
}

/// Build the lifecycle for the local engine
pub fn lifecycle(config: BerthConfig) -> Result<Lifecycle> {
    let engine = DockerEngine::connect().context("Failed to connect to container engine")?;
    let connector = TcpConnector::from_config(&config.daemon);
    Ok(ComposeLifecycle::new(
        DockerComposeCli::default(),
        engine,
        connector,
        config,
    ))
}

/// Show the sessions and sidecar a project would get
///
/// The engine is only contacted when no OS type is configured.
pub async fn plan_command(project: &Project, config: &BerthConfig, compose: bool) -> Result<()> {
    let metadata = match config.engine.os_type {
        Some(os_type) => EngineMetadata::new(os_type),
        None => DockerEngine::connect()?
            .metadata()
            .await
            .context("Failed to query container engine")?,
    };

    let plan = build(
        project,
        BuildContext {
            metadata,
            defaults: &config.defaults,
            sidecar: &config.sidecar,
        },
    )
    .with_context(|| format!("Invalid project {:?}", project.name))?;

    if compose {
        print!("{}", plan.project.to_yaml()?);
        return Ok(());
    }

    println!("Project: {}", plan.name());
    println!("{}", format_specifications(&plan.specifications));
    println!("\n{}", format_dependencies(&plan.dependencies));
    Ok(())
}

/// Pull images
pub async fn pull_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    lifecycle.pull(project).await?;
    Ok(())
}

/// Create containers
pub async fn create_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    lifecycle.create(project).await?;
    print_success(&format!("Created project {}", project.name));
    Ok(())
}

/// Bring the project up and reconcile sessions
pub async fn up_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    let report = lifecycle.up(project).await?;
    report_changes(&report);
    print_success(&format!("Project {} is up", project.name));
    Ok(())
}

/// Start existing containers and reconcile sessions
pub async fn start_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    let report = lifecycle.start(project).await?;
    report_changes(&report);
    print_success(&format!("Started project {}", project.name));
    Ok(())
}

/// Pause sessions and stop containers
pub async fn stop_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    lifecycle.stop(project).await?;
    print_success(&format!("Stopped project {}", project.name));
    Ok(())
}

/// Terminate sessions and remove the project
pub async fn down_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    lifecycle.down(project).await?;
    print_success(&format!("Removed project {}", project.name));
    Ok(())
}

/// List sessions and containers
pub async fn ps_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    match lifecycle.ps(project).await? {
        Some(sessions) => print_sessions(&sessions),
        None => print_warning(&format!("Project {} has no sidecar", project.name)),
    }
    Ok(())
}

/// Pause the project's sessions
pub async fn pause_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    lifecycle.pause(project).await?;
    print_success(&format!("Paused sessions of {}", project.name));
    Ok(())
}

/// Resume the project's sessions
pub async fn resume_command(lifecycle: &Lifecycle, project: &Project) -> Result<()> {
    lifecycle.resume(project).await?;
    print_success(&format!("Resumed sessions of {}", project.name));
    Ok(())
}

fn print_sessions(sessions: &OwnedSessions) {
    println!("Forwarding Sessions:");
    println!("{}", format_forwarding_sessions(&sessions.forwarding));
    println!("\nSynchronization Sessions:");
    println!("{}", format_synchronization_sessions(&sessions.synchronization));
    println!();
}

fn report_changes(report: &Report) {
    if report.is_unchanged() {
        print_info("Sessions already up to date");
        return;
    }
    let pruned = report.pruned_forwarding.len() + report.pruned_synchronization.len();
    let created = report.created_forwarding.len() + report.created_synchronization.len();
    if pruned > 0 {
        print_info(&format!("Terminated {} session(s)", pruned));
    }
    if created > 0 {
        print_info(&format!("Created {} session(s)", created));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_project_file_prefers_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.yaml");
        assert_eq!(
            find_project_file(Some(&explicit), dir.path()).unwrap(),
            explicit
        );
    }

    #[test]
    fn test_find_project_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_project_file(None, dir.path()).is_err());

        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        std::fs::write(dir.path().join("compose.yml"), "services: {}\n").unwrap();
        assert_eq!(
            find_project_file(None, dir.path()).unwrap(),
            dir.path().join("compose.yml")
        );
    }
}
