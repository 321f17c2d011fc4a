//! CLI command implementations

mod config;
mod project;

pub use config::{config_get, config_init, config_path, config_show, load as load_config};
pub use project::{
    create_command, down_command, find_project_file, lifecycle, load_project, pause_command,
    plan_command, ps_command, pull_command, resume_command, start_command, stop_command,
    up_command, Lifecycle, DEFAULT_PROJECT_FILES,
};
