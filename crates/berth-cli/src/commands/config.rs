//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use berth_core::config::{self, BerthConfig};

/// Resolve the configuration file path
pub fn config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Load configuration, falling back to defaults when the file is missing
pub fn load(config_path: Option<&PathBuf>) -> Result<BerthConfig> {
    let path = self::config_path(config_path);
    config::load_config_or_default(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))
}

/// Show current configuration
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = self::config_path(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'berth config init' to create one");
        print_info("Effective configuration (defaults):");
        println!();
        println!("{}", toml::to_string_pretty(&BerthConfig::default())?);
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Get a config value by dotted key, e.g. `daemon.address`
pub fn config_get(config_path: Option<&PathBuf>, key: &str) -> Result<()> {
    let config = load(config_path)?;
    let table = toml::Value::try_from(&config).context("Failed to encode configuration")?;

    let mut current = &table;
    for part in key.split('.') {
        match current.get(part) {
            Some(value) => current = value,
            None => {
                print_error(&format!("Key not found: {}", key));
                return Ok(());
            }
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(current)?),
        other => println!("{}", other),
    }
    Ok(())
}

/// Initialize default configuration
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = self::config_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    write_default_config(&path)?;
    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
    }
    std::fs::write(path, generate_default_config())
        .with_context(|| format!("Failed to write config file: {:?}", path))
}

/// Generate default configuration content
fn generate_default_config() -> String {
    format!(
        r#"# berth configuration

[daemon]
# Address of the session daemon
address = "{address}"

# Seconds to wait for the daemon to accept a connection
connect_timeout = 5

[sidecar]
# Sidecar image (defaults to {repository}:<berth version>)
# image = "{repository}:{version}"

[engine]
# Skip the engine query and assume this OS ("linux" or "windows")
# os_type = "linux"

# Session configuration applied to every project, below the project's own
# defaults
# [defaults.sync.configuration]
# mode = "two-way-resolved"
#
# [defaults.sync.configuration.ignore]
# vcs = true
#
# [defaults.forward.configuration.socket]
# overwriteMode = "overwrite"
"#,
        address = config::DEFAULT_DAEMON_ADDRESS,
        repository = config::DEFAULT_SIDECAR_REPOSITORY,
        version = berth_core::VERSION,
    )
}
