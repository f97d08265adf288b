//! Configuration command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::config::{ConfigLoader, paths};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "catalog.owner", "synthesis.maxParallel")
        key: Option<String>,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "catalog.owner", "synthesis.maxParallel")
        key: String,
        /// Configuration value
        value: String,
        /// Write to the user config instead of the project config
        #[arg(long)]
        user: bool,
    },
    /// List all configuration
    List,
    /// Show configuration file paths
    Path,
    /// Validate configuration
    Validate,
}

fn set_target(explicit: Option<&Path>, user: bool) -> Result<PathBuf> {
    if user {
        return Ok(paths::user_config_path());
    }
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    Ok(paths::project_config_path(&cwd))
}

/// Handle configuration subcommands
pub fn handle_config_command(cmd: ConfigSubcommand, explicit: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load(explicit).context("Failed to load configuration")?;
            if let Some(key) = key {
                let value = crate::config::get_config_value(&config, &key)?;
                println!("{}", value.trim_end());
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Set { key, value, user } => {
            let target = set_target(explicit, user)?;
            // Only the target file's own content is rewritten, not the merged view
            let mut config = if target.exists() {
                ConfigLoader::load_file(&target)?
            } else {
                crate::config::Config::default()
            };

            crate::config::set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {} = {}", key, value))?;

            ConfigLoader::save(&config, &target).context("Failed to save configuration")?;
            println!("Configuration saved to {}", target.display());
        }
        ConfigSubcommand::List => {
            let config = ConfigLoader::load(explicit).context("Failed to load configuration")?;
            let yaml =
                serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
        ConfigSubcommand::Path => {
            println!("user:    {}", paths::user_config_path().display());
            let project = set_target(explicit, false)?;
            println!("project: {}", project.display());
        }
        ConfigSubcommand::Validate => {
            ConfigLoader::validate(explicit).context("Configuration validation failed")?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
