//! Config command handlers

use std::path::Path;

use anyhow::Result;

use topicbase_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config: &Config, config_path: &Path, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backup_on_open": config.backup_on_open,
                    "log_file": config.log_file,
                    "index": config.index_path(),
                    "backup": config.backup_path(),
                    "topics_dir": config.topics_dir()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:       {}", config.data_dir.display());
            println!("  backup_on_open: {}", config.backup_on_open);
            println!(
                "  log_file:       {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", config_path.display());
        }
    }

    Ok(())
}
