//! Catalog-wide command handlers: init and backup

use anyhow::{Context, Result};

use topicbase_core::{Config, TopicTreeController};

use crate::output::Output;

/// Create an empty catalog
///
/// Refuses to touch an existing catalog unless `force` is set. Even then the
/// old index and content directory are kept under an `.old` name.
pub fn init(config: &Config, force: bool, output: &Output) -> Result<()> {
    let index = config.index_path();
    if index.exists() && !force {
        if output.is_json() {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "created": false
                })
            );
        } else if !output.is_quiet() {
            println!();
            println!("Already initialized.");
            println!("Index: {}", index.display());
            println!();
            println!("To start over (existing data is kept with an .old suffix):");
            println!("  topicbase init --force");
        }
        return Ok(());
    }

    TopicTreeController::recreate(config).context("Failed to create catalog")?;

    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "data_dir": config.data_dir,
                "created": true
            })
        );
    } else {
        output.success(&format!(
            "Created empty catalog in {}",
            config.data_dir.display()
        ));
    }
    Ok(())
}

/// Copy the index over its backup
pub fn backup(controller: &TopicTreeController, output: &Output) -> Result<()> {
    controller.backup().context("Failed to back up index")?;
    output.success(&format!(
        "Backed up index to {}",
        controller.config().backup_path().display()
    ));
    Ok(())
}
