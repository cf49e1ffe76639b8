//! Content command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use topicbase_core::{Content, ContentKind, TopicTreeController};

use crate::commands::topic::resolve;
use crate::output::Output;

/// Import a file into a topic
pub fn add(
    controller: &mut TopicTreeController,
    topic: String,
    file: PathBuf,
    kind: String,
    caption: Option<String>,
    output: &Output,
) -> Result<()> {
    let topic = resolve(controller, &topic)?;
    let kind = parse_kind(&kind)?;

    let mut content = Content::new(kind, file.to_string_lossy());
    if let Some(caption) = caption {
        content = content.with_caption(caption);
    }

    let stored = controller
        .add_content(&content, &topic)
        .with_context(|| format!("Failed to add {:?} to '{}'", file, topic))?;

    output.success(&format!("Added {} to '{}'", stored, topic));
    output.print_content(&stored);
    Ok(())
}

/// List the content items of a topic
pub fn list(controller: &TopicTreeController, topic: String, output: &Output) -> Result<()> {
    let topic = resolve(controller, &topic)?;
    let contents = controller.contents(&topic)?;
    output.print_contents(&topic, &contents);
    Ok(())
}

/// Give a content item a new caption
pub fn rename(
    controller: &mut TopicTreeController,
    topic: String,
    filename: String,
    caption: String,
    output: &Output,
) -> Result<()> {
    let topic = resolve(controller, &topic)?;
    require_content(controller, &topic, &filename)?;

    let renamed = controller
        .rename_content(&topic, &filename, &caption)
        .with_context(|| format!("Failed to rename '{}' in '{}'", filename, topic))?;

    output.success(&format!("Renamed '{}' to '{}'", filename, renamed.filename));
    Ok(())
}

/// Remove a content item and its file
pub fn remove(
    controller: &mut TopicTreeController,
    topic: String,
    filename: String,
    output: &Output,
) -> Result<()> {
    let topic = resolve(controller, &topic)?;
    require_content(controller, &topic, &filename)?;

    controller
        .remove_content(&topic, &filename)
        .with_context(|| format!("Failed to remove '{}' from '{}'", filename, topic))?;

    output.success(&format!("Removed '{}' from '{}'", filename, topic));
    Ok(())
}

/// Exchange the positions of two content items
pub fn swap(
    controller: &mut TopicTreeController,
    topic: String,
    first: String,
    second: String,
    output: &Output,
) -> Result<()> {
    let topic = resolve(controller, &topic)?;
    require_content(controller, &topic, &first)?;
    require_content(controller, &topic, &second)?;

    controller
        .swap_contents(&topic, &first, &second)
        .with_context(|| format!("Failed to reorder content of '{}'", topic))?;

    output.success(&format!("Swapped '{}' and '{}'", first, second));
    Ok(())
}

fn parse_kind(name: &str) -> Result<ContentKind> {
    match ContentKind::parse(name) {
        Some(kind) => Ok(kind),
        None => {
            let valid: Vec<_> = ContentKind::ALL
                .iter()
                .map(|k| k.as_str().to_lowercase())
                .collect();
            bail!(
                "Unknown content type: '{}'\nValid types: {}",
                name,
                valid.join(", ")
            );
        }
    }
}

/// Fail with a readable message unless the topic has this file
fn require_content(controller: &TopicTreeController, topic: &str, filename: &str) -> Result<()> {
    let known = controller
        .contents(topic)?
        .iter()
        .any(|c| c.filename == filename);
    if !known {
        bail!("Content not found in '{}': {}", topic, filename);
    }
    Ok(())
}
