//! Topic command handlers

use anyhow::{anyhow, Context, Result};

use topicbase_core::TopicTreeController;

use crate::output::Output;

/// Add a topic, at the top level unless a parent is given
pub fn add(
    controller: &mut TopicTreeController,
    title: String,
    parent: Option<String>,
    output: &Output,
) -> Result<()> {
    let parent = parent.map(|p| resolve(controller, &p)).transpose()?;
    controller
        .add_node(&title, parent.as_deref())
        .with_context(|| format!("Failed to add topic '{}'", title))?;

    output.success(&format!("Added topic: {}", title));
    Ok(())
}

/// Move a topic, to the top level unless a target is given
pub fn mv(
    controller: &mut TopicTreeController,
    title: String,
    to: Option<String>,
    output: &Output,
) -> Result<()> {
    let from = resolve(controller, &title)?;
    let to = to.map(|t| resolve(controller, &t)).transpose()?;
    controller
        .move_node(&from, to.as_deref())
        .with_context(|| format!("Failed to move topic '{}'", from))?;

    output.success(&format!(
        "Moved '{}' under {}",
        from,
        to.as_deref().unwrap_or("the top level")
    ));
    Ok(())
}

/// Rename a topic
pub fn rename(
    controller: &mut TopicTreeController,
    from: String,
    to: String,
    output: &Output,
) -> Result<()> {
    let from = resolve(controller, &from)?;
    controller
        .rename_node(&from, &to)
        .with_context(|| format!("Failed to rename topic '{}'", from))?;

    output.success(&format!("Renamed '{}' to '{}'", from, to));
    Ok(())
}

/// Remove a topic and everything below it
pub fn remove(controller: &mut TopicTreeController, title: String, output: &Output) -> Result<()> {
    let title = resolve(controller, &title)?;
    let below = controller
        .tree()
        .find(Some(title.as_str()))
        .map(|id| controller.tree().descendants(id).len())
        .unwrap_or(0);
    controller
        .remove_node(&title)
        .with_context(|| format!("Failed to remove topic '{}'", title))?;

    if below > 0 {
        output.success(&format!("Removed '{}' and {} subtopic(s)", title, below));
    } else {
        output.success(&format!("Removed '{}'", title));
    }
    Ok(())
}

/// List the children of a topic, or the top-level topics
pub fn list(controller: &TopicTreeController, title: Option<String>, output: &Output) -> Result<()> {
    let title = title.map(|t| resolve(controller, &t)).transpose()?;
    let children = controller.children(title.as_deref())?;
    output.print_titles(&children);
    Ok(())
}

/// Print the whole topic tree
pub fn tree(controller: &TopicTreeController, output: &Output) -> Result<()> {
    output.print_tree(controller.tree());
    Ok(())
}

/// Print the directory mirroring a topic
pub fn path(controller: &TopicTreeController, title: Option<String>, output: &Output) -> Result<()> {
    let title = title.map(|t| resolve(controller, &t)).transpose()?;
    let dir = controller.locate_directory(title.as_deref())?;
    output.print_path(&dir);
    Ok(())
}

/// Map user input to the stored title of an existing topic
pub fn resolve(controller: &TopicTreeController, input: &str) -> Result<String> {
    controller
        .resolve_title(input)
        .ok_or_else(|| anyhow!("Topic not found: {}", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;
    use topicbase_core::Config;

    fn test_controller(temp_dir: &TempDir) -> TopicTreeController {
        let config = Config::with_data_dir(temp_dir.path());
        TopicTreeController::recreate(&config).unwrap();
        TopicTreeController::load(config).unwrap()
    }

    #[test]
    fn test_add_under_loosely_typed_parent() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = test_controller(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        add(&mut controller, "Linear Algebra".into(), None, &output).unwrap();
        add(
            &mut controller,
            "Matrices".into(),
            Some(" Linear  Algebra".into()),
            &output,
        )
        .unwrap();

        assert_eq!(
            controller.children(Some("Linear Algebra")).unwrap(),
            vec!["Matrices"]
        );
    }

    #[test]
    fn test_unknown_topic_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = test_controller(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        let err = remove(&mut controller, "Nope".into(), &output).unwrap_err();
        assert!(err.to_string().contains("Topic not found"));
        assert!(!controller.is_halted());

        add(&mut controller, "Algebra".into(), None, &output).unwrap();
    }

    #[test]
    fn test_move_and_rename() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = test_controller(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        add(&mut controller, "Algebra".into(), None, &output).unwrap();
        add(&mut controller, "Groups".into(), None, &output).unwrap();
        mv(&mut controller, "Groups".into(), Some("Algebra".into()), &output).unwrap();
        rename(&mut controller, "Groups".into(), "Group Theory".into(), &output).unwrap();

        assert_eq!(
            controller.children(Some("Algebra")).unwrap(),
            vec!["Group Theory"]
        );
        assert!(temp_dir.path().join("topics/Algebra/Group Theory").is_dir());
    }
}
