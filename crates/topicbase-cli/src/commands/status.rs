//! Status command handler

use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Local};

use topicbase_core::TopicTreeController;

use crate::output::{Output, OutputFormat};

/// Size and modification time of a file, if it exists
struct FileInfo {
    size: u64,
    modified: Option<DateTime<Local>>,
}

impl FileInfo {
    fn read(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        })
    }

    fn describe(&self) -> String {
        match self.modified {
            Some(time) => format!(
                "{} (modified {})",
                format_size(self.size),
                time.format("%Y-%m-%d %H:%M")
            ),
            None => format_size(self.size),
        }
    }
}

/// Show status information
pub fn show(controller: &TopicTreeController, output: &Output) -> Result<()> {
    let config = controller.config();
    let tree = controller.tree();
    let topics = tree.len();
    let contents: usize = tree
        .descendants(tree.root())
        .into_iter()
        .filter_map(|id| tree.contents(id))
        .map(|c| c.len())
        .sum();

    let index_path = config.index_path();
    let backup_path = config.backup_path();
    let index = FileInfo::read(&index_path);
    let backup = FileInfo::read(&backup_path);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "index": {
                        "path": index_path,
                        "size": index.as_ref().map(|i| i.size),
                        "modified": index.as_ref().and_then(|i| i.modified).map(|t| t.to_rfc3339()),
                    },
                    "backup": {
                        "path": backup_path,
                        "exists": backup.is_some(),
                        "modified": backup.as_ref().and_then(|b| b.modified).map(|t| t.to_rfc3339()),
                    },
                    "counts": {
                        "topics": topics,
                        "contents": contents
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", topics);
        }
        OutputFormat::Human => {
            println!("Topicbase Status");
            println!("================");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!(
                "  Index:    {}",
                index
                    .as_ref()
                    .map(FileInfo::describe)
                    .unwrap_or_else(|| "(missing)".to_string())
            );
            println!(
                "  Backup:   {}",
                backup
                    .as_ref()
                    .map(FileInfo::describe)
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!();
            println!("Contents:");
            println!("  Topics:        {}", topics);
            println!("  Content items: {}", contents);
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
