//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use topicbase_core::{Content, NodeId, TopicTree};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// One topic and its subtree, as printed by `--json topic tree`
#[derive(Debug, Serialize)]
struct TreeEntry {
    title: String,
    contents: usize,
    children: Vec<TreeEntry>,
}

impl TreeEntry {
    fn build(tree: &TopicTree, id: NodeId) -> Option<Self> {
        let node = tree.get(id)?;
        Some(Self {
            title: node.title().to_string(),
            contents: node.contents().len(),
            children: node
                .children()
                .iter()
                .filter_map(|&child| Self::build(tree, child))
                .collect(),
        })
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a list of topic titles
    pub fn print_titles(&self, titles: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if titles.is_empty() {
                    println!("No topics found.");
                    return;
                }
                for title in titles {
                    println!("{}", title);
                }
                println!("\n{} topic(s)", titles.len());
            }
            OutputFormat::Json => println!("{}", to_json(&titles)),
            OutputFormat::Quiet => {
                for title in titles {
                    println!("{}", title);
                }
            }
        }
    }

    /// Print the whole topic tree
    pub fn print_tree(&self, tree: &TopicTree) {
        let root = tree.root();
        match self.format {
            OutputFormat::Human => {
                if tree.is_empty() {
                    println!("No topics found.");
                    return;
                }
                for line in tree_lines(tree, root, "") {
                    println!("{}", line);
                }
                println!("\n{} topic(s)", tree.len());
            }
            OutputFormat::Json => {
                let entries: Vec<_> = tree
                    .get(root)
                    .map(|node| node.children().to_vec())
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|id| TreeEntry::build(tree, id))
                    .collect();
                println!("{}", to_json(&entries));
            }
            OutputFormat::Quiet => {
                for id in tree.descendants(root) {
                    if let Some(node) = tree.get(id) {
                        println!("{}", node.title());
                    }
                }
            }
        }
    }

    /// Print the content items of a topic
    pub fn print_contents(&self, topic: &str, contents: &[Content]) {
        match self.format {
            OutputFormat::Human => {
                if contents.is_empty() {
                    println!("No content in '{}'.", topic);
                    return;
                }
                for (i, content) in contents.iter().enumerate() {
                    println!(
                        "{:>3}. {:<18} {}",
                        i + 1,
                        content.kind,
                        content.filename
                    );
                    if let Some(ref caption) = content.caption {
                        println!("     {}", caption);
                    }
                }
                println!("\n{} item(s)", contents.len());
            }
            OutputFormat::Json => println!("{}", to_json(&contents)),
            OutputFormat::Quiet => {
                for content in contents {
                    println!("{}", content.filename);
                }
            }
        }
    }

    /// Print a single stored content entry
    pub fn print_content(&self, content: &Content) {
        match self.format {
            OutputFormat::Human => {
                println!("Type:     {}", content.kind);
                println!("Filename: {}", content.filename);
                if let Some(ref caption) = content.caption {
                    println!("Caption:  {}", caption);
                }
            }
            OutputFormat::Json => println!("{}", to_json(content)),
            OutputFormat::Quiet => println!("{}", content.filename),
        }
    }

    /// Print a filesystem path
    pub fn print_path(&self, path: &std::path::Path) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "path": path })),
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", path.display()),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an error, with a hint on how to recover if there is one
    pub fn error(&self, message: &str, suggestion: Option<&str>) {
        match self.format {
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "message": message,
                        "suggestion": suggestion
                    })
                );
            }
            OutputFormat::Human | OutputFormat::Quiet => {
                eprintln!("Error: {}", message);
                if let Some(hint) = suggestion {
                    eprintln!("  {}", hint);
                }
            }
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Render the children of `id` with box-drawing connectors
fn tree_lines(tree: &TopicTree, id: NodeId, prefix: &str) -> Vec<String> {
    let children = tree.get(id).map(|n| n.children()).unwrap_or_default();
    let mut lines = Vec::new();
    for (i, &child) in children.iter().enumerate() {
        let Some(node) = tree.get(child) else {
            continue;
        };
        let last = i + 1 == children.len();
        let count = node.contents().len();
        let suffix = if count > 0 {
            format!(" [{}]", count)
        } else {
            String::new()
        };
        lines.push(format!(
            "{}{}{}{}",
            prefix,
            if last { "└── " } else { "├── " },
            node.title(),
            suffix
        ));
        let nested = format!("{}{}", prefix, if last { "    " } else { "│   " });
        lines.extend(tree_lines(tree, child, &nested));
    }
    lines
}
