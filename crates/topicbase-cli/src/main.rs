//! Topicbase CLI
//!
//! Command-line interface for Topicbase - a catalog of hierarchical topics
//! and their content files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use topicbase_core::{Config, TopicTreeController, TreeError};

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "topicbase")]
#[command(about = "Topicbase - hierarchical topic catalog")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty catalog
    Init {
        /// Start over even if a catalog exists (old data is kept as .old)
        #[arg(long)]
        force: bool,
    },
    /// Copy the index over its backup
    Backup,
    /// Show catalog location and counts
    Status,
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Manage topics
    Topic {
        #[command(subcommand)]
        command: TopicCommands,
    },
    /// Manage content files of a topic
    Content {
        #[command(subcommand)]
        command: ContentCommands,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Add a topic
    Add {
        /// Title of the new topic
        title: String,
        /// Parent topic (top level if omitted)
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Move a topic and its subtopics
    #[command(alias = "move")]
    Mv {
        /// Topic to move
        title: String,
        /// New parent (top level if omitted)
        #[arg(short, long)]
        to: Option<String>,
    },
    /// Rename a topic
    Rename {
        /// Current title
        from: String,
        /// New title
        to: String,
    },
    /// Remove a topic and its subtopics
    #[command(alias = "remove")]
    Rm {
        /// Topic to remove
        title: String,
    },
    /// List subtopics (top-level topics if omitted)
    #[command(alias = "list")]
    Ls {
        /// Parent topic
        title: Option<String>,
    },
    /// Show the whole topic tree
    Tree,
    /// Print the directory of a topic
    Path {
        /// Topic (content root if omitted)
        title: Option<String>,
    },
}

#[derive(Subcommand)]
enum ContentCommands {
    /// Import a file into a topic
    Add {
        /// Topic to attach the file to
        topic: String,
        /// File to import
        file: PathBuf,
        /// Content type (description, geogebra, image, video, worksheet,
        /// editable-worksheet, link, other)
        #[arg(short = 't', long = "type")]
        kind: String,
        /// Caption, also used to name the stored file
        #[arg(short, long)]
        caption: Option<String>,
    },
    /// List the content of a topic
    #[command(alias = "list")]
    Ls {
        /// Topic
        topic: String,
    },
    /// Give a content item a new caption
    Rename {
        /// Topic
        topic: String,
        /// Stored filename
        filename: String,
        /// New caption
        caption: String,
    },
    /// Remove a content item and its file
    #[command(alias = "remove")]
    Rm {
        /// Topic
        topic: String,
        /// Stored filename
        filename: String,
    },
    /// Exchange the positions of two content items
    Swap {
        /// Topic
        topic: String,
        /// First stored filename
        first: String,
        /// Second stored filename
        second: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let tree_error = e.chain().find_map(|cause| cause.downcast_ref::<TreeError>());
            output.error(
                &format!("{:#}", e),
                tree_error.and_then(TreeError::recovery_suggestion),
            );
            ExitCode::from(exit_code(tree_error))
        }
    }
}

/// 2 when the catalog may be inconsistent, 1 for every other failure
fn exit_code(error: Option<&TreeError>) -> u8 {
    match error {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config_file.unwrap_or_else(Config::config_file_path);
    let config = Config::load_from_path(&config_path).context("Failed to load configuration")?;
    logging::init(&config);

    // Commands that don't need a loaded catalog
    let command = match cli.command {
        Commands::Config { command } => {
            return handle_config_command(command, &config, &config_path, output);
        }
        Commands::Init { force } => return commands::catalog::init(&config, force, output),
        command => command,
    };

    let mut controller = TopicTreeController::open(config).context("Failed to open catalog")?;

    match command {
        Commands::Backup => commands::catalog::backup(&controller, output),
        Commands::Status => commands::status::show(&controller, output),
        Commands::Topic { command } => handle_topic_command(command, &mut controller, output),
        Commands::Content { command } => handle_content_command(command, &mut controller, output),
        Commands::Init { .. } | Commands::Config { .. } => Ok(()), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config: &Config,
    config_path: &std::path::Path,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config, config_path, output),
    }
}

fn handle_topic_command(
    command: TopicCommands,
    controller: &mut TopicTreeController,
    output: &Output,
) -> Result<()> {
    match command {
        TopicCommands::Add { title, parent } => commands::topic::add(controller, title, parent, output),
        TopicCommands::Mv { title, to } => commands::topic::mv(controller, title, to, output),
        TopicCommands::Rename { from, to } => commands::topic::rename(controller, from, to, output),
        TopicCommands::Rm { title } => commands::topic::remove(controller, title, output),
        TopicCommands::Ls { title } => commands::topic::list(controller, title, output),
        TopicCommands::Tree => commands::topic::tree(controller, output),
        TopicCommands::Path { title } => commands::topic::path(controller, title, output),
    }
}

fn handle_content_command(
    command: ContentCommands,
    controller: &mut TopicTreeController,
    output: &Output,
) -> Result<()> {
    match command {
        ContentCommands::Add {
            topic,
            file,
            kind,
            caption,
        } => commands::content::add(controller, topic, file, kind, caption, output),
        ContentCommands::Ls { topic } => commands::content::list(controller, topic, output),
        ContentCommands::Rename {
            topic,
            filename,
            caption,
        } => commands::content::rename(controller, topic, filename, caption, output),
        ContentCommands::Rm { topic, filename } => {
            commands::content::remove(controller, topic, filename, output)
        }
        ContentCommands::Swap {
            topic,
            first,
            second,
        } => commands::content::swap(controller, topic, first, second, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_content_add() {
        let cli = Cli::try_parse_from([
            "topicbase", "--json", "content", "add", "Geometry", "circle.png", "--type", "image",
            "-c", "Unit circle",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Content {
                command:
                    ContentCommands::Add {
                        topic,
                        kind,
                        caption,
                        ..
                    },
            } => {
                assert_eq!(topic, "Geometry");
                assert_eq!(kind, "image");
                assert_eq!(caption.as_deref(), Some("Unit circle"));
            }
            _ => panic!("expected content add"),
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(None), 1);
        assert_eq!(exit_code(Some(&TreeError::Collision("x".into()))), 1);
        assert_eq!(exit_code(Some(&TreeError::Halted)), 2);
    }
}
