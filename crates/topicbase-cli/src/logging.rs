//! Logging setup
//!
//! Log level comes from `TOPICBASE_LOG` (default `warn`). Output goes to
//! stderr, or to the configured `log_file` when one is set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use topicbase_core::Config;

const DEFAULT_LEVEL: &str = "warn";

pub fn init(config: &Config) {
    let level = std::env::var("TOPICBASE_LOG").unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
    let env_filter = EnvFilter::try_new(directives(&level))
        .unwrap_or_else(|_| EnvFilter::new(directives(DEFAULT_LEVEL)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false);

    // Ignore error if already initialized
    match &config.log_file {
        Some(path) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    let _ = builder.with_writer(std::io::stderr).try_init();
                    return;
                }
            };
            let _ = builder.with_writer(Mutex::new(file)).try_init();
            debug!("Logging to {:?}", path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

/// A bare level applies to both crates; anything else is used as given
fn directives(level: &str) -> String {
    if level.contains('=') {
        level.to_string()
    } else {
        format!("topicbase_core={0},topicbase_cli={0}", level)
    }
}
