//! Group messages by topic.
//!
//! Reads lines of the form `topic1,topic2: message` from stdin and prints one
//! `topic[msg, msg, ...]` line per window. Usage:
//!
//! ```text
//! topics [config.toml] < messages.txt
//! RUST_LOG=multigroup=debug topics < messages.txt
//! ```

use std::process::ExitCode;

use multigroup::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Topics listed before the first ':'; lines without one match nothing
fn message_topics(line: &String) -> Vec<String> {
    let Some((topics, _)) = line.split_once(':') else {
        return Vec::new();
    };

    topics
        .split(',')
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_config() -> Result<GroupByConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => GroupByConfig::load(path),
        None => Ok(GroupByConfig::new(16)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multigroup=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let source = LineSource::new(tokio::io::stdin()).skip_blank();
    let handle = MultiGroupBy::from_config(
        config,
        keys_fn(message_topics),
        map_window(|topic: &String, window: Vec<String>| bracketed(topic, &window)),
    )
    .spawn(source);

    let result = tokio::select! {
        result = handle.join() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted");
            return ExitCode::from(130);
        }
    };

    match result {
        Ok(results) => {
            for value in results.values() {
                println!("{value}");
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
