//! TweetPipe CLI - Main entry point

use clap::Parser;
use std::process;
use tracing::error;
use tweetpipe_cli::{commands, Action, Cli};
use tweetpipe_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        // Verbose mode: debug to console and file
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Both)
            .log_file_prefix("tweetpipe-cli")
            .build()
    } else {
        // Normal mode: info+ to file only, user output on stdout
        LogConfig::builder()
            .level(LogLevel::Info)
            .output(LogOutput::File)
            .log_file_prefix("tweetpipe-cli")
            .build()
    };

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let guard = init_logging(&log_config).ok().flatten();

    if let Err(e) = execute(&cli).await {
        error!(error = %format_args!("{:#}", e), "Command failed");
        eprintln!("Error: {:#}", e);
        drop(guard);
        process::exit(1);
    }
}

async fn execute(cli: &Cli) -> tweetpipe_cli::Result<()> {
    let config = commands::load_config(cli.storage)?;

    match cli.action()? {
        Action::Run { handle, count } => commands::run::run(&config, &handle, count, cli.dry_run).await,
        Action::List { prefix } => commands::list::run(&config, prefix.as_deref()).await,
        Action::Rerun { key } => commands::rerun::run(&config, &key, cli.dry_run).await,
    }
}
