//! TweetPipe CLI Library
//!
//! Command-line front end of the timeline pipeline.
//!
//! # Overview
//!
//! - **Run**: fetch the latest posts of a user, store them raw and load them
//!   (`tweetpipe -u alice -c 20`)
//! - **List**: show stored raw documents (`tweetpipe --list alice`)
//! - **Rerun**: load a stored raw document again (`tweetpipe --rerun KEY`)
//!
//! `--dry-run` loads into an in-memory store instead of PostgreSQL.
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::Parser;
use tweetpipe_core::config::DEFAULT_FETCH_COUNT;
use tweetpipe_core::raw_store::StorageBackend;

/// TweetPipe - fetch, store and load user timelines
#[derive(Parser, Debug)]
#[command(name = "tweetpipe")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// User handle to fetch (without '@')
    #[arg(short, long, value_name = "HANDLE", required_unless_present_any = ["list", "rerun"])]
    pub user_handle: Option<String>,

    /// Number of recent posts to retrieve
    #[arg(short, long, default_value_t = DEFAULT_FETCH_COUNT, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// List stored raw documents, optionally below PREFIX
    #[arg(
        long,
        value_name = "PREFIX",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with_all = ["user_handle", "rerun"]
    )]
    pub list: Option<String>,

    /// Transform and load a stored raw document instead of fetching
    #[arg(long, value_name = "KEY", conflicts_with = "user_handle")]
    pub rerun: Option<String>,

    /// Raw store backend (local or s3), overrides TWEETPIPE_STORAGE
    #[arg(long, value_name = "BACKEND")]
    pub storage: Option<StorageBackend>,

    /// Load into an in-memory store instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run { handle: String, count: u32 },
    List { prefix: Option<String> },
    Rerun { key: String },
}

impl Cli {
    pub fn action(&self) -> Result<Action> {
        if let Some(prefix) = &self.list {
            let prefix = Some(prefix.clone()).filter(|prefix| !prefix.is_empty());
            return Ok(Action::List { prefix });
        }

        if let Some(key) = &self.rerun {
            return Ok(Action::Rerun { key: key.clone() });
        }

        let handle = self
            .user_handle
            .as_deref()
            .map(|handle| handle.trim_start_matches('@'))
            .filter(|handle| !handle.is_empty())
            .ok_or_else(|| CliError::usage("a user handle is required"))?;

        Ok(Action::Run {
            handle: handle.to_string(),
            count: self.count,
        })
    }
}
