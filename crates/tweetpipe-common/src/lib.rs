//! TweetPipe Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging and timestamp utilities for the TweetPipe
//! workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`TweetpipeError`] and the [`Result`] alias
//! - **Logging**: [`logging::init_logging`] on top of `tracing-subscriber`
//! - **Time**: conversions between the remote API timestamp format, RFC 3339
//!   and the storage key format
//!
//! # Example
//!
//! ```no_run
//! use tweetpipe_common::time::twitter_time_to_datetime;
//!
//! fn main() -> tweetpipe_common::Result<()> {
//!     let created_at = twitter_time_to_datetime("Tue Jun 04 23:12:08 +0000 2019")?;
//!     println!("{}", created_at);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod time;

// Re-export commonly used types
pub use error::{Result, TweetpipeError};
