//! Full pipeline run: fetch, store raw, transform and load

use tracing::info;
use tweetpipe_core::config::Config;
use tweetpipe_core::extract::TwitterClient;
use tweetpipe_core::TweetPipeline;

use super::{open_raw_store, report, Target};
use crate::error::Result;

pub async fn run(config: &Config, handle: &str, count: u32, dry_run: bool) -> Result<()> {
    info!(handle, count, dry_run, "Running pipeline");

    let pipeline = TweetPipeline::new()?;
    let client = TwitterClient::new(&config.twitter)?;
    let raw_store = open_raw_store(config).await?;
    let mut target = Target::open(config, dry_run).await?;

    let result = pipeline
        .run(&client, raw_store.as_ref(), target.store(), handle, count)
        .await?;

    report(&result, &target);
    Ok(())
}
