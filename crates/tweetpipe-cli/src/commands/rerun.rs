//! Load a stored raw document again

use tweetpipe_core::config::Config;
use tweetpipe_core::TweetPipeline;

use super::{open_raw_store, report, Target};
use crate::error::Result;

pub async fn run(config: &Config, key: &str, dry_run: bool) -> Result<()> {
    let pipeline = TweetPipeline::new()?;
    let raw_store = open_raw_store(config).await?;
    let mut target = Target::open(config, dry_run).await?;

    let result = pipeline.rerun(raw_store.as_ref(), target.store(), key).await?;

    report(&result, &target);
    Ok(())
}
