//! List stored raw documents

use tweetpipe_core::config::Config;
use tweetpipe_core::TweetPipeline;

use super::open_raw_store;
use crate::error::Result;

pub async fn run(config: &Config, prefix: Option<&str>) -> Result<()> {
    let raw_store = open_raw_store(config).await?;
    let listing = TweetPipeline::new()?.list(raw_store.as_ref(), prefix).await?;

    if listing.count == 0 {
        println!("No raw documents found for prefix '{}'.", listing.prefix);
        return Ok(());
    }

    println!("Raw documents ({}, prefix '{}'):", listing.count, listing.prefix);
    for key in &listing.keys {
        println!("  {}", key);
    }

    Ok(())
}
