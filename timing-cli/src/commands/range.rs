//! Propose a new range.

use anyhow::{Context, Result};
use timing_types::Range;

use super::Target;

/// Run the set-range command.
pub async fn run(target: &Target, start: f64, end: f64) -> Result<()> {
    let range = Range::new(start, end).context("Invalid range")?;
    let provider = super::open(target).await?;

    let result = provider.set_range(range).await;
    super::close(provider).await;

    let event_id = result.context("Range change rejected")?;
    println!("Range {} accepted as event {}", range, event_id);
    Ok(())
}
