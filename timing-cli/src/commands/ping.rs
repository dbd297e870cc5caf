//! Measure latency and clock skew.

use anyhow::Result;

use super::Target;

/// Run the ping command.
pub async fn run(target: &Target, count: u32) -> Result<()> {
    let provider = super::open(target).await?;

    let mut failures = 0;
    for i in 1..=count {
        match provider.ping().await {
            Ok(sample) => println!(
                "ping {}: latency {:.3} ms, skew {:+.3} ms",
                i,
                sample.latency() * 1000.0,
                sample.skew() * 1000.0
            ),
            Err(e) => {
                failures += 1;
                println!("ping {}: {}", i, e);
            }
        }
    }

    let skew = provider.skew().await;
    super::close(provider).await;

    println!();
    match skew {
        Some(skew) => println!("Estimated skew: {:+.3} ms", skew * 1000.0),
        None => println!("No skew estimate ({} of {} pings failed)", failures, count),
    }
    Ok(())
}
