//! Follow a channel.

use std::time::Duration;

use anyhow::Result;
use timing_client::handler;
use timing_core::{Notification, NotificationKind};

use super::Target;

/// Run the watch command until interrupted or `duration` elapses.
pub async fn run(target: &Target, tick_ms: Option<u64>, duration: Option<u64>) -> Result<()> {
    let provider = super::open(target).await?;

    if let Some(vector) = provider.vector().await {
        println!("[{}] open: {} in {}", target.channel, vector, provider.range().await);
    }

    let printer = handler(|notification: &Notification| {
        println!("{}", describe(notification));
        Ok(())
    });
    for kind in [
        NotificationKind::VectorChange,
        NotificationKind::SkewChange,
        NotificationKind::ReadyStateChange,
    ] {
        provider.on(kind, printer.clone());
    }

    let ticker = async {
        match tick_ms {
            Some(ms) => {
                let mut interval = tokio::time::interval(Duration::from_millis(ms.max(1)));
                loop {
                    interval.tick().await;
                    if let Some(vector) = provider.current_vector().await {
                        println!("  position {:.3}", vector.position);
                    }
                }
            }
            None => std::future::pending::<()>().await,
        }
    };
    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ticker => {}
        _ = deadline => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    super::close(provider).await;
    Ok(())
}

fn describe(notification: &Notification) -> String {
    match notification {
        Notification::VectorChange { vector, range } => format!("vector {} in {}", vector, range),
        Notification::SkewChange(skew) => format!("skew {:+.3} ms", skew * 1000.0),
        Notification::ReadyStateChange(state) => format!("state {}", state),
    }
}
