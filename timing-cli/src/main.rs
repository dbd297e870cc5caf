//! # timing-cli
//!
//! Command-line participant for shared timing objects.
//!
//! ## Commands
//!
//! - `watch`: Follow a channel and print every change
//! - `update`: Propose new motion
//! - `set-range`: Propose a new range
//! - `ping`: Measure latency and clock skew against the relay
//!
//! ## Example
//!
//! ```bash
//! # Start moving at 1 unit/s
//! timing-cli --channel room update --velocity 1
//!
//! # Follow the channel, printing the position every 250 ms
//! timing-cli --channel room watch --tick-ms 250
//!
//! # Confine the position to [0, 100]
//! timing-cli --channel room set-range 0 100
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ping, range, update, watch, Target};

/// Command-line participant for shared timing objects.
#[derive(Parser, Debug)]
#[command(name = "timing-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Relay address (host:port)
    #[arg(long, global = true, default_value = "127.0.0.1:8000")]
    relay: String,

    /// Channel to join
    #[arg(long, short, global = true, default_value = "default")]
    channel: String,

    /// Name reported to the relay
    #[arg(long, global = true)]
    subject: Option<String>,

    /// Seconds to wait for the subscription
    #[arg(long, global = true, default_value = "5")]
    open_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow the channel and print changes until interrupted
    Watch {
        /// Also print the extrapolated position at this interval
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Propose new motion; omitted fields continue from the current motion
    Update {
        /// New position
        #[arg(long, short, allow_negative_numbers = true)]
        position: Option<f64>,

        /// New velocity
        #[arg(long, short, allow_negative_numbers = true)]
        velocity: Option<f64>,

        /// New acceleration
        #[arg(long, short, allow_negative_numbers = true)]
        acceleration: Option<f64>,
    },

    /// Propose a new range (use -inf / inf for unbounded ends)
    SetRange {
        /// Lower bound
        #[arg(allow_hyphen_values = true)]
        start: f64,

        /// Upper bound
        #[arg(allow_hyphen_values = true)]
        end: f64,
    },

    /// Measure round trips and clock skew against the relay
    Ping {
        /// Number of round trips
        #[arg(long, short = 'n', default_value = "5")]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = Target {
        relay: cli.relay,
        channel: cli.channel,
        subject: cli.subject,
        open_timeout: std::time::Duration::from_secs(cli.open_timeout),
    };

    match cli.command {
        Commands::Watch { tick_ms, duration } => watch::run(&target, tick_ms, duration).await?,
        Commands::Update {
            position,
            velocity,
            acceleration,
        } => update::run(&target, position, velocity, acceleration).await?,
        Commands::SetRange { start, end } => range::run(&target, start, end).await?,
        Commands::Ping { count } => ping::run(&target, count).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_update_with_negative_velocity() {
        let cli = Cli::try_parse_from(["timing-cli", "update", "--velocity", "-2.5"]).unwrap();
        match cli.command {
            Commands::Update {
                position,
                velocity,
                acceleration,
            } => {
                assert_eq!(position, None);
                assert_eq!(velocity, Some(-2.5));
                assert_eq!(acceleration, None);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cli.relay, "127.0.0.1:8000");
    }

    #[test]
    fn parses_unbounded_range() {
        let cli = Cli::try_parse_from(["timing-cli", "-c", "room", "set-range", "-inf", "10"])
            .unwrap();
        assert_eq!(cli.channel, "room");
        match cli.command {
            Commands::SetRange { start, end } => {
                assert_eq!(start, f64::NEG_INFINITY);
                assert_eq!(end, 10.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["timing-cli", "ping", "-n", "3", "--relay", "relay:9000"]).unwrap();
        assert_eq!(cli.relay, "relay:9000");
        assert!(matches!(cli.command, Commands::Ping { count: 3 }));
    }
}
