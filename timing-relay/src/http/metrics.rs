//! Prometheus metrics endpoint.

use crate::server::TimingRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns gauges (current state) and counters (monotonic since startup)
/// in Prometheus text format.
pub async fn metrics_handler(Extension(relay): Extension<Arc<TimingRelay>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&relay),
    )
}

fn render(relay: &TimingRelay) -> String {
    let m = relay.metrics();

    // Gauges
    let sessions = relay.total_sessions();
    let channels = relay.total_channels();
    let subscribers = relay.broker().store().subscriber_count();

    // Counters
    let accepted = m.commands_accepted.load(Ordering::Relaxed);
    let rejected = m.commands_rejected.load(Ordering::Relaxed);
    let granted = m.subscriptions_granted.load(Ordering::Relaxed);
    let denied = m.subscriptions_denied.load(Ordering::Relaxed);
    let pings = m.pings_total.load(Ordering::Relaxed);
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    format!(
        r#"# HELP timing_relay_sessions_active Number of open sessions
# TYPE timing_relay_sessions_active gauge
timing_relay_sessions_active {sessions}

# HELP timing_relay_channels Number of channels created since startup
# TYPE timing_relay_channels gauge
timing_relay_channels {channels}

# HELP timing_relay_subscribers Number of live channel subscriptions
# TYPE timing_relay_subscribers gauge
timing_relay_subscribers {subscribers}

# HELP timing_relay_info Server information
# TYPE timing_relay_info gauge
timing_relay_info{{version="{version}"}} 1

# HELP timing_relay_commands_accepted_total Commands accepted and broadcast
# TYPE timing_relay_commands_accepted_total counter
timing_relay_commands_accepted_total {accepted}

# HELP timing_relay_commands_rejected_total Commands rejected
# TYPE timing_relay_commands_rejected_total counter
timing_relay_commands_rejected_total {rejected}

# HELP timing_relay_subscriptions_granted_total Subscriptions granted
# TYPE timing_relay_subscriptions_granted_total counter
timing_relay_subscriptions_granted_total {granted}

# HELP timing_relay_subscriptions_denied_total Subscriptions refused
# TYPE timing_relay_subscriptions_denied_total counter
timing_relay_subscriptions_denied_total {denied}

# HELP timing_relay_pings_total Ping procedure calls answered
# TYPE timing_relay_pings_total counter
timing_relay_pings_total {pings}

# HELP timing_relay_connections_total Total connections accepted
# TYPE timing_relay_connections_total counter
timing_relay_connections_total {conns_total}

# HELP timing_relay_errors_total Total protocol errors
# TYPE timing_relay_errors_total counter
timing_relay_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
