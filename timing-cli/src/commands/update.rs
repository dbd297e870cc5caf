//! Propose new motion.

use anyhow::{Context, Result};
use timing_types::PartialVector;

use super::Target;

/// Run the update command.
pub async fn run(
    target: &Target,
    position: Option<f64>,
    velocity: Option<f64>,
    acceleration: Option<f64>,
) -> Result<()> {
    let partial = partial(position, velocity, acceleration);
    let provider = super::open(target).await?;

    let result = provider.update(partial).await;
    let vector = provider.current_vector().await;
    super::close(provider).await;

    let event_id = result.context("Update rejected")?;
    println!("Update accepted as event {}", event_id);
    if let Some(vector) = vector {
        println!("  Current: {}", vector);
    }
    Ok(())
}

fn partial(position: Option<f64>, velocity: Option<f64>, acceleration: Option<f64>) -> PartialVector {
    let mut partial = PartialVector::new();
    if let Some(p) = position {
        partial = partial.position(p);
    }
    if let Some(v) = velocity {
        partial = partial.velocity(v);
    }
    if let Some(a) = acceleration {
        partial = partial.acceleration(a);
    }
    partial
}
