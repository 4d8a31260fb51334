use std::time::Duration;

use tokio::time;
use tracing::{info, warn};

use crate::blackboard::{Blackboard, is_finished, snapshot};

/// Logs the blackboard at a fixed rate until the run finishes.
pub async fn telemetry_task(bb: Blackboard, period: Duration) -> anyhow::Result<()> {
    info!("Telemetry task started.");
    let mut tick = time::interval(period);
    while !is_finished(&bb) {
        tick.tick().await;
        let s = snapshot(&bb);
        info!(
            position = format_args!("{:.1}", s.position),
            speed = format_args!("{:.1}", s.speed),
            acceleration = format_args!("{:.1}", s.acceleration),
            direction = %s.motor.direction,
            voltage = format_args!("{:.2}", s.motor.voltage),
            dc_count = s.motor.dc_count,
            "Motor telemetry"
        );
    }

    let faults = snapshot(&bb).faults;
    if faults.is_empty() {
        info!("Run finished without faults.");
    } else {
        warn!(?faults, "Run finished with faults.");
    }
    Ok(())
}
