mod blackboard; // shared latest-state view
mod bridge;     // simulated H-bridge device
mod config;     // settings loading
mod control;    // control loop and command script
mod encoder;    // simulated encoder thread
mod telemetry;  // periodic state logging

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use blackboard::{Blackboard, is_finished, raise_fault, snapshot};
use bridge::SimulatedBridge;
use control::SharedMotor;
use dc_motor::DcMotor;
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("DC motor bench started.");
    let settings = config::load_settings()?;

    let bridge = SimulatedBridge::new(settings.motor.ref_voltage);
    let output = bridge.output();
    let mut motor = DcMotor::new(settings.motor, bridge).context("creating motor controller")?;
    motor
        .initialize_at(settings.bench.start_position)
        .context("initializing motor")?;
    info!(position = motor.get_position(), "Motor initialized.");

    let motor: SharedMotor = Arc::new(Mutex::new(motor));
    let bb: Blackboard = Arc::default();

    info!("Spawning encoder thread...");
    let encoder = encoder::spawn(
        Arc::clone(&motor),
        output,
        Arc::clone(&bb),
        settings.bench.ticks_per_volt_second,
        settings.bench.encoder_period(),
    )?;

    let result = tokio::try_join!(
        control::control_task(
            Arc::clone(&motor),
            Arc::clone(&bb),
            settings.bench.clone(),
            settings.commands.clone(),
        ),
        telemetry::telemetry_task(Arc::clone(&bb), settings.bench.telemetry_period()),
        watchdog(Arc::clone(&motor), Arc::clone(&bb), settings.bench.clone()),
    );

    blackboard::finish(&bb);
    if encoder.join().is_err() {
        error!("Encoder thread panicked.");
    }

    match result {
        Ok(_) => {
            info!("Bench finished successfully.");
            Ok(())
        }
        Err(e) => {
            error!("Bench failed: {:?}", e);
            Err(e)
        }
    }
}

/// Stops the motor if the control loop stops refreshing the blackboard.
async fn watchdog(motor: SharedMotor, bb: Blackboard, bench: config::BenchSettings) -> anyhow::Result<()> {
    info!("Watchdog task started.");
    let timeout = bench.watchdog_timeout();
    let mut tick = tokio::time::interval(timeout / 4);
    let mut tripped = false;
    while !is_finished(&bb) {
        tick.tick().await;
        let last_tick_ts = snapshot(&bb).last_tick_ts;
        let age = Instant::now() - last_tick_ts;
        if age > timeout && !tripped {
            warn!(?age, "Control loop stalled! Stopping motor.");
            if let Err(e) = motor.lock().reset() {
                error!(%e, "Emergency stop failed");
            }
            raise_fault(&bb, "control loop stalled");
            tripped = true;
        } else if age <= timeout {
            tripped = false;
        }
    }
    Ok(())
}
