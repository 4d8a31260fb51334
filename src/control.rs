use std::{sync::Arc, time::Instant};

use dc_motor::{DcMotor, MotorError};
use parking_lot::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::blackboard::{Blackboard, finish, raise_fault};
use crate::bridge::SimulatedBridge;
use crate::config::{Action, BenchSettings, ScriptStep};

/// The controller is shared with the encoder thread; the mutex serializes
/// tick updates against commands.
pub type SharedMotor = Arc<Mutex<DcMotor<SimulatedBridge>>>;

/// Scripted commands in time order.
#[derive(Debug)]
pub struct Script {
    steps: Vec<ScriptStep>,
    next: usize,
}

impl Script {
    /// `steps` must be sorted by `at_ms`.
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Script { steps, next: 0 }
    }

    /// Actions that became due by `elapsed_ms` since the last call.
    pub fn due(&mut self, elapsed_ms: u64) -> Vec<Action> {
        let start = self.next;
        while self.next < self.steps.len() && self.steps[self.next].at_ms <= elapsed_ms {
            self.next += 1;
        }
        self.steps[start..self.next].iter().map(|step| step.action).collect()
    }
}

/// Control loop: applies the script and refreshes the blackboard every period.
pub async fn control_task(
    motor: SharedMotor,
    bb: Blackboard,
    bench: BenchSettings,
    steps: Vec<ScriptStep>,
) -> anyhow::Result<()> {
    info!(period = ?bench.control_period(), "Control task started.");
    let mut ticker = time::interval(bench.control_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut script = Script::new(steps);
    let mut active: Option<Action> = None;
    let start = Instant::now();

    while start.elapsed() < bench.run_time() {
        ticker.tick().await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let due = script.due(elapsed_ms);
        control_step(&motor, &bb, &bench, &due, &mut active);
    }

    info!("Run complete, stopping motor.");
    finish(&bb);
    let mut motor = motor.lock();
    if let Err(e) = motor.reset() {
        warn!(%e, "Failed to stop motor");
    }
    motor.deinitialize()?;
    info!(state = ?motor.state(), "Motor deinitialized.");
    Ok(())
}

fn control_step(
    motor: &SharedMotor,
    bb: &Blackboard,
    bench: &BenchSettings,
    due: &[Action],
    active: &mut Option<Action>,
) {
    let dt = bench.control_period().as_secs_f32();
    let horizon = bench.position_horizon().as_secs_f32();
    let mut motor = motor.lock();

    for &action in due {
        info!(?action, "Applying scripted command");
        if action == Action::Reset {
            *active = None;
            if let Err(e) = motor.reset() {
                warn!(%e, "Reset failed");
                raise_fault(bb, &e.to_string());
            }
        } else {
            *active = Some(action);
        }
    }

    let previous_speed = motor.state().prev_speed;
    if let Err(e) = apply(&mut motor, *active, dt, horizon) {
        warn!(%e, ?active, "Motor command failed");
        raise_fault(bb, &e.to_string());
    }

    let state = motor.state();
    let mut board = bb.write();
    board.motor = state;
    board.position = motor.get_position();
    board.speed = state.prev_speed;
    board.acceleration = (state.prev_speed - previous_speed) / dt;
    board.last_tick_ts = Instant::now();
    debug!(position = board.position, speed = board.speed, "Control step");
}

/// Runs one estimator step and re-applies the active command.
fn apply(
    motor: &mut DcMotor<SimulatedBridge>,
    active: Option<Action>,
    dt: f32,
    horizon: f32,
) -> Result<(), MotorError> {
    // set_acceleration takes its own estimator step.
    if let Some(Action::Acceleration(acceleration)) = active {
        return motor.set_acceleration(acceleration, dt);
    }

    motor.get_acceleration(dt)?;
    match active {
        Some(Action::Speed(speed)) => motor.set_speed(speed),
        Some(Action::Position(position)) => motor.set_position(position, horizon),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_motor::{Direction, MotorConfig};

    fn step(at_ms: u64, action: Action) -> ScriptStep {
        ScriptStep { at_ms, action }
    }

    fn motor() -> DcMotor<SimulatedBridge> {
        let config = MotorConfig {
            min_position: 0.0,
            max_position: 350.0,
            min_speed: 5.0,
            max_speed: 180.0,
            min_acceleration: 1.0,
            max_acceleration: 90.0,
            ref_voltage: 12.0,
            dc_change: 0.5,
        };
        let mut motor = DcMotor::new(config, SimulatedBridge::new(12.0)).unwrap();
        motor.initialize().unwrap();
        motor
    }

    #[test]
    fn test_script_releases_steps_in_order() {
        let mut script = Script::new(vec![
            step(0, Action::Speed(10.0)),
            step(100, Action::Reset),
            step(100, Action::Speed(-10.0)),
            step(250, Action::Position(90.0)),
        ]);
        assert_eq!(script.due(0), vec![Action::Speed(10.0)]);
        assert!(script.due(50).is_empty());
        assert_eq!(script.due(120), vec![Action::Reset, Action::Speed(-10.0)]);
        assert_eq!(script.due(1_000), vec![Action::Position(90.0)]);
        assert!(script.due(2_000).is_empty());
    }

    #[test]
    fn test_apply_drives_the_bridge() {
        let mut motor = motor();
        let output = motor.device().output();

        apply(&mut motor, Some(Action::Speed(-90.0)), 0.01, 1.0).unwrap();
        assert_eq!(output.read().direction, Direction::Backward);
        assert!(output.read().voltage > 0.0);

        // 0 deg to 180 deg within 1 s asks for the maximum speed.
        apply(&mut motor, Some(Action::Position(180.0)), 0.01, 1.0).unwrap();
        assert_eq!(output.read().direction, Direction::Forward);
        assert!((output.read().voltage - 12.0).abs() < 1e-4);

        apply(&mut motor, None, 0.01, 1.0).unwrap();
        assert_eq!(output.read().direction, Direction::Forward);
    }
}
